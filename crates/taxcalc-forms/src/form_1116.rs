//! Form 1116 - Foreign Tax Credit.
//!
//! Each separate limitation basket computes its own net foreign-source
//! income and credit limitation; excess taxes carry back one year and
//! forward ten, consumed oldest-first against later excess limitation.
//! The simplified method (passive-only, small totals) skips the form and
//! credits taxes paid directly. The AMT variant substitutes AMTI and TMT.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use taxcalc_core::{consume_fifo, CarryoverRecord, FilingStatus, Money, YearTable};

/// Separate limitation basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FtcBasket {
    Section951a,
    ForeignBranch,
    Passive,
    General,
    Section901j,
    LumpSum,
    TreatyResourced,
}

impl FtcBasket {
    /// Stable tag used to key carryover snapshots.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Section951a => "section_951a",
            Self::ForeignBranch => "foreign_branch",
            Self::Passive => "passive",
            Self::General => "general",
            Self::Section901j => "section_901j",
            Self::LumpSum => "lump_sum",
            Self::TreatyResourced => "treaty_resourced",
        }
    }
}

/// Kind of foreign tax paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignTaxType {
    #[default]
    IncomeTax,
    WithholdingTax,
    WarProfitsTax,
    ExcessProfitsTax,
    InLieuTax,
}

/// Taxes paid to one country within a basket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignCountryTax {
    /// ISO 3166-1 alpha-2 code.
    pub country_code: String,
    pub country_name: String,
    #[serde(default)]
    pub gross_income: Money,
    #[serde(default)]
    pub definitely_related_expenses: Money,
    /// Amount paid in the foreign currency, for the record.
    #[serde(default)]
    pub taxes_paid_foreign_currency: Money,
    #[serde(default = "one")]
    pub exchange_rate: Decimal,
    pub taxes_paid_usd: Money,
    #[serde(default)]
    pub tax_type: ForeignTaxType,
    /// Accrued rather than paid.
    #[serde(default)]
    pub accrued: bool,
}

fn one() -> Decimal {
    Decimal::ONE
}

/// One basket's inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtcCategory {
    pub basket: FtcBasket,
    pub gross_foreign_income: Money,
    /// Deductions definitely related to the foreign income.
    #[serde(default)]
    pub definitely_related_deductions: Money,
    /// Allocated shares of interest, SALT, and other deductions.
    #[serde(default)]
    pub interest_allocated: Money,
    #[serde(default)]
    pub salt_allocated: Money,
    #[serde(default)]
    pub other_deductions_allocated: Money,
    /// Losses apportioned from other baskets.
    #[serde(default)]
    pub losses_from_other_categories: Money,
    #[serde(default)]
    pub country_taxes: Vec<ForeignCountryTax>,
    /// Prior-year unused credits for this basket.
    #[serde(default)]
    pub carryovers: Vec<CarryoverRecord>,
}

impl FtcCategory {
    pub fn new(basket: FtcBasket) -> Self {
        Self {
            basket,
            gross_foreign_income: Money::ZERO,
            definitely_related_deductions: Money::ZERO,
            interest_allocated: Money::ZERO,
            salt_allocated: Money::ZERO,
            other_deductions_allocated: Money::ZERO,
            losses_from_other_categories: Money::ZERO,
            country_taxes: Vec::new(),
            carryovers: Vec::new(),
        }
    }

    pub fn taxes_paid(&self) -> Money {
        self.country_taxes.iter().map(|c| c.taxes_paid_usd).sum()
    }

    pub fn net_foreign_income(&self) -> Money {
        (self.gross_foreign_income
            - self.definitely_related_deductions
            - self.interest_allocated
            - self.salt_allocated
            - self.other_deductions_allocated
            - self.losses_from_other_categories)
            .floor_zero()
    }
}

/// A passive basket funded from 1099-DIV/INT style withholding.
pub fn passive_category(
    foreign_income: Money,
    foreign_taxes_withheld: Money,
    country_code: &str,
    country_name: &str,
) -> FtcCategory {
    let mut category = FtcCategory::new(FtcBasket::Passive);
    category.gross_foreign_income = foreign_income;
    if foreign_taxes_withheld.is_positive() {
        category.country_taxes.push(ForeignCountryTax {
            country_code: country_code.into(),
            country_name: country_name.into(),
            gross_income: foreign_income,
            definitely_related_expenses: Money::ZERO,
            taxes_paid_foreign_currency: Money::ZERO,
            exchange_rate: Decimal::ONE,
            taxes_paid_usd: foreign_taxes_withheld,
            tax_type: ForeignTaxType::WithholdingTax,
            accrued: false,
        });
    }
    category
}

/// Inputs to the credit computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form1116Input {
    pub filing_status: FilingStatus,
    pub tax_year: u16,
    pub categories: Vec<FtcCategory>,
    pub total_taxable_income: Money,
    pub total_tax_before_credits: Money,
    /// Elect the simplified no-Form-1116 path when eligible.
    #[serde(default)]
    pub use_simplified_method: bool,
    /// Election to treat high-taxed passive income as general category.
    /// Recorded on the form; the caller assigns income to baskets
    /// accordingly.
    #[serde(default)]
    pub high_tax_kickout_election: bool,
    /// AMT variant inputs; `amti` SHOULD be provided when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amt: Option<AmtFtcInput>,
}

/// Inputs for the AMT foreign tax credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmtFtcInput {
    pub foreign_source_amti: Money,
    pub tentative_minimum_tax: Money,
    /// Total AMTI. When absent the regular-tax taxable income drives the
    /// ratio, a known approximation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amti: Option<Money>,
}

/// Per-basket result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtcCategoryResult {
    pub basket: FtcBasket,
    pub net_foreign_income: Money,
    pub taxes_paid: Money,
    pub limitation: Money,
    pub credit_before_carryover: Money,
    pub carryover_used: Money,
    pub credit_allowed: Money,
    /// Excess taxes over the limitation, carried forward.
    pub excess_taxes: Money,
    /// Excess limitation over taxes, available to absorb carryovers.
    pub excess_limitation: Money,
    /// Remaining carryover balances after consumption.
    pub carryovers_after: Vec<CarryoverRecord>,
}

/// AMT FTC result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmtFtcResult {
    pub limitation: Money,
    pub credit: Money,
    /// Which income figure drove the limitation ratio.
    pub ratio_basis: String,
}

/// Complete Form 1116 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form1116Result {
    pub simplified_method_used: bool,
    #[serde(default)]
    pub high_tax_kickout_elected: bool,
    pub total_foreign_taxes_paid: Money,
    pub total_limitation: Money,
    pub total_credit_allowed: Money,
    pub total_carryover_used: Money,
    pub new_carryforward: Money,
    pub categories: Vec<FtcCategoryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amt_ftc: Option<AmtFtcResult>,
}

/// Whether the simplified method is available: passive-only foreign taxes
/// within the de-minimis threshold.
pub fn can_use_simplified_method(input: &Form1116Input, table: &YearTable) -> bool {
    let total_taxes: Money = input.categories.iter().map(|c| c.taxes_paid()).sum();
    if total_taxes > table.ftc_simplified_threshold(input.filing_status) {
        return false;
    }
    input.categories.iter().all(|c| {
        matches!(c.basket, FtcBasket::Passive | FtcBasket::Section951a)
            || c.taxes_paid().is_zero()
    })
}

fn compute_category(
    category: &FtcCategory,
    total_taxable_income: Money,
    total_tax_before_credits: Money,
    tax_year: u16,
    carryforward_years: u8,
) -> FtcCategoryResult {
    let net_income = category.net_foreign_income();
    let taxes_paid = category.taxes_paid();
    let mut carryovers = category.carryovers.clone();

    if net_income.is_zero()
        || total_taxable_income <= Money::ZERO
        || total_tax_before_credits.is_zero()
    {
        // No limitation capacity; everything paid becomes carryforward.
        return FtcCategoryResult {
            basket: category.basket,
            net_foreign_income: net_income,
            taxes_paid,
            limitation: Money::ZERO,
            credit_before_carryover: Money::ZERO,
            carryover_used: Money::ZERO,
            credit_allowed: Money::ZERO,
            excess_taxes: taxes_paid,
            excess_limitation: Money::ZERO,
            carryovers_after: carryovers,
        };
    }

    let ratio = (net_income.as_decimal() / total_taxable_income.as_decimal()).min(Decimal::ONE);
    let limitation = total_tax_before_credits.mul_rate(ratio).round_to_cents();

    let credit_before_carryover = taxes_paid.min(limitation);
    let excess_limitation = limitation.saturating_sub(taxes_paid);
    let excess_taxes = taxes_paid.saturating_sub(limitation);

    let carryover_used = consume_fifo(
        &mut carryovers,
        excess_limitation,
        tax_year,
        Some(carryforward_years),
    );

    FtcCategoryResult {
        basket: category.basket,
        net_foreign_income: net_income,
        taxes_paid,
        limitation,
        credit_before_carryover,
        carryover_used,
        credit_allowed: credit_before_carryover + carryover_used,
        excess_taxes,
        excess_limitation,
        carryovers_after: carryovers,
    }
}

/// Compute Form 1116 across all baskets.
pub fn compute(input: &Form1116Input, table: &YearTable) -> Form1116Result {
    if input.use_simplified_method && can_use_simplified_method(input, table) {
        let taxes: Money = input.categories.iter().map(|c| c.taxes_paid()).sum();
        return Form1116Result {
            simplified_method_used: true,
            high_tax_kickout_elected: input.high_tax_kickout_election,
            total_foreign_taxes_paid: taxes,
            total_limitation: taxes,
            total_credit_allowed: taxes,
            total_carryover_used: Money::ZERO,
            new_carryforward: Money::ZERO,
            categories: Vec::new(),
            amt_ftc: None,
        };
    }

    let categories: Vec<FtcCategoryResult> = input
        .categories
        .iter()
        .map(|c| {
            compute_category(
                c,
                input.total_taxable_income,
                input.total_tax_before_credits,
                input.tax_year,
                table.ftc_carryforward_years,
            )
        })
        .collect();

    let amt_ftc = input.amt.as_ref().map(|amt| {
        let (denominator, ratio_basis) = match amt.amti {
            Some(amti) if amti.is_positive() => (amti, "amti".to_string()),
            _ => (
                input.total_taxable_income,
                "regular_taxable_income".to_string(),
            ),
        };
        if amt.foreign_source_amti.is_zero()
            || amt.tentative_minimum_tax.is_zero()
            || denominator <= Money::ZERO
        {
            return AmtFtcResult {
                limitation: Money::ZERO,
                credit: Money::ZERO,
                ratio_basis,
            };
        }
        let ratio =
            (amt.foreign_source_amti.as_decimal() / denominator.as_decimal()).min(Decimal::ONE);
        let limitation = amt.tentative_minimum_tax.mul_rate(ratio).round_to_cents();
        let foreign_taxes: Money = input.categories.iter().map(|c| c.taxes_paid()).sum();
        // Cannot reduce TMT below zero: the credit is capped by the
        // limitation, which is itself at most TMT.
        AmtFtcResult {
            limitation,
            credit: foreign_taxes.min(limitation),
            ratio_basis,
        }
    });

    Form1116Result {
        simplified_method_used: false,
        high_tax_kickout_elected: input.high_tax_kickout_election,
        total_foreign_taxes_paid: categories.iter().map(|c| c.taxes_paid).sum(),
        total_limitation: categories.iter().map(|c| c.limitation).sum(),
        total_credit_allowed: categories.iter().map(|c| c.credit_allowed).sum(),
        total_carryover_used: categories.iter().map(|c| c.carryover_used).sum(),
        new_carryforward: categories.iter().map(|c| c.excess_taxes).sum(),
        categories,
        amt_ftc,
    }
}
