//! Form 6251 - Alternative Minimum Tax (Individuals).
//!
//! Part I rebuilds taxable income into AMTI by re-adding preference items;
//! Part II applies the exemption with its 25-cents-per-dollar phaseout;
//! the tentative minimum tax uses the 26%/28% schedule, switching to
//! capital-gains rates for the preferential slice (Part III) when the
//! return carries net capital gain or qualified dividends.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{AmtPreferences, FilingStatus, Money, YearTable};

/// Itemized-deduction figures the AMT computation re-adds. All zero for a
/// non-itemizer (the standard deduction is added back instead).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemizedAddbacks {
    /// SALT actually deducted on Schedule A (already capped).
    pub salt_deducted: Money,
    /// State tax refund included in income (reverses out of AMTI).
    pub state_refund_in_income: Money,
    pub investment_interest: Money,
}

/// Inputs to the AMT computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form6251Input {
    pub filing_status: FilingStatus,
    /// Regular taxable income (Form 1040 line 15).
    pub taxable_income: Money,
    /// Standard deduction taken, zero when itemizing.
    pub standard_deduction: Money,
    /// Present only when itemizing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemized: Option<ItemizedAddbacks>,
    #[serde(default)]
    pub preferences: AmtPreferences,
    /// Regular tax for AMT purposes (tax on ordinary income plus
    /// capital-gains tax, before credits).
    pub regular_tax_for_amt: Money,
    /// Net capital gain plus qualified dividends taxed at preferential
    /// rates.
    #[serde(default)]
    pub preferential_income: Money,
    /// Minimum tax credit claimed this year (Form 8801).
    #[serde(default)]
    pub prior_year_mtc: Money,
}

/// One named AMTI adjustment line, for the result breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmtiAdjustmentLine {
    pub label: String,
    pub amount: Money,
}

/// Complete Form 6251 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form6251Result {
    pub amti: Money,
    pub adjustments: Vec<AmtiAdjustmentLine>,
    pub exemption: Money,
    pub amt_taxable: Money,
    pub tentative_minimum_tax: Money,
    pub regular_tax_for_amt: Money,
    pub amt_before_mtc: Money,
    pub mtc_applied: Money,
    pub amt: Money,
    pub used_preferential_rates: bool,
}

impl Form6251Result {
    pub fn owes_amt(&self) -> bool {
        self.amt.is_positive()
    }
}

/// Compute Form 6251.
pub fn compute(input: &Form6251Input, table: &YearTable) -> Form6251Result {
    let mut adjustments = Vec::new();
    let mut amti = input.taxable_income;

    match &input.itemized {
        Some(itemized) => {
            // SALT addback is limited to the capped deduction actually taken.
            let salt = itemized.salt_deducted.min(Money::new(table.salt_cap));
            if salt.is_positive() {
                adjustments.push(AmtiAdjustmentLine {
                    label: "state_local_taxes".into(),
                    amount: salt,
                });
                amti += salt;
            }
            if itemized.state_refund_in_income.is_positive() {
                adjustments.push(AmtiAdjustmentLine {
                    label: "tax_refund_reversal".into(),
                    amount: -itemized.state_refund_in_income,
                });
                amti -= itemized.state_refund_in_income;
            }
            if itemized.investment_interest.is_positive() {
                adjustments.push(AmtiAdjustmentLine {
                    label: "investment_interest".into(),
                    amount: itemized.investment_interest,
                });
                amti += itemized.investment_interest;
            }
        }
        None => {
            if input.standard_deduction.is_positive() {
                adjustments.push(AmtiAdjustmentLine {
                    label: "standard_deduction".into(),
                    amount: input.standard_deduction,
                });
                amti += input.standard_deduction;
            }
        }
    }

    let iso_spread: Money = input.preferences.iso_exercises.iter().map(|i| i.spread()).sum();
    if !iso_spread.is_zero() {
        adjustments.push(AmtiAdjustmentLine {
            label: "incentive_stock_options".into(),
            amount: iso_spread,
        });
        amti += iso_spread;
    }

    let pab_interest: Money = input
        .preferences
        .private_activity_bonds
        .iter()
        .map(|b| b.amt_preference())
        .sum();
    if !pab_interest.is_zero() {
        adjustments.push(AmtiAdjustmentLine {
            label: "private_activity_bond_interest".into(),
            amount: pab_interest,
        });
        amti += pab_interest;
    }

    let depreciation: Money = input
        .preferences
        .depreciation_adjustments
        .iter()
        .map(|d| d.adjustment())
        .sum();
    if !depreciation.is_zero() {
        adjustments.push(AmtiAdjustmentLine {
            label: "post_1986_depreciation".into(),
            amount: depreciation,
        });
        amti += depreciation;
    }

    let other: Money = input
        .preferences
        .other_adjustments
        .iter()
        .map(|a| a.amount)
        .sum();
    if !other.is_zero() {
        adjustments.push(AmtiAdjustmentLine {
            label: "other_adjustments".into(),
            amount: other,
        });
        amti += other;
    }

    // Part II: exemption with phaseout.
    let exemption = exemption_after_phaseout(input.filing_status, amti, table);
    let amt_taxable = amti.saturating_sub(exemption);

    // TMT: 26%/28% schedule, preferential slice at capital-gains rates.
    let use_preferential = input.preferential_income.is_positive();
    let tmt = if use_preferential {
        let pref_slice = input.preferential_income.min(amt_taxable);
        let ordinary_slice = amt_taxable - pref_slice;
        tiered_tmt(input.filing_status, ordinary_slice, table)
            + table.preferential_tax(input.filing_status, ordinary_slice, pref_slice)
    } else {
        tiered_tmt(input.filing_status, amt_taxable, table)
    };

    let amt_before_mtc = tmt.saturating_sub(input.regular_tax_for_amt);
    let mtc_applied = input.prior_year_mtc.min(amt_before_mtc);
    let amt = amt_before_mtc - mtc_applied;

    Form6251Result {
        amti,
        adjustments,
        exemption,
        amt_taxable,
        tentative_minimum_tax: tmt.round_to_cents(),
        regular_tax_for_amt: input.regular_tax_for_amt,
        amt_before_mtc: amt_before_mtc.round_to_cents(),
        mtc_applied: mtc_applied.round_to_cents(),
        amt: amt.round_to_cents(),
        used_preferential_rates: use_preferential,
    }
}

/// Exemption reduced by 25 cents per dollar of AMTI over the phaseout
/// start, floored at zero.
pub fn exemption_after_phaseout(
    status: FilingStatus,
    amti: Money,
    table: &YearTable,
) -> Money {
    let base = table.amt_exemption(status);
    let start = table.amt_phaseout_start(status);
    if amti <= start {
        return base;
    }
    let reduction = (amti - start).mul_rate(dec!(0.25));
    base.saturating_sub(reduction)
}

/// 26% up to the 28% threshold, 28% above.
pub fn tiered_tmt(status: FilingStatus, amt_taxable: Money, table: &YearTable) -> Money {
    let threshold = table.amt_28_threshold(status);
    let taxable = amt_taxable.floor_zero();
    if taxable <= threshold {
        taxable.mul_rate(dec!(0.26))
    } else {
        threshold.mul_rate(dec!(0.26)) + (taxable - threshold).mul_rate(dec!(0.28))
    }
}

/// A lightweight AMT exposure screen for UI warnings. Does not compute
/// the full form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmtRiskAssessment {
    pub likely: bool,
    pub risk_factors: Vec<String>,
}

pub fn check_amt_likely(
    taxable_income: Money,
    salt_deduction: Money,
    iso_spread: Money,
    filing_status: FilingStatus,
    table: &YearTable,
) -> AmtRiskAssessment {
    let mut risk_factors = Vec::new();

    if iso_spread.is_positive() {
        risk_factors.push(format!(
            "ISO exercise spread of {iso_spread} is an AMT preference"
        ));
    }
    if salt_deduction >= Money::new(table.salt_cap) {
        risk_factors.push("SALT deduction at the cap is fully added back for AMT".to_string());
    }
    let exemption = table.amt_exemption(filing_status);
    if taxable_income + iso_spread > exemption.mul_rate(dec!(3)) {
        risk_factors.push("income is high relative to the AMT exemption".to_string());
    }

    AmtRiskAssessment {
        likely: iso_spread.is_positive()
            || (salt_deduction >= Money::new(table.salt_cap)
                && taxable_income > exemption.mul_rate(dec!(2))),
        risk_factors,
    }
}
