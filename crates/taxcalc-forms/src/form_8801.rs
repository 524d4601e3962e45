//! Form 8801 - Credit for Prior Year Minimum Tax.
//!
//! Part I recomputes the tentative minimum tax using only exclusion items,
//! isolating the deferral-driven AMT that generates credit. Part II caps
//! the credit at regular tax minus TMT and carries the remainder forward
//! indefinitely, consumed oldest year first.

use serde::{Deserialize, Serialize};

use taxcalc_core::{consume_fifo, CarryoverRecord, FilingStatus, Money, PriorYearAmtDetail,
    YearTable};

use crate::form_6251::{exemption_after_phaseout, tiered_tmt};

/// Exclusion-item adjustment lines for the Part I recomputation. Deferral
/// items enter as negative amounts removing them from AMTI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionAdjustments {
    #[serde(default)]
    pub salt: Money,
    #[serde(default)]
    pub tax_refund: Money,
    #[serde(default)]
    pub investment_interest: Money,
    /// Negative: removes the deferral item.
    #[serde(default)]
    pub depreciation: Money,
    #[serde(default)]
    pub adjusted_gain_loss: Money,
    /// Negative: removes the deferral item.
    #[serde(default)]
    pub iso: Money,
    #[serde(default)]
    pub other: Money,
}

impl ExclusionAdjustments {
    pub fn total(&self) -> Money {
        self.salt
            + self.tax_refund
            + self.investment_interest
            + self.depreciation
            + self.adjusted_gain_loss
            + self.iso
            + self.other
    }
}

/// Inputs to the credit computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8801Input {
    pub filing_status: FilingStatus,
    pub tax_year: u16,
    /// Prior-year AMTI (Form 6251 line 4).
    pub prior_year_amti: Money,
    pub adjustments: ExclusionAdjustments,
    pub current_year_regular_tax: Money,
    pub current_year_tmt: Money,
    /// Prior-year AMT decomposition; the most recent year's deferral
    /// portion is the newly generated credit.
    #[serde(default)]
    pub prior_year_amt_details: Vec<PriorYearAmtDetail>,
    #[serde(default)]
    pub mtc_carryforwards: Vec<CarryoverRecord>,
}

/// Part I result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8801PartI {
    pub exclusion_amti: Money,
    pub exemption: Money,
    pub amt_taxable: Money,
    pub net_minimum_tax_on_exclusion_items: Money,
}

/// Complete Form 8801 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8801Result {
    pub part_i: Form8801PartI,
    pub mtc_from_prior_years: Money,
    pub mtc_generated_this_year: Money,
    pub total_mtc_available: Money,
    pub credit_limit: Money,
    pub credit_allowed: Money,
    pub carryforward_to_next_year: Money,
    /// Carryforward records after FIFO consumption, plus any new record
    /// for this year's generated credit.
    pub carryforwards_after: Vec<CarryoverRecord>,
    pub tax_after_credit: Money,
}

/// Compute Form 8801.
pub fn compute(input: &Form8801Input, table: &YearTable) -> Form8801Result {
    // Part I: AMTI restated for exclusion items only.
    let exclusion_amti = input.prior_year_amti + input.adjustments.total();
    let exemption = exemption_after_phaseout(input.filing_status, exclusion_amti, table);
    let amt_taxable = exclusion_amti.saturating_sub(exemption);
    let exclusion_tmt = tiered_tmt(input.filing_status, amt_taxable, table).round_to_cents();

    let part_i = Form8801PartI {
        exclusion_amti,
        exemption,
        amt_taxable,
        net_minimum_tax_on_exclusion_items: exclusion_tmt,
    };

    // Part II.
    let mut carryforwards = input.mtc_carryforwards.clone();
    let prior_mtc: Money = carryforwards.iter().map(|c| c.remaining()).sum();

    let generated = input
        .prior_year_amt_details
        .iter()
        .find(|d| d.tax_year + 1 == input.tax_year)
        .map(|d| d.mtc_generated())
        .unwrap_or(Money::ZERO);

    let total_available = prior_mtc + generated;

    // The credit can reduce regular tax down to TMT, not below.
    let credit_limit = input
        .current_year_regular_tax
        .saturating_sub(input.current_year_tmt);
    let credit_allowed = total_available.min(credit_limit);

    // Consume prior-year records first (oldest origin year), then the
    // newly generated credit.
    let consumed_from_prior = consume_fifo(&mut carryforwards, credit_allowed, input.tax_year, None);
    let consumed_from_new = credit_allowed - consumed_from_prior;
    let new_remaining = generated - consumed_from_new;
    if new_remaining.is_positive() {
        let mut record = CarryoverRecord::new(input.tax_year.saturating_sub(1), generated);
        record.used_amount = consumed_from_new;
        carryforwards.push(record);
    }

    let carryforward_total = total_available - credit_allowed;

    Form8801Result {
        part_i,
        mtc_from_prior_years: prior_mtc,
        mtc_generated_this_year: generated,
        total_mtc_available: total_available,
        credit_limit,
        credit_allowed,
        carryforward_to_next_year: carryforward_total,
        carryforwards_after: carryforwards,
        tax_after_credit: input
            .current_year_tmt
            .max(input.current_year_regular_tax - credit_allowed),
    }
}
