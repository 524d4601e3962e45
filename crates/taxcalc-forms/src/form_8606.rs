//! Form 8606 - Nondeductible IRAs.
//!
//! Part I applies the pro-rata rule across all traditional IRAs; Part II
//! applies the same split to Roth conversions; Part III applies the Roth
//! ordering rules (contributions, then conversions, then earnings) with
//! the qualified-distribution tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::Money;

/// A single Roth conversion, for the 5-year penalty clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RothConversion {
    pub conversion_year: u16,
    pub amount: Money,
}

/// Inputs to the basis computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Form8606Input {
    pub taxpayer_age: u8,
    pub tax_year: u16,

    // Part I
    /// Basis from prior Form 8606 line 14.
    #[serde(default)]
    pub prior_basis: Money,
    /// Nondeductible contributions for the current year.
    #[serde(default)]
    pub current_year_nondeductible: Money,
    /// Year-end value of all traditional, SEP, and SIMPLE IRAs.
    #[serde(default)]
    pub year_end_value_all_trad_iras: Money,
    /// Traditional IRA distributions taken during the year.
    #[serde(default)]
    pub distributions: Money,
    /// Amounts converted to Roth during the year.
    #[serde(default)]
    pub conversions_to_roth: Money,

    // Part III
    #[serde(default)]
    pub roth_distributions: Money,
    /// Lifetime regular Roth contributions.
    #[serde(default)]
    pub total_roth_contributions: Money,
    /// Lifetime Roth conversion principal.
    #[serde(default)]
    pub total_roth_conversions: Money,
    #[serde(default)]
    pub roth_conversions: Vec<RothConversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_roth_contribution_year: Option<u16>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_beneficiary_distribution: bool,
    /// First-home expenses, honored up to the $10,000 lifetime limit.
    #[serde(default)]
    pub first_time_homebuyer_amount: Money,
}

/// Part I result: the pro-rata split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProRataResult {
    pub total_basis: Money,
    pub aggregate_value: Money,
    /// min(1, basis / aggregate value), six decimal places.
    pub nontaxable_percentage: Decimal,
    pub nontaxable_amount: Money,
    pub taxable_amount: Money,
    pub remaining_basis: Money,
}

/// Part II result: conversion split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub converted: Money,
    pub nontaxable_amount: Money,
    pub taxable_amount: Money,
}

/// Part III result: Roth ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RothDistributionResult {
    pub total_distribution: Money,
    pub from_contributions: Money,
    pub from_conversions: Money,
    pub from_earnings: Money,
    pub taxable_amount: Money,
    pub penalty_amount: Money,
    pub is_qualified: bool,
}

/// Complete Form 8606 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8606Result {
    pub part_i: ProRataResult,
    pub part_ii: ConversionResult,
    pub part_iii: RothDistributionResult,
}

/// Part I: pro-rata rule over distributions plus conversions.
pub fn compute_pro_rata(input: &Form8606Input) -> ProRataResult {
    let total_basis = input.prior_basis + input.current_year_nondeductible;
    let outflow = input.distributions + input.conversions_to_roth;
    let aggregate_value = input.year_end_value_all_trad_iras + outflow;

    if outflow.is_zero() || aggregate_value.is_zero() {
        return ProRataResult {
            total_basis,
            aggregate_value,
            nontaxable_percentage: Decimal::ZERO,
            nontaxable_amount: Money::ZERO,
            taxable_amount: Money::ZERO,
            remaining_basis: total_basis,
        };
    }

    let pct = (total_basis.as_decimal() / aggregate_value.as_decimal())
        .min(Decimal::ONE)
        .round_dp(6);
    let nontaxable = outflow.mul_rate(pct).round_to_cents();
    let taxable = outflow - nontaxable;
    let remaining_basis = total_basis.saturating_sub(nontaxable);

    ProRataResult {
        total_basis,
        aggregate_value,
        nontaxable_percentage: pct,
        nontaxable_amount: nontaxable,
        taxable_amount: taxable,
        remaining_basis,
    }
}

/// Part II: the conversion's share of the pro-rata split.
pub fn compute_conversion(input: &Form8606Input, part_i: &ProRataResult) -> ConversionResult {
    if input.conversions_to_roth.is_zero() {
        return ConversionResult {
            converted: Money::ZERO,
            nontaxable_amount: Money::ZERO,
            taxable_amount: Money::ZERO,
        };
    }
    let nontaxable = input
        .conversions_to_roth
        .mul_rate(part_i.nontaxable_percentage)
        .round_to_cents();
    ConversionResult {
        converted: input.conversions_to_roth,
        nontaxable_amount: nontaxable,
        taxable_amount: input.conversions_to_roth - nontaxable,
    }
}

fn is_qualified(input: &Form8606Input) -> bool {
    let five_year_met = input
        .first_roth_contribution_year
        .is_some_and(|y| input.tax_year >= y + 5);
    if !five_year_met {
        return false;
    }
    input.taxpayer_age >= 59
        || input.is_disabled
        || input.is_beneficiary_distribution
        || input.first_time_homebuyer_amount.is_positive()
}

fn has_recent_conversion(input: &Form8606Input) -> bool {
    // Simplified: any conversion within 5 years triggers the penalty
    // check; per-conversion clocks are not tracked.
    input
        .roth_conversions
        .iter()
        .any(|c| input.tax_year < c.conversion_year + 5)
}

fn has_penalty_exception(input: &Form8606Input) -> bool {
    input.is_disabled
        || input.is_beneficiary_distribution
        || input.first_time_homebuyer_amount.is_positive()
}

/// Part III: Roth ordering rules.
pub fn compute_roth_distribution(input: &Form8606Input) -> RothDistributionResult {
    let total = input.roth_distributions;
    if total.is_zero() {
        return RothDistributionResult {
            total_distribution: Money::ZERO,
            from_contributions: Money::ZERO,
            from_conversions: Money::ZERO,
            from_earnings: Money::ZERO,
            taxable_amount: Money::ZERO,
            penalty_amount: Money::ZERO,
            is_qualified: false,
        };
    }

    if is_qualified(input) {
        return RothDistributionResult {
            total_distribution: total,
            from_contributions: total,
            from_conversions: Money::ZERO,
            from_earnings: Money::ZERO,
            taxable_amount: Money::ZERO,
            penalty_amount: Money::ZERO,
            is_qualified: true,
        };
    }

    // Ordering: contributions, then conversions, then earnings.
    let from_contributions = total.min(input.total_roth_contributions);
    let mut remaining = total - from_contributions;
    let from_conversions = remaining.min(input.total_roth_conversions);
    remaining -= from_conversions;
    let from_earnings = remaining;

    let mut penalty = Money::ZERO;
    if input.taxpayer_age < 59 {
        if from_conversions.is_positive() && has_recent_conversion(input) {
            penalty += from_conversions.mul_rate(dec!(0.10)).round_to_cents();
        }
        if from_earnings.is_positive() && !has_penalty_exception(input) {
            penalty += from_earnings.mul_rate(dec!(0.10)).round_to_cents();
        }
    }

    RothDistributionResult {
        total_distribution: total,
        from_contributions,
        from_conversions,
        from_earnings,
        taxable_amount: from_earnings,
        penalty_amount: penalty,
        is_qualified: false,
    }
}

/// Compute all three parts.
pub fn compute(input: &Form8606Input) -> Form8606Result {
    let part_i = compute_pro_rata(input);
    let part_ii = compute_conversion(input, &part_i);
    let part_iii = compute_roth_distribution(input);
    Form8606Result {
        part_i,
        part_ii,
        part_iii,
    }
}
