//! Form 5329 - Additional Taxes on Qualified Plans.
//!
//! Nine independent, additive parts: the 10% early-distribution penalty
//! (Part I), 6% excise taxes on excess contributions to each account kind
//! (Parts II-VII and IX), and the RMD shortfall penalty (Part VIII). A
//! helper computes the Roth IRA contribution limit under the MAGI
//! phaseout.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{FilingStatus, Money, YearTable};

/// Exception codes for the 10% early-distribution penalty (IRC 72(t)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCode {
    /// "00" - no exception.
    NoException,
    /// "01" - separation from service after age 55.
    SeparationAfter55,
    /// "02" - substantially equal periodic payments.
    Sepp,
    /// "03" - disability.
    Disability,
    /// "04" - death (beneficiary or estate).
    Death,
    /// "05" - medical expenses over 7.5% of AGI.
    MedicalExpenses,
    /// "06" - health insurance premiums while unemployed.
    HealthInsuranceUnemployed,
    /// "07" - higher education expenses.
    HigherEducation,
    /// "08" - first-time homebuyer ($10,000 lifetime).
    FirstHome,
    /// "09" - IRS levy.
    IrsLevy,
    /// "10" - qualified reservist distribution.
    Reservist,
    /// "11" - Roth IRA return of contributions.
    RothContributions,
    /// "12" - qualified birth or adoption (up to $5,000).
    BirthAdoption,
    /// "13" - qualified disaster distribution.
    Disaster,
    /// "14" - domestic abuse victim distribution.
    DomesticAbuse,
    /// "15" - terminal illness.
    TerminalIllness,
    /// "16" - emergency personal expense ($1,000/year).
    EmergencyExpense,
    /// "17" - federal disaster distribution.
    FederalDisaster,
    /// "18" - corrective distribution of excess contributions.
    ExcessContributionCorrection,
    /// "19" - public safety employee separation at 50.
    SeparationPublicSafety50,
}

impl ExceptionCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoException => "00",
            Self::SeparationAfter55 => "01",
            Self::Sepp => "02",
            Self::Disability => "03",
            Self::Death => "04",
            Self::MedicalExpenses => "05",
            Self::HealthInsuranceUnemployed => "06",
            Self::HigherEducation => "07",
            Self::FirstHome => "08",
            Self::IrsLevy => "09",
            Self::Reservist => "10",
            Self::RothContributions => "11",
            Self::BirthAdoption => "12",
            Self::Disaster => "13",
            Self::DomesticAbuse => "14",
            Self::TerminalIllness => "15",
            Self::EmergencyExpense => "16",
            Self::FederalDisaster => "17",
            Self::ExcessContributionCorrection => "18",
            Self::SeparationPublicSafety50 => "19",
        }
    }
}

/// One early distribution subject to Part I.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyDistribution {
    pub description: String,
    pub taxable_amount: Money,
    pub exception_code: ExceptionCode,
    /// Portion of the taxable amount covered by the exception.
    #[serde(default)]
    pub exception_amount: Money,
}

impl EarlyDistribution {
    /// Amount subject to the 10% penalty.
    pub fn amount_subject(&self) -> Money {
        let exception = if self.exception_code == ExceptionCode::NoException {
            Money::ZERO
        } else {
            self.exception_amount
        };
        self.taxable_amount.saturating_sub(exception)
    }
}

/// Account kinds carrying the 6% excess-contribution excise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcessAccountKind {
    TraditionalIra,
    RothIra,
    CoverdellEsa,
    ArcherMsa,
    Hsa,
    Able,
    Section529,
}

/// Excess-contribution state for one account kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcessContribution {
    pub kind: ExcessAccountKind,
    pub current_year_contributions: Money,
    pub contribution_limit: Money,
    #[serde(default)]
    pub prior_year_excess: Money,
    /// Excess withdrawn before the filing deadline.
    #[serde(default)]
    pub excess_withdrawn: Money,
    #[serde(default)]
    pub recharacterized: Money,
    #[serde(default)]
    pub applied_to_prior_year: Money,
}

impl ExcessContribution {
    pub fn current_year_excess(&self) -> Money {
        self.current_year_contributions
            .saturating_sub(self.contribution_limit)
    }

    /// Total excess subject to the 6% excise.
    pub fn total_excess(&self) -> Money {
        (self.prior_year_excess + self.current_year_excess())
            .saturating_sub(self.excess_withdrawn)
            .saturating_sub(self.recharacterized)
            .saturating_sub(self.applied_to_prior_year)
    }

    pub fn excise_tax(&self) -> Money {
        self.total_excess().mul_rate(dec!(0.06)).round_to_cents()
    }
}

/// An RMD shortfall for Part VIII.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmdFailure {
    pub required_minimum_distribution: Money,
    pub actual_distribution: Money,
    /// Corrected within the statutory correction window: 10% instead of
    /// 25%.
    #[serde(default)]
    pub corrected_timely: bool,
    #[serde(default)]
    pub reasonable_cause_waiver_requested: bool,
}

impl RmdFailure {
    pub fn shortfall(&self) -> Money {
        self.required_minimum_distribution
            .saturating_sub(self.actual_distribution)
    }

    pub fn excise_tax(&self) -> Money {
        if self.reasonable_cause_waiver_requested {
            return Money::ZERO;
        }
        let rate = if self.corrected_timely {
            dec!(0.10)
        } else {
            dec!(0.25)
        };
        self.shortfall().mul_rate(rate).round_to_cents()
    }
}

/// Inputs for the full form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Form5329Input {
    pub taxpayer_age: u8,
    #[serde(default)]
    pub early_distributions: Vec<EarlyDistribution>,
    #[serde(default)]
    pub excess_contributions: Vec<ExcessContribution>,
    #[serde(default)]
    pub rmd_failures: Vec<RmdFailure>,
}

/// Per-part breakdown plus the combined additional tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form5329Result {
    pub early_distribution_penalty: Money,
    /// 6% excise by account kind, in input order.
    pub excise_by_account: Vec<(ExcessAccountKind, Money)>,
    pub rmd_penalty: Money,
    pub total_additional_tax: Money,
}

/// Compute all parts of Form 5329.
pub fn compute(input: &Form5329Input) -> Form5329Result {
    let early_distribution_penalty: Money = input
        .early_distributions
        .iter()
        .map(|d| d.amount_subject().mul_rate(dec!(0.10)))
        .sum::<Money>()
        .round_to_cents();

    let excise_by_account: Vec<(ExcessAccountKind, Money)> = input
        .excess_contributions
        .iter()
        .map(|e| (e.kind, e.excise_tax()))
        .collect();
    let excise_total: Money = excise_by_account.iter().map(|(_, t)| *t).sum();

    let rmd_penalty: Money = input.rmd_failures.iter().map(|r| r.excise_tax()).sum();

    Form5329Result {
        early_distribution_penalty,
        excise_by_account,
        rmd_penalty,
        total_additional_tax: early_distribution_penalty + excise_total + rmd_penalty,
    }
}

/// Roth IRA contribution limit after the MAGI phaseout.
///
/// Linear reduction across the phaseout window; a nonzero result is
/// floored at $200 and rounded to the nearest $10.
pub fn roth_contribution_limit(
    magi: Money,
    filing_status: FilingStatus,
    age: u8,
    table: &YearTable,
) -> Money {
    let base = Money::new(table.ira_contribution_limit)
        + if age >= 50 {
            Money::new(table.ira_catch_up_50)
        } else {
            Money::ZERO
        };
    let (start, end) = table.roth_phaseout(filing_status);
    if magi <= start {
        return base;
    }
    if magi >= end {
        return Money::ZERO;
    }
    let range = end - start;
    let ratio = (end - magi).as_decimal() / range.as_decimal();
    let reduced = base.mul_rate(ratio).round_to_nearest(10);
    if reduced.is_positive() {
        reduced.max(Money::from_dollars(200))
    } else {
        Money::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_distribution_without_exception() {
        let input = Form5329Input {
            taxpayer_age: 45,
            early_distributions: vec![EarlyDistribution {
                description: "401k withdrawal".into(),
                taxable_amount: Money::from_dollars(20_000),
                exception_code: ExceptionCode::NoException,
                exception_amount: Money::from_dollars(99_999), // ignored
            }],
            ..Default::default()
        };
        let r = compute(&input);
        assert_eq!(r.early_distribution_penalty, Money::from_dollars(2_000));
        assert_eq!(r.total_additional_tax, Money::from_dollars(2_000));
    }

    #[test]
    fn exception_reduces_penalty_base() {
        let dist = EarlyDistribution {
            description: "IRA withdrawal".into(),
            taxable_amount: Money::from_dollars(15_000),
            exception_code: ExceptionCode::HigherEducation,
            exception_amount: Money::from_dollars(9_000),
        };
        assert_eq!(dist.amount_subject(), Money::from_dollars(6_000));
    }

    #[test]
    fn exception_codes_are_stable() {
        assert_eq!(ExceptionCode::NoException.code(), "00");
        assert_eq!(ExceptionCode::Sepp.code(), "02");
        assert_eq!(ExceptionCode::SeparationPublicSafety50.code(), "19");
    }

    #[test]
    fn excess_contribution_formula() {
        let excess = ExcessContribution {
            kind: ExcessAccountKind::TraditionalIra,
            current_year_contributions: Money::from_dollars(9_000),
            contribution_limit: Money::from_dollars(7_000),
            prior_year_excess: Money::from_dollars(1_000),
            excess_withdrawn: Money::from_dollars(500),
            recharacterized: Money::ZERO,
            applied_to_prior_year: Money::ZERO,
        };
        // 1,000 + 2,000 - 500 = 2,500
        assert_eq!(excess.total_excess(), Money::from_dollars(2_500));
        assert_eq!(excess.excise_tax(), Money::from_dollars(150));
    }

    #[test]
    fn withdrawn_excess_cannot_go_negative() {
        let excess = ExcessContribution {
            kind: ExcessAccountKind::RothIra,
            current_year_contributions: Money::from_dollars(7_000),
            contribution_limit: Money::from_dollars(7_000),
            prior_year_excess: Money::from_dollars(300),
            excess_withdrawn: Money::from_dollars(1_000),
            recharacterized: Money::ZERO,
            applied_to_prior_year: Money::ZERO,
        };
        assert_eq!(excess.total_excess(), Money::ZERO);
    }

    #[test]
    fn rmd_penalty_rates() {
        let base = RmdFailure {
            required_minimum_distribution: Money::from_dollars(10_000),
            actual_distribution: Money::from_dollars(4_000),
            corrected_timely: false,
            reasonable_cause_waiver_requested: false,
        };
        assert_eq!(base.shortfall(), Money::from_dollars(6_000));
        assert_eq!(base.excise_tax(), Money::from_dollars(1_500));

        let corrected = RmdFailure {
            corrected_timely: true,
            ..base.clone()
        };
        assert_eq!(corrected.excise_tax(), Money::from_dollars(600));

        let waived = RmdFailure {
            reasonable_cause_waiver_requested: true,
            ..base
        };
        assert_eq!(waived.excise_tax(), Money::ZERO);
    }

    #[test]
    fn parts_are_additive() {
        let input = Form5329Input {
            taxpayer_age: 50,
            early_distributions: vec![EarlyDistribution {
                description: "d".into(),
                taxable_amount: Money::from_dollars(10_000),
                exception_code: ExceptionCode::NoException,
                exception_amount: Money::ZERO,
            }],
            excess_contributions: vec![ExcessContribution {
                kind: ExcessAccountKind::Hsa,
                current_year_contributions: Money::from_dollars(5_300),
                contribution_limit: Money::from_dollars(4_300),
                prior_year_excess: Money::ZERO,
                excess_withdrawn: Money::ZERO,
                recharacterized: Money::ZERO,
                applied_to_prior_year: Money::ZERO,
            }],
            rmd_failures: vec![RmdFailure {
                required_minimum_distribution: Money::from_dollars(8_000),
                actual_distribution: Money::from_dollars(8_000),
                corrected_timely: false,
                reasonable_cause_waiver_requested: false,
            }],
        };
        let r = compute(&input);
        // 1,000 penalty + 60 excise + 0 RMD
        assert_eq!(r.total_additional_tax, Money::from_dollars(1_060));
    }

    mod roth_limit {
        use super::*;

        fn table() -> YearTable {
            YearTable::year_2025()
        }

        #[test]
        fn full_limit_below_phaseout() {
            let limit = roth_contribution_limit(
                Money::from_dollars(100_000),
                FilingStatus::Single,
                40,
                &table(),
            );
            assert_eq!(limit, Money::from_dollars(7_000));
        }

        #[test]
        fn zero_above_phaseout() {
            let limit = roth_contribution_limit(
                Money::from_dollars(170_000),
                FilingStatus::Single,
                40,
                &table(),
            );
            assert_eq!(limit, Money::ZERO);
        }

        #[test]
        fn midpoint_is_half_rounded_to_ten() {
            // Single window 150,000-165,000; midpoint 157,500 -> 50%.
            let limit = roth_contribution_limit(
                Money::from_dollars(157_500),
                FilingStatus::Single,
                40,
                &table(),
            );
            assert_eq!(limit, Money::from_dollars(3_500));
        }

        #[test]
        fn catch_up_applies_at_50() {
            let limit = roth_contribution_limit(
                Money::from_dollars(100_000),
                FilingStatus::Single,
                55,
                &table(),
            );
            assert_eq!(limit, Money::from_dollars(8_000));
        }

        #[test]
        fn small_positive_amount_floors_at_200() {
            // Just inside the top of the window: reduced amount under
            // $200 floors up.
            let limit = roth_contribution_limit(
                Money::from_dollars(164_900),
                FilingStatus::Single,
                40,
                &table(),
            );
            assert_eq!(limit, Money::from_dollars(200));
        }

        #[test]
        fn mfs_window_starts_at_zero() {
            let limit = roth_contribution_limit(
                Money::from_dollars(5_000),
                FilingStatus::MarriedSeparate,
                40,
                &table(),
            );
            // Half of the 0-10,000 window consumed.
            assert_eq!(limit, Money::from_dollars(3_500));
        }
    }
}
