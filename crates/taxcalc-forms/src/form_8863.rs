//! Form 8863 - Education Credits (American Opportunity and Lifetime
//! Learning Credits).
//!
//! AOTC is per student: 100% of the first $2,000 of qualified expenses
//! plus 25% of the next $2,000, 40% refundable after the MAGI phaseout.
//! LLC is per return, 20% of up to $10,000 of expenses from students not
//! claiming AOTC, nonrefundable. Both credits share the phaseout shape;
//! MFS is disqualified.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{FilingStatus, Money, YearTable};

/// Enrollment intensity during the tax year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    FullTime,
    HalfTime,
    LessThanHalfTime,
}

/// One student's expenses and eligibility signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentExpenses {
    pub student_name: String,
    pub enrollment_status: EnrollmentStatus,
    #[serde(default = "default_true")]
    pub is_pursuing_degree: bool,
    /// Has not completed the first four undergraduate years.
    #[serde(default = "default_true")]
    pub is_first_four_years: bool,
    #[serde(default)]
    pub years_aotc_previously_claimed: u8,
    #[serde(default)]
    pub has_felony_drug_conviction: bool,
    #[serde(default = "default_true")]
    pub has_form_1098t: bool,
    /// Tuition and required fees.
    #[serde(default)]
    pub tuition_and_fees: Money,
    /// Course materials count for AOTC only.
    #[serde(default)]
    pub books_supplies_equipment: Money,
    /// Tax-free scholarships, grants, and employer assistance.
    #[serde(default)]
    pub tax_free_assistance: Money,
}

fn default_true() -> bool {
    true
}

impl StudentExpenses {
    pub fn is_aotc_eligible(&self) -> bool {
        matches!(
            self.enrollment_status,
            EnrollmentStatus::FullTime | EnrollmentStatus::HalfTime
        ) && self.is_pursuing_degree
            && self.is_first_four_years
            && self.years_aotc_previously_claimed <= 3
            && !self.has_felony_drug_conviction
            && self.has_form_1098t
    }

    pub fn aotc_qualified_expenses(&self) -> Money {
        (self.tuition_and_fees + self.books_supplies_equipment)
            .saturating_sub(self.tax_free_assistance)
    }

    pub fn llc_qualified_expenses(&self) -> Money {
        self.tuition_and_fees.saturating_sub(self.tax_free_assistance)
    }

    /// Tentative AOTC before phaseout: min(2500, first 2,000 + 25% of the
    /// next 2,000).
    pub fn tentative_aotc(&self) -> Money {
        if !self.is_aotc_eligible() {
            return Money::ZERO;
        }
        let expenses = self.aotc_qualified_expenses();
        let first_tier = expenses.min(Money::from_dollars(2_000));
        let second_tier = expenses
            .min(Money::from_dollars(4_000))
            .saturating_sub(Money::from_dollars(2_000))
            .mul_rate(dec!(0.25));
        first_tier + second_tier
    }
}

/// Complete Form 8863 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8863Result {
    pub eligible_for_credits: bool,
    pub phaseout_ratio: Decimal,
    pub tentative_aotc: Money,
    pub aotc_after_phaseout: Money,
    pub refundable_aotc: Money,
    pub nonrefundable_aotc: Money,
    pub tentative_llc: Money,
    pub llc_after_phaseout: Money,
    pub total_nonrefundable: Money,
    pub total_refundable: Money,
    /// Per-student tentative AOTC, in input order.
    pub per_student_aotc: Vec<(String, Money)>,
}

impl Form8863Result {
    pub fn total_credits(&self) -> Money {
        self.total_nonrefundable + self.total_refundable
    }
}

/// Phaseout ratio: clamp(0, 1, (limit - MAGI) / range). A zero limit
/// (MFS) disqualifies entirely.
pub fn phaseout_ratio(magi: Money, limit: Money, range: Money) -> Decimal {
    if limit.is_zero() {
        return Decimal::ZERO;
    }
    if range.is_zero() {
        return Decimal::ONE;
    }
    taxcalc_core::phaseout_ratio((limit - magi).as_decimal(), range.as_decimal())
}

/// Compute both education credits.
pub fn compute(
    students: &[StudentExpenses],
    magi: Money,
    filing_status: FilingStatus,
    table: &YearTable,
) -> Form8863Result {
    let (limit, range) = table.education_phaseout(filing_status);
    let ratio = phaseout_ratio(magi, limit, range);
    let eligible = !filing_status.is_married_separate();

    let per_student_aotc: Vec<(String, Money)> = students
        .iter()
        .map(|s| (s.student_name.clone(), s.tentative_aotc()))
        .collect();
    let tentative_aotc: Money = per_student_aotc.iter().map(|(_, c)| *c).sum();

    // LLC covers only students not claiming AOTC; the two credits cannot
    // both apply to one student in the same year.
    let llc_expenses: Money = students
        .iter()
        .filter(|s| !s.is_aotc_eligible())
        .map(|s| s.llc_qualified_expenses())
        .sum();
    let tentative_llc = llc_expenses
        .min(Money::from_dollars(10_000))
        .mul_rate(dec!(0.20));

    if !eligible {
        return Form8863Result {
            eligible_for_credits: false,
            phaseout_ratio: Decimal::ZERO,
            tentative_aotc,
            aotc_after_phaseout: Money::ZERO,
            refundable_aotc: Money::ZERO,
            nonrefundable_aotc: Money::ZERO,
            tentative_llc,
            llc_after_phaseout: Money::ZERO,
            total_nonrefundable: Money::ZERO,
            total_refundable: Money::ZERO,
            per_student_aotc,
        };
    }

    let aotc_after_phaseout = tentative_aotc.mul_rate(ratio).round_to_cents();
    let refundable = aotc_after_phaseout.mul_rate(dec!(0.40)).round_to_cents();
    let nonrefundable_aotc = aotc_after_phaseout - refundable;
    let llc_after_phaseout = tentative_llc.mul_rate(ratio).round_to_cents();

    Form8863Result {
        eligible_for_credits: true,
        phaseout_ratio: ratio,
        tentative_aotc,
        aotc_after_phaseout,
        refundable_aotc: refundable,
        nonrefundable_aotc,
        tentative_llc: tentative_llc.round_to_cents(),
        llc_after_phaseout,
        total_nonrefundable: nonrefundable_aotc + llc_after_phaseout,
        total_refundable: refundable,
        per_student_aotc,
    }
}
