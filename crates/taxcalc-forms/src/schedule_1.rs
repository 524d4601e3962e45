//! Schedule 1 - Additional Income and Adjustments to Income.
//!
//! Part I aggregates additional income into Form 1040 line 8; Part II
//! aggregates above-the-line adjustments into line 10. The schedule is
//! attached only when either part carries a nonzero total.

use serde::{Deserialize, Serialize};

use taxcalc_core::Money;

/// A free-form line 8z / 24z item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherItem {
    pub description: String,
    pub amount: Money,
}

/// Part I: additional income (lines 1-9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule1Part1 {
    /// Line 1: taxable state/local refunds (itemizers only).
    #[serde(default)]
    pub taxable_refunds: Money,
    /// Line 2a: alimony received (pre-2019 decrees).
    #[serde(default)]
    pub alimony_received: Money,
    /// Line 3: Schedule C net profit or loss (signed).
    #[serde(default)]
    pub business_income: Money,
    /// Line 4: other gains/losses (Form 4797, signed).
    #[serde(default)]
    pub other_gains_losses: Money,
    /// Line 5: Schedule E rental/royalty/pass-through income (signed).
    #[serde(default)]
    pub schedule_e_income: Money,
    /// Line 6: farm income (signed).
    #[serde(default)]
    pub farm_income: Money,
    /// Line 7: unemployment compensation.
    #[serde(default)]
    pub unemployment_compensation: Money,
    // Line 8 named items
    #[serde(default)]
    pub gambling_income: Money,
    /// Line 8c: taxable cancellation-of-debt income (after Form 982).
    #[serde(default)]
    pub cod_income: Money,
    #[serde(default)]
    pub alaska_pfd: Money,
    #[serde(default)]
    pub jury_duty_pay: Money,
    #[serde(default)]
    pub hobby_income: Money,
    /// Line 8m: Section 951(a) Subpart F inclusion.
    #[serde(default)]
    pub section_951a_inclusion: Money,
    /// Line 8n: Section 951A GILTI inclusion.
    #[serde(default)]
    pub gilti_inclusion: Money,
    /// Line 8z: everything else.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_income: Vec<OtherItem>,
}

impl Schedule1Part1 {
    pub fn other_income_total(&self) -> Money {
        self.other_income.iter().map(|i| i.amount).sum()
    }

    /// Line 9: total additional income, flows to Form 1040 line 8.
    pub fn total_additional_income(&self) -> Money {
        self.taxable_refunds
            + self.alimony_received
            + self.business_income
            + self.other_gains_losses
            + self.schedule_e_income
            + self.farm_income
            + self.unemployment_compensation
            + self.gambling_income
            + self.cod_income
            + self.alaska_pfd
            + self.jury_duty_pay
            + self.hobby_income
            + self.section_951a_inclusion
            + self.gilti_inclusion
            + self.other_income_total()
    }
}

/// Part II: adjustments to income (lines 11-25).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule1Part2 {
    /// Line 11: educator expenses.
    #[serde(default)]
    pub educator_expenses: Money,
    /// Line 13: HSA deduction.
    #[serde(default)]
    pub hsa_deduction: Money,
    /// Line 15: deductible part of self-employment tax.
    #[serde(default)]
    pub se_tax_deduction: Money,
    /// Line 16: SEP/SIMPLE/qualified plan contributions.
    #[serde(default)]
    pub retirement_plan_contributions: Money,
    /// Line 17: self-employed health insurance.
    #[serde(default)]
    pub se_health_insurance: Money,
    /// Line 20: deductible IRA contributions.
    #[serde(default)]
    pub ira_deduction: Money,
    /// Line 21: student loan interest (capped upstream).
    #[serde(default)]
    pub student_loan_interest: Money,
    /// Line 24z: everything else.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_adjustments: Vec<OtherItem>,
}

impl Schedule1Part2 {
    pub fn other_adjustments_total(&self) -> Money {
        self.other_adjustments.iter().map(|i| i.amount).sum()
    }

    /// Line 25: total adjustments, flows to Form 1040 line 10.
    pub fn total_adjustments(&self) -> Money {
        self.educator_expenses
            + self.hsa_deduction
            + self.se_tax_deduction
            + self.retirement_plan_contributions
            + self.se_health_insurance
            + self.ira_deduction
            + self.student_loan_interest
            + self.other_adjustments_total()
    }
}

/// The full schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule1 {
    pub part_1: Schedule1Part1,
    pub part_2: Schedule1Part2,
}

impl Schedule1 {
    /// The schedule is attached when either part has a nonzero total.
    pub fn is_required(&self) -> bool {
        !self.part_1.total_additional_income().is_zero()
            || !self.part_2.total_adjustments().is_zero()
    }
}
