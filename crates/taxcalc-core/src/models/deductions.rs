//! Deductions: standard-vs-itemized selector and itemized line items.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::year::YearTable;

/// Itemized deduction line items (Schedule A).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemizedDeductions {
    /// Medical expenses before the 7.5%-of-AGI floor.
    #[serde(default)]
    pub medical_expenses: Money,
    #[serde(default)]
    pub state_local_income_tax: Money,
    #[serde(default)]
    pub real_estate_tax: Money,
    #[serde(default)]
    pub personal_property_tax: Money,
    #[serde(default)]
    pub mortgage_interest: Money,
    #[serde(default)]
    pub investment_interest: Money,
    #[serde(default)]
    pub charitable_cash: Money,
    #[serde(default)]
    pub charitable_noncash: Money,
    #[serde(default)]
    pub other_itemized: Money,
}

impl ItemizedDeductions {
    /// SALT before the cap.
    pub fn salt_total(&self) -> Money {
        self.state_local_income_tax + self.real_estate_tax + self.personal_property_tax
    }

    /// SALT after the statutory cap from the year table.
    pub fn salt_allowed(&self, table: &YearTable) -> Money {
        self.salt_total().min(Money::new(table.salt_cap))
    }

    /// Medical expenses over the 7.5%-of-AGI floor.
    pub fn medical_allowed(&self, agi: Money) -> Money {
        let floor = agi.mul_rate(rust_decimal_macros::dec!(0.075));
        self.medical_expenses.saturating_sub(floor)
    }

    /// Total itemized deduction for a given AGI.
    pub fn total(&self, agi: Money, table: &YearTable) -> Money {
        self.medical_allowed(agi)
            + self.salt_allowed(table)
            + self.mortgage_interest
            + self.investment_interest
            + self.charitable_cash
            + self.charitable_noncash
            + self.other_itemized
    }
}

/// Deduction selection plus above-the-line adjustments that feed
/// Schedule 1 Part II.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deductions {
    #[serde(default = "default_true")]
    pub use_standard_deduction: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemized: Option<ItemizedDeductions>,

    // Above-the-line adjustments
    #[serde(default)]
    pub educator_expenses: Money,
    #[serde(default)]
    pub hsa_contributions: Money,
    #[serde(default)]
    pub ira_contributions: Money,
    #[serde(default)]
    pub student_loan_interest: Money,
    #[serde(default)]
    pub self_employed_health_insurance: Money,
}

fn default_true() -> bool {
    true
}

impl Deductions {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn itemizing(itemized: ItemizedDeductions) -> Self {
        Self {
            use_standard_deduction: false,
            itemized: Some(itemized),
            ..Default::default()
        }
    }

    pub fn is_itemizing(&self) -> bool {
        !self.use_standard_deduction && self.itemized.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilingStatus;

    #[test]
    fn salt_is_capped() {
        let table = YearTable::year_2025();
        let itemized = ItemizedDeductions {
            state_local_income_tax: Money::from_dollars(14_000),
            real_estate_tax: Money::from_dollars(6_000),
            ..Default::default()
        };
        assert_eq!(itemized.salt_total(), Money::from_dollars(20_000));
        assert_eq!(itemized.salt_allowed(&table), Money::from_dollars(10_000));
    }

    #[test]
    fn medical_floor_applies() {
        let itemized = ItemizedDeductions {
            medical_expenses: Money::from_dollars(12_000),
            ..Default::default()
        };
        // AGI 100k -> floor 7,500 -> allowed 4,500
        assert_eq!(
            itemized.medical_allowed(Money::from_dollars(100_000)),
            Money::from_dollars(4_500)
        );
        // Below the floor: nothing
        assert_eq!(
            itemized.medical_allowed(Money::from_dollars(200_000)),
            Money::ZERO
        );
    }

    #[test]
    fn itemized_total_vs_standard() {
        let table = YearTable::year_2025();
        let itemized = ItemizedDeductions {
            state_local_income_tax: Money::from_dollars(10_000),
            mortgage_interest: Money::from_dollars(12_000),
            charitable_cash: Money::from_dollars(3_000),
            ..Default::default()
        };
        let total = itemized.total(Money::from_dollars(150_000), &table);
        assert_eq!(total, Money::from_dollars(25_000));
        assert!(total > table.standard_deduction(FilingStatus::Single));
    }
}
