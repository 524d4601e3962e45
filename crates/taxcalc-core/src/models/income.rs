//! Income sources: W-2, K-1, investment, business, rental, retirement.

use serde::{Deserialize, Serialize};

use crate::models::{AmtAdjustment, DepreciationAdjustment, IsoExercise, PassiveActivity,
    PrivateActivityBond};
use crate::money::Money;

/// A single Form W-2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct W2Info {
    pub employer_name: String,
    #[serde(default)]
    pub employer_ein: String,
    pub wages: Money,
    #[serde(default)]
    pub federal_tax_withheld: Money,
    #[serde(default)]
    pub state_wages: Money,
    #[serde(default)]
    pub state_tax_withheld: Money,
    #[serde(default)]
    pub social_security_wages: Money,
    #[serde(default)]
    pub medicare_wages: Money,
}

impl W2Info {
    pub fn new(employer_name: impl Into<String>, wages: Money) -> Self {
        Self {
            employer_name: employer_name.into(),
            employer_ein: String::new(),
            wages,
            federal_tax_withheld: Money::ZERO,
            state_wages: wages,
            state_tax_withheld: Money::ZERO,
            social_security_wages: wages,
            medicare_wages: wages,
        }
    }
}

/// Source entity type for a Schedule K-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum K1SourceType {
    Partnership,
    SCorporation,
    EstateTrust,
}

/// A Schedule K-1 from a pass-through entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleK1 {
    pub k1_type: K1SourceType,
    pub entity_name: String,
    #[serde(default)]
    pub ordinary_business_income: Money,
    #[serde(default)]
    pub net_rental_real_estate: Money,
    #[serde(default)]
    pub guaranteed_payments: Money,
    #[serde(default)]
    pub interest_income: Money,
    #[serde(default)]
    pub ordinary_dividends: Money,
    #[serde(default)]
    pub net_long_term_capital_gain: Money,
    #[serde(default)]
    pub self_employment_earnings: Money,
    // Section 199A pass-through detail
    #[serde(default)]
    pub qbi_ordinary_income: Money,
    #[serde(default)]
    pub w2_wages_for_qbi: Money,
    #[serde(default)]
    pub is_sstb: bool,
    #[serde(default)]
    pub is_passive_activity: bool,
}

/// Enhanced rental detail: net = gross - expenses - depreciation -
/// mortgage interest - property taxes. When only `simple_net` is given it
/// is used as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RentalIncome {
    #[serde(default)]
    pub gross_income: Money,
    #[serde(default)]
    pub expenses: Money,
    #[serde(default)]
    pub depreciation: Money,
    #[serde(default)]
    pub mortgage_interest: Money,
    #[serde(default)]
    pub property_taxes: Money,
    #[serde(default)]
    pub simple_net: Money,
}

impl RentalIncome {
    pub fn net(&self) -> Money {
        if self.gross_income.is_positive() {
            self.gross_income
                - self.expenses
                - self.depreciation
                - self.mortgage_interest
                - self.property_taxes
        } else {
            self.simple_net
        }
    }
}

/// AMT preference inputs attached to income when Form 6251 applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmtPreferences {
    #[serde(default)]
    pub iso_exercises: Vec<IsoExercise>,
    #[serde(default)]
    pub private_activity_bonds: Vec<PrivateActivityBond>,
    #[serde(default)]
    pub depreciation_adjustments: Vec<DepreciationAdjustment>,
    #[serde(default)]
    pub other_adjustments: Vec<AmtAdjustment>,
}

/// All income of the return. Amounts are non-negative unless the field is
/// explicitly signed (rental net, K-1 lines).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Income {
    #[serde(default)]
    pub w2_forms: Vec<W2Info>,
    #[serde(default)]
    pub schedule_k1_forms: Vec<ScheduleK1>,
    #[serde(default)]
    pub interest_income: Money,
    #[serde(default)]
    pub dividend_income: Money,
    #[serde(default)]
    pub qualified_dividends: Money,
    #[serde(default)]
    pub short_term_capital_gains: Money,
    #[serde(default)]
    pub long_term_capital_gains: Money,
    #[serde(default)]
    pub self_employment_income: Money,
    #[serde(default)]
    pub rental: RentalIncome,
    #[serde(default)]
    pub retirement_income: Money,
    #[serde(default)]
    pub social_security_benefits: Money,
    #[serde(default)]
    pub unemployment_compensation: Money,
    #[serde(default)]
    pub other_income: Money,

    /// AMT preference sources, present when the return carries Form 6251
    /// inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amt_preferences: Option<AmtPreferences>,
    /// Passive activities, present when the return carries Form 8582
    /// inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passive_activities: Vec<PassiveActivity>,
}

impl Income {
    pub fn total_wages(&self) -> Money {
        self.w2_forms.iter().map(|w| w.wages).sum()
    }

    pub fn total_withholding(&self) -> Money {
        self.w2_forms.iter().map(|w| w.federal_tax_withheld).sum()
    }

    pub fn total_k1_ordinary(&self) -> Money {
        self.schedule_k1_forms
            .iter()
            .map(|k| k.ordinary_business_income + k.guaranteed_payments)
            .sum()
    }

    pub fn total_capital_gains(&self) -> Money {
        self.short_term_capital_gains
            + self.long_term_capital_gains
            + self
                .schedule_k1_forms
                .iter()
                .map(|k| k.net_long_term_capital_gain)
                .sum()
    }

    /// Combined self-employment earnings subject to SE tax.
    pub fn se_earnings(&self) -> Money {
        self.self_employment_income
            + self
                .schedule_k1_forms
                .iter()
                .map(|k| k.self_employment_earnings)
                .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_enhanced_beats_simple() {
        let rental = RentalIncome {
            gross_income: Money::from_dollars(30_000),
            expenses: Money::from_dollars(8_000),
            depreciation: Money::from_dollars(7_000),
            mortgage_interest: Money::from_dollars(5_000),
            property_taxes: Money::from_dollars(3_000),
            simple_net: Money::from_dollars(999),
        };
        assert_eq!(rental.net(), Money::from_dollars(7_000));
    }

    #[test]
    fn rental_simple_fallback() {
        let rental = RentalIncome {
            simple_net: Money::from_dollars(-4_500),
            ..Default::default()
        };
        assert_eq!(rental.net(), Money::from_dollars(-4_500));
    }

    #[test]
    fn aggregates_sum_over_lists() {
        let income = Income {
            w2_forms: vec![
                W2Info::new("A", Money::from_dollars(50_000)),
                W2Info::new("B", Money::from_dollars(20_000)),
            ],
            ..Default::default()
        };
        assert_eq!(income.total_wages(), Money::from_dollars(70_000));
    }
}
