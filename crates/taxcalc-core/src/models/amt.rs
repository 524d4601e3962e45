//! AMT preference source records (Form 6251 inputs).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A single incentive stock option exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoExercise {
    pub shares: u32,
    pub exercise_price: Money,
    pub fmv_at_exercise: Money,
    /// Disqualifying disposition: sold in the exercise year, so the spread
    /// is ordinary income and contributes nothing to AMTI.
    #[serde(default)]
    pub sold_same_year: bool,
}

impl IsoExercise {
    /// AMT preference: shares x max(0, FMV - strike); zero on a
    /// same-year sale.
    pub fn spread(&self) -> Money {
        if self.sold_same_year {
            return Money::ZERO;
        }
        let per_share = self.fmv_at_exercise.saturating_sub(self.exercise_price);
        per_share.mul_rate(Decimal::from(self.shares))
    }
}

/// Private activity bond interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateActivityBond {
    pub description: String,
    pub interest: Money,
    /// Only post-August-7-1986 issues are an AMT preference.
    #[serde(default)]
    pub issued_after_aug_7_1986: bool,
}

impl PrivateActivityBond {
    pub fn amt_preference(&self) -> Money {
        if self.issued_after_aug_7_1986 {
            self.interest
        } else {
            Money::ZERO
        }
    }
}

/// Post-1986 depreciation adjustment (MACRS minus ADS). May be negative in
/// later years when ADS exceeds MACRS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationAdjustment {
    pub asset_description: String,
    pub macrs_depreciation: Money,
    pub ads_depreciation: Money,
}

impl DepreciationAdjustment {
    pub fn adjustment(&self) -> Money {
        self.macrs_depreciation - self.ads_depreciation
    }
}

/// Classification of a free-form AMT adjustment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmtAdjustmentType {
    InvestmentInterest,
    AdjustedGainLoss,
    Depletion,
    IntangibleDrilling,
    LongTermContracts,
    MiningCosts,
    ResearchCosts,
    CirculationCosts,
    InstallmentSale,
    TaxShelterFarm,
    Other,
}

impl AmtAdjustmentType {
    /// Deferral items are timing differences that reverse and generate
    /// minimum tax credit; exclusion items are permanent and do not.
    pub fn is_deferral(&self) -> bool {
        !matches!(
            self,
            Self::Depletion | Self::IntangibleDrilling | Self::TaxShelterFarm
        )
    }
}

/// A free-form AMT adjustment with its classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmtAdjustment {
    pub adjustment_type: AmtAdjustmentType,
    pub description: String,
    /// Signed: negative adjustments reduce AMTI.
    pub amount: Money,
}

/// Previous-year AMT decomposed into deferral vs. exclusion components.
/// Only the deferral portion generates minimum tax credit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorYearAmtDetail {
    pub tax_year: u16,
    pub total_amt_paid: Money,
    // Deferral items
    #[serde(default)]
    pub amt_from_iso: Money,
    #[serde(default)]
    pub amt_from_depreciation: Money,
    #[serde(default)]
    pub amt_from_passive_activities: Money,
    #[serde(default)]
    pub amt_from_other_deferral: Money,
    // Exclusion items
    #[serde(default)]
    pub amt_from_pab_interest: Money,
    #[serde(default)]
    pub amt_from_depletion: Money,
    #[serde(default)]
    pub amt_from_other_exclusion: Money,
}

impl PriorYearAmtDetail {
    pub fn deferral_amt(&self) -> Money {
        self.amt_from_iso
            + self.amt_from_depreciation
            + self.amt_from_passive_activities
            + self.amt_from_other_deferral
    }

    pub fn exclusion_amt(&self) -> Money {
        self.amt_from_pab_interest + self.amt_from_depletion + self.amt_from_other_exclusion
    }

    /// MTC generated by that year's AMT: the deferral portion when the
    /// breakdown is known, the full AMT otherwise.
    pub fn mtc_generated(&self) -> Money {
        let deferral = self.deferral_amt();
        let exclusion = self.exclusion_amt();
        if deferral.is_zero() && exclusion.is_zero() {
            self.total_amt_paid
        } else {
            deferral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_spread_basic() {
        let iso = IsoExercise {
            shares: 1000,
            exercise_price: Money::from_dollars(10),
            fmv_at_exercise: Money::from_dollars(60),
            sold_same_year: false,
        };
        assert_eq!(iso.spread(), Money::from_dollars(50_000));
    }

    #[test]
    fn iso_spread_underwater_is_zero() {
        let iso = IsoExercise {
            shares: 1000,
            exercise_price: Money::from_dollars(60),
            fmv_at_exercise: Money::from_dollars(10),
            sold_same_year: false,
        };
        assert_eq!(iso.spread(), Money::ZERO);
    }

    #[test]
    fn same_year_sale_contributes_nothing() {
        let iso = IsoExercise {
            shares: 1000,
            exercise_price: Money::from_dollars(10),
            fmv_at_exercise: Money::from_dollars(60),
            sold_same_year: true,
        };
        assert_eq!(iso.spread(), Money::ZERO);
    }

    #[test]
    fn pab_pre_1986_is_not_a_preference() {
        let pab = PrivateActivityBond {
            description: "muni".into(),
            interest: Money::from_dollars(4_000),
            issued_after_aug_7_1986: false,
        };
        assert_eq!(pab.amt_preference(), Money::ZERO);
    }

    #[test]
    fn depreciation_adjustment_can_go_negative() {
        let adj = DepreciationAdjustment {
            asset_description: "equipment".into(),
            macrs_depreciation: Money::from_dollars(8_000),
            ads_depreciation: Money::from_dollars(11_000),
        };
        assert_eq!(adj.adjustment(), Money::from_dollars(-3_000));
    }

    #[test]
    fn mtc_generated_falls_back_to_total_when_breakdown_unknown() {
        let detail = PriorYearAmtDetail {
            tax_year: 2024,
            total_amt_paid: Money::from_dollars(12_000),
            ..Default::default()
        };
        assert_eq!(detail.mtc_generated(), Money::from_dollars(12_000));

        let detailed = PriorYearAmtDetail {
            tax_year: 2024,
            total_amt_paid: Money::from_dollars(12_000),
            amt_from_iso: Money::from_dollars(9_000),
            amt_from_pab_interest: Money::from_dollars(3_000),
            ..Default::default()
        };
        assert_eq!(detailed.mtc_generated(), Money::from_dollars(9_000));
    }
}
