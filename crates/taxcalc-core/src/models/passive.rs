//! Passive activity records (Form 8582 inputs).

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Kind of activity for Section 469 classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    RentalRealEstate,
    TradeOrBusiness,
    /// Publicly traded partnership: losses only offset income from the
    /// same PTP.
    PubliclyTradedPartnership,
    /// Working interests in oil and gas are never passive.
    OilGasWorkingInterest,
}

/// Disposition state at year end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionState {
    #[default]
    Held,
    /// Complete taxable disposition releases the activity's suspended
    /// losses in the year of disposition.
    FullyDisposed,
    PartiallyDisposed,
}

/// A single activity evaluated by the passive-loss rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassiveActivity {
    pub activity_id: String,
    pub name: String,
    pub activity_type: ActivityType,
    pub gross_income: Money,
    pub deductions: Money,
    /// Suspended loss carried in from prior years (positive amount).
    #[serde(default)]
    pub prior_year_unallowed_loss: Money,
    #[serde(default)]
    pub taxpayer_hours: u32,
    #[serde(default)]
    pub spouse_hours: u32,
    /// Hours of all participants including non-owners.
    #[serde(default)]
    pub total_participation_hours: u32,
    /// Largest participation by any other individual.
    #[serde(default)]
    pub max_other_individual_hours: u32,
    #[serde(default)]
    pub is_active_participant: bool,
    /// Pre-determined material participation (tests 4-7 witness), when the
    /// hour-based tests cannot decide.
    #[serde(default)]
    pub material_participation_override: Option<bool>,
    #[serde(default)]
    pub disposition: DispositionState,
}

impl PassiveActivity {
    pub fn new(
        activity_id: impl Into<String>,
        name: impl Into<String>,
        activity_type: ActivityType,
    ) -> Self {
        Self {
            activity_id: activity_id.into(),
            name: name.into(),
            activity_type,
            gross_income: Money::ZERO,
            deductions: Money::ZERO,
            prior_year_unallowed_loss: Money::ZERO,
            taxpayer_hours: 0,
            spouse_hours: 0,
            total_participation_hours: 0,
            max_other_individual_hours: 0,
            is_active_participant: false,
            material_participation_override: None,
            disposition: DispositionState::Held,
        }
    }

    /// Current-year net income (positive) or loss (negative), before any
    /// suspended carryover.
    pub fn net_income(&self) -> Money {
        self.gross_income - self.deductions
    }

    pub fn combined_owner_hours(&self) -> u32 {
        self.taxpayer_hours + self.spouse_hours
    }

    pub fn is_rental(&self) -> bool {
        matches!(self.activity_type, ActivityType::RentalRealEstate)
    }

    pub fn is_ptp(&self) -> bool {
        matches!(self.activity_type, ActivityType::PubliclyTradedPartnership)
    }
}

/// Real-estate-professional status inputs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RealEstateProfessional {
    pub real_property_hours: u32,
    pub total_work_hours: u32,
}

impl RealEstateProfessional {
    /// >= 750 real-property hours AND more than half of all work hours.
    pub fn qualifies(&self) -> bool {
        self.real_property_hours >= 750
            && self.total_work_hours > 0
            && 2 * self.real_property_hours > self.total_work_hours
    }
}
