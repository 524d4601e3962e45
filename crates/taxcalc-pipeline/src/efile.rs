//! E-file schedule presence rules.
//!
//! The core exposes only the structured payload: which schedules attach
//! to a finalized return. Serialization to MeF XML happens outside.

use serde::{Deserialize, Serialize};

use taxcalc_core::Money;

use crate::engine::CalculationBreakdown;

/// Supported e-file schema version.
pub const EFILE_SCHEMA_VERSION: &str = "2025v1.0";

/// Which forms and schedules the e-file payload must include.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePresence {
    pub schema_version: String,
    pub schedule_1: bool,
    pub schedule_2: bool,
    pub schedule_a: bool,
    pub schedule_b: bool,
    pub schedule_c: bool,
    pub schedule_e: bool,
    pub schedule_se: bool,
    pub form_6251: bool,
    pub form_8582: bool,
    pub form_1116: bool,
    pub form_8863: bool,
    pub form_5329: bool,
}

/// Derive presence from a finalized breakdown.
pub fn schedule_presence(
    breakdown: &CalculationBreakdown,
    interest_income: Money,
    dividend_income: Money,
) -> SchedulePresence {
    let has_se_income = breakdown.se_tax.is_positive();
    SchedulePresence {
        schema_version: EFILE_SCHEMA_VERSION.to_string(),
        schedule_1: breakdown.schedule_1.is_required(),
        schedule_2: has_se_income || breakdown.amt.is_positive(),
        schedule_a: breakdown.used_itemized,
        // Schedule B when interest or dividends exceed $1,500.
        schedule_b: interest_income > Money::from_dollars(1_500)
            || dividend_income > Money::from_dollars(1_500),
        schedule_c: !breakdown.schedule_1.part_1.business_income.is_zero(),
        schedule_e: !breakdown.schedule_1.part_1.schedule_e_income.is_zero(),
        schedule_se: has_se_income,
        form_6251: breakdown.amt.is_positive(),
        form_8582: breakdown.form_8582.is_some(),
        form_1116: breakdown.form_1116.is_some(),
        form_8863: breakdown.form_8863.is_some(),
        form_5329: breakdown
            .form_5329
            .as_ref()
            .map(|r| r.total_additional_tax.is_positive())
            .unwrap_or(false),
    }
}
