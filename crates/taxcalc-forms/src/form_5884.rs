//! Form 5884 - Work Opportunity Credit.
//!
//! Per employee: under 120 hours no credit, 120-399 hours 25%, 400+
//! hours 40%, applied to first-year wages capped by target group.
//! Long-term family assistance has a two-year structure: 40% of up to
//! $10,000 in year one, 50% in year two. Form 8850 certification is
//! required for any credit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{Money, WotcEmployee, WotcTargetGroup};

/// First-year wage limit for a target group.
pub fn wage_limit(group: WotcTargetGroup) -> Money {
    Money::from_dollars(match group {
        WotcTargetGroup::SummerYouth => 3_000,
        WotcTargetGroup::VeteranDisabled => 12_000,
        WotcTargetGroup::VeteranDisabledUnemployed => 24_000,
        WotcTargetGroup::LongTermFamilyAssistance => 10_000,
        _ => 6_000,
    })
}

/// Credit rate from hours worked.
pub fn credit_rate(hours_worked: u32) -> Decimal {
    if hours_worked < 120 {
        dec!(0)
    } else if hours_worked < 400 {
        dec!(0.25)
    } else {
        dec!(0.40)
    }
}

/// Credit for one employee.
pub fn employee_credit(employee: &WotcEmployee) -> Money {
    if !employee.has_certification {
        return Money::ZERO;
    }
    let rate = credit_rate(employee.hours_worked);
    if rate.is_zero() {
        return Money::ZERO;
    }

    if employee.target_group == WotcTargetGroup::LongTermFamilyAssistance
        && employee.is_second_year
    {
        // Year two: 50% of up to $10,000 of second-year wages.
        let capped = employee
            .second_year_wages
            .min(wage_limit(employee.target_group));
        return capped.mul_rate(dec!(0.50)).round_to_cents();
    }

    let capped = employee
        .first_year_wages
        .min(wage_limit(employee.target_group));
    capped.mul_rate(rate).round_to_cents()
}

/// Aggregate Form 5884 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form5884Result {
    pub total_credit: Money,
    pub by_target_group: BTreeMap<String, Money>,
    /// (employee name, credit), in input order.
    pub per_employee: Vec<(String, Money)>,
}

/// Compute the aggregate credit over all employees.
pub fn compute(employees: &[WotcEmployee]) -> Form5884Result {
    let mut by_target_group: BTreeMap<String, Money> = BTreeMap::new();
    let mut per_employee = Vec::with_capacity(employees.len());
    let mut total = Money::ZERO;

    for employee in employees {
        let credit = employee_credit(employee);
        total += credit;
        per_employee.push((employee.name.clone(), credit));
        if credit.is_positive() {
            let tag = serde_json::to_value(employee.target_group)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default();
            *by_target_group.entry(tag).or_default() += credit;
        }
    }

    Form5884Result {
        total_credit: total,
        by_target_group,
        per_employee,
    }
}
