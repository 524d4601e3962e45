//! Form 8582 - Passive Activity Loss Limitations.
//!
//! Activities are classified passive or non-passive through the material
//! participation tests, then passive losses are netted against passive
//! income by basket. Active-participation rental real estate gets the
//! $25,000 special allowance with its MAGI phaseout; publicly traded
//! partnerships net only against themselves. Excess losses suspend per
//! activity and release on complete taxable disposition.

use std::collections::BTreeMap;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{
    ActivityType, DispositionState, FilingStatus, Money, PassiveActivity,
    RealEstateProfessional, YearTable,
};

/// Which material participation test was satisfied (the witness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialParticipationTest {
    /// Test 1: at least 500 combined taxpayer+spouse hours.
    Hours500,
    /// Test 2: participation is substantially all participation in the
    /// activity.
    SubstantiallyAll,
    /// Test 3: at least 100 hours and not less than any other individual.
    Hours100NotLess,
    /// Tests 4-7: facts-and-circumstances determination supplied by the
    /// caller.
    FactsAndCircumstances,
}

/// Classification outcome for one activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityClassification {
    pub activity_id: String,
    pub is_passive: bool,
    pub materially_participates: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_satisfied: Option<MaterialParticipationTest>,
    pub reason: String,
}

/// Evaluate the material participation tests, returning the first
/// satisfied test as witness.
pub fn check_material_participation(
    activity: &PassiveActivity,
) -> (bool, Option<MaterialParticipationTest>) {
    let owner_hours = activity.combined_owner_hours();

    if owner_hours >= 500 {
        return (true, Some(MaterialParticipationTest::Hours500));
    }

    // Substantially all: other participants' hours are negligible
    // (at most 10% of total participation).
    let total = activity.total_participation_hours;
    if total > 0 && owner_hours > 0 {
        let others = total.saturating_sub(owner_hours);
        if others * 10 <= total {
            return (true, Some(MaterialParticipationTest::SubstantiallyAll));
        }
    }

    if owner_hours >= 100 && owner_hours >= activity.max_other_individual_hours {
        return (true, Some(MaterialParticipationTest::Hours100NotLess));
    }

    if activity.material_participation_override == Some(true) {
        return (true, Some(MaterialParticipationTest::FactsAndCircumstances));
    }

    (false, None)
}

/// Classify one activity as passive or not.
pub fn classify_activity(
    activity: &PassiveActivity,
    re_professional: Option<&RealEstateProfessional>,
) -> ActivityClassification {
    let (materially_participates, test_satisfied) = check_material_participation(activity);

    // Working interests in oil and gas are never passive.
    if activity.activity_type == ActivityType::OilGasWorkingInterest {
        return ActivityClassification {
            activity_id: activity.activity_id.clone(),
            is_passive: false,
            materially_participates,
            test_satisfied,
            reason: "oil and gas working interest is never passive".into(),
        };
    }

    if activity.is_rental() {
        // Rentals are passive per se unless a real estate professional
        // materially participates.
        let re_pro = re_professional.is_some_and(|p| p.qualifies());
        if re_pro && materially_participates {
            return ActivityClassification {
                activity_id: activity.activity_id.clone(),
                is_passive: false,
                materially_participates,
                test_satisfied,
                reason: "real estate professional with material participation".into(),
            };
        }
        return ActivityClassification {
            activity_id: activity.activity_id.clone(),
            is_passive: true,
            materially_participates,
            test_satisfied,
            reason: "rental activity".into(),
        };
    }

    ActivityClassification {
        activity_id: activity.activity_id.clone(),
        is_passive: !materially_participates,
        materially_participates,
        test_satisfied,
        reason: if materially_participates {
            "material participation".into()
        } else {
            "no material participation".into()
        },
    }
}

/// MAGI phaseout of the rental real estate special allowance.
pub fn rental_allowance(
    filing_status: FilingStatus,
    magi: Money,
    mfs_living_apart: bool,
    table: &YearTable,
) -> Money {
    if filing_status.is_married_separate() && !mfs_living_apart {
        return Money::ZERO;
    }
    let (max_allowance, start) = if filing_status.is_married_separate() {
        (
            Money::new(table.rental_allowance_max).mul_rate(dec!(0.5)),
            Money::new(table.rental_allowance_magi_start_mfs_apart),
        )
    } else {
        (
            Money::new(table.rental_allowance_max),
            Money::new(table.rental_allowance_magi_start),
        )
    };
    let reduction = magi.saturating_sub(start).mul_rate(dec!(0.5));
    max_allowance.saturating_sub(reduction)
}

/// Inputs to the passive-loss computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8582Input {
    pub filing_status: FilingStatus,
    /// Modified AGI for the special-allowance phaseout.
    pub magi: Money,
    pub activities: Vec<PassiveActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_professional: Option<RealEstateProfessional>,
    #[serde(default)]
    pub mfs_living_apart: bool,
}

/// Complete Form 8582 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8582Result {
    pub classifications: Vec<ActivityClassification>,
    /// Net income of passive activities (both baskets).
    pub passive_income: Money,
    /// Total passive losses including prior-year suspended amounts.
    pub passive_losses: Money,
    pub rental_allowance_available: Money,
    pub rental_allowance_used: Money,
    /// Losses deductible this year (netting + allowance + dispositions +
    /// non-passive losses).
    pub allowed_loss: Money,
    /// Suspended loss carried to next year, per activity id.
    pub suspended_by_activity: BTreeMap<String, Money>,
    /// Suspended losses released by complete disposition.
    pub released_by_disposition: Money,
    /// PTP losses suspended per activity (same-PTP-only netting).
    pub ptp_suspended: BTreeMap<String, Money>,
}

impl Form8582Result {
    pub fn total_suspended(&self) -> Money {
        self.suspended_by_activity.values().copied().sum::<Money>()
            + self.ptp_suspended.values().copied().sum::<Money>()
    }
}

/// Compute Form 8582.
pub fn compute(input: &Form8582Input, table: &YearTable) -> Form8582Result {
    let classifications: Vec<ActivityClassification> = input
        .activities
        .iter()
        .map(|a| classify_activity(a, input.re_professional.as_ref()))
        .collect();

    let mut passive_income = Money::ZERO;
    let mut released_by_disposition = Money::ZERO;
    let mut allowed_loss = Money::ZERO;
    // Loss-bearing passive activities still held: (id, loss, eligible for
    // the rental allowance).
    let mut loss_activities: Vec<(String, Money, bool)> = Vec::new();
    let mut ptp_suspended = BTreeMap::new();

    for (activity, class) in input.activities.iter().zip(&classifications) {
        let current = activity.net_income();
        let suspended_in = activity.prior_year_unallowed_loss;

        if !class.is_passive {
            // Non-passive: fully usable, including any suspended loss the
            // activity brought in from passive years.
            if current.is_negative() {
                allowed_loss += current.abs();
            }
            allowed_loss += suspended_in;
            continue;
        }

        if activity.disposition == DispositionState::FullyDisposed {
            // Complete taxable disposition releases everything.
            released_by_disposition += suspended_in;
            allowed_loss += suspended_in;
            if current.is_negative() {
                allowed_loss += current.abs();
            } else {
                passive_income += current;
            }
            continue;
        }

        if activity.is_ptp() {
            // Same-PTP netting only.
            let net = current - suspended_in;
            if net.is_negative() {
                ptp_suspended.insert(activity.activity_id.clone(), net.abs());
            } else if net.is_positive() {
                passive_income += net;
            }
            continue;
        }

        let total_loss = if current.is_negative() {
            current.abs() + suspended_in
        } else {
            passive_income += current;
            suspended_in
        };
        if total_loss.is_positive() {
            let allowance_eligible = activity.is_rental() && activity.is_active_participant;
            loss_activities.push((activity.activity_id.clone(), total_loss, allowance_eligible));
        }
    }

    let passive_losses: Money = loss_activities.iter().map(|(_, l, _)| *l).sum();

    // Part III: income absorbs losses first.
    let absorbed_by_income = passive_income.min(passive_losses);
    let unabsorbed = passive_losses - absorbed_by_income;

    // Part II: the special allowance only covers eligible rental losses
    // that income did not absorb.
    let allowance_available = rental_allowance(
        input.filing_status,
        input.magi,
        input.mfs_living_apart,
        table,
    );
    let eligible_rental_loss: Money = loss_activities
        .iter()
        .filter(|(_, _, eligible)| *eligible)
        .map(|(_, l, _)| *l)
        .sum();
    let rental_allowance_used = allowance_available
        .min(eligible_rental_loss.min(unabsorbed));

    allowed_loss += absorbed_by_income + rental_allowance_used;

    // Suspend the remainder pro rata across loss activities.
    let to_suspend = unabsorbed - rental_allowance_used;
    let mut suspended_by_activity = BTreeMap::new();
    if to_suspend.is_positive() && passive_losses.is_positive() {
        let mut allocated = Money::ZERO;
        let last = loss_activities.len().saturating_sub(1);
        for (i, (id, loss, _)) in loss_activities.iter().enumerate() {
            let share = if i == last {
                to_suspend - allocated
            } else {
                let ratio = loss.as_decimal() / passive_losses.as_decimal();
                to_suspend.mul_rate(ratio).round_to_cents()
            };
            allocated += share;
            if share.is_positive() {
                suspended_by_activity.insert(id.clone(), share);
            }
        }
    }

    tracing::debug!(
        passive_income = %passive_income,
        passive_losses = %passive_losses,
        allowance_used = %rental_allowance_used,
        suspended = %to_suspend,
        "form 8582 computed"
    );

    Form8582Result {
        classifications,
        passive_income,
        passive_losses,
        rental_allowance_available: allowance_available,
        rental_allowance_used,
        allowed_loss,
        suspended_by_activity,
        released_by_disposition,
        ptp_suspended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> YearTable {
        YearTable::year_2025()
    }

    fn rental(id: &str, net: i64) -> PassiveActivity {
        let mut a = PassiveActivity::new(id, id, ActivityType::RentalRealEstate);
        if net >= 0 {
            a.gross_income = Money::from_dollars(net);
        } else {
            a.deductions = Money::from_dollars(-net);
        }
        a.is_active_participant = true;
        a
    }

    #[test]
    fn test_500_hours_is_material() {
        let mut a = PassiveActivity::new("a", "biz", ActivityType::TradeOrBusiness);
        a.taxpayer_hours = 300;
        a.spouse_hours = 250;
        let (ok, test) = check_material_participation(&a);
        assert!(ok);
        assert_eq!(test, Some(MaterialParticipationTest::Hours500));
    }

    #[test]
    fn substantially_all_test() {
        let mut a = PassiveActivity::new("a", "biz", ActivityType::TradeOrBusiness);
        a.taxpayer_hours = 95;
        a.total_participation_hours = 100;
        let (ok, test) = check_material_participation(&a);
        assert!(ok);
        assert_eq!(test, Some(MaterialParticipationTest::SubstantiallyAll));
    }

    #[test]
    fn hundred_hours_not_less_than_others() {
        let mut a = PassiveActivity::new("a", "biz", ActivityType::TradeOrBusiness);
        a.taxpayer_hours = 120;
        a.total_participation_hours = 400;
        a.max_other_individual_hours = 110;
        let (ok, test) = check_material_participation(&a);
        assert!(ok);
        assert_eq!(test, Some(MaterialParticipationTest::Hours100NotLess));

        a.max_other_individual_hours = 150;
        let (ok, _) = check_material_participation(&a);
        assert!(!ok);
    }

    #[test]
    fn participation_stable_under_spouse_swap() {
        let mut a = PassiveActivity::new("a", "biz", ActivityType::TradeOrBusiness);
        a.taxpayer_hours = 400;
        a.spouse_hours = 150;
        let r1 = check_material_participation(&a);
        a.taxpayer_hours = 150;
        a.spouse_hours = 400;
        let r2 = check_material_participation(&a);
        assert_eq!(r1, r2);
    }

    #[test]
    fn oil_gas_never_passive() {
        let a = PassiveActivity::new("og", "well", ActivityType::OilGasWorkingInterest);
        let class = classify_activity(&a, None);
        assert!(!class.is_passive);
    }

    #[test]
    fn re_professional_unpassivates_rental() {
        let mut a = rental("r1", -10_000);
        a.taxpayer_hours = 600;
        let pro = RealEstateProfessional {
            real_property_hours: 800,
            total_work_hours: 1_200,
        };
        let class = classify_activity(&a, Some(&pro));
        assert!(!class.is_passive);

        // Without material participation the rental stays passive.
        let b = rental("r2", -10_000);
        let class2 = classify_activity(&b, Some(&pro));
        assert!(class2.is_passive);
    }

    #[test]
    fn allowance_phaseout_at_120k_magi() {
        // Spec scenario: MAGI 120k, 25k eligible loss, active participant.
        let input = Form8582Input {
            filing_status: FilingStatus::Single,
            magi: Money::from_dollars(120_000),
            activities: vec![rental("r1", -25_000)],
            re_professional: None,
            mfs_living_apart: false,
        };
        let result = compute(&input, &table());
        assert_eq!(
            result.rental_allowance_available,
            Money::from_dollars(15_000)
        );
        assert_eq!(result.rental_allowance_used, Money::from_dollars(15_000));
        assert_eq!(result.allowed_loss, Money::from_dollars(15_000));
        assert_eq!(
            result.suspended_by_activity.get("r1"),
            Some(&Money::from_dollars(10_000))
        );
    }

    #[test]
    fn allowance_zero_at_150k_magi() {
        let allowance = rental_allowance(
            FilingStatus::Single,
            Money::from_dollars(150_000),
            false,
            &table(),
        );
        assert_eq!(allowance, Money::ZERO);
    }

    #[test]
    fn mfs_together_gets_no_allowance() {
        let allowance = rental_allowance(
            FilingStatus::MarriedSeparate,
            Money::from_dollars(40_000),
            false,
            &table(),
        );
        assert_eq!(allowance, Money::ZERO);
    }

    #[test]
    fn mfs_apart_capped_at_12500() {
        let allowance = rental_allowance(
            FilingStatus::MarriedSeparate,
            Money::from_dollars(40_000),
            true,
            &table(),
        );
        assert_eq!(allowance, Money::from_dollars(12_500));
    }

    #[test]
    fn passive_income_absorbs_losses_across_baskets() {
        let mut biz = PassiveActivity::new("b1", "LP interest", ActivityType::TradeOrBusiness);
        biz.gross_income = Money::from_dollars(8_000);
        let input = Form8582Input {
            filing_status: FilingStatus::Single,
            magi: Money::from_dollars(200_000), // allowance fully phased out
            activities: vec![rental("r1", -20_000), biz],
            re_professional: None,
            mfs_living_apart: false,
        };
        let result = compute(&input, &table());
        assert_eq!(result.passive_income, Money::from_dollars(8_000));
        assert_eq!(result.allowed_loss, Money::from_dollars(8_000));
        assert_eq!(result.total_suspended(), Money::from_dollars(12_000));
    }

    #[test]
    fn disposition_releases_suspended_losses() {
        let mut a = rental("r1", -5_000);
        a.prior_year_unallowed_loss = Money::from_dollars(18_000);
        a.disposition = DispositionState::FullyDisposed;
        let input = Form8582Input {
            filing_status: FilingStatus::Single,
            magi: Money::from_dollars(500_000),
            activities: vec![a],
            re_professional: None,
            mfs_living_apart: false,
        };
        let result = compute(&input, &table());
        assert_eq!(result.released_by_disposition, Money::from_dollars(18_000));
        assert_eq!(result.allowed_loss, Money::from_dollars(23_000));
        assert!(result.suspended_by_activity.is_empty());
    }

    #[test]
    fn ptp_losses_only_offset_same_ptp() {
        let mut ptp = PassiveActivity::new("p1", "MLP", ActivityType::PubliclyTradedPartnership);
        ptp.deductions = Money::from_dollars(6_000);
        let mut other = PassiveActivity::new("b1", "LP", ActivityType::TradeOrBusiness);
        other.gross_income = Money::from_dollars(10_000);
        let input = Form8582Input {
            filing_status: FilingStatus::Single,
            magi: Money::from_dollars(200_000),
            activities: vec![ptp, other],
            re_professional: None,
            mfs_living_apart: false,
        };
        let result = compute(&input, &table());
        // The PTP loss cannot absorb the other activity's income.
        assert_eq!(result.ptp_suspended.get("p1"), Some(&Money::from_dollars(6_000)));
        assert_eq!(result.allowed_loss, Money::ZERO);
    }

    #[test]
    fn prior_suspended_losses_stack_with_current() {
        let mut a = rental("r1", -10_000);
        a.prior_year_unallowed_loss = Money::from_dollars(5_000);
        let input = Form8582Input {
            filing_status: FilingStatus::Single,
            magi: Money::from_dollars(90_000),
            activities: vec![a],
            re_professional: None,
            mfs_living_apart: false,
        };
        let result = compute(&input, &table());
        assert_eq!(result.passive_losses, Money::from_dollars(15_000));
        // Full allowance available below the phaseout start.
        assert_eq!(result.allowed_loss, Money::from_dollars(15_000));
    }
}
