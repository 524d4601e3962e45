//! End-to-end calculation scenarios through the full pipeline.

use std::sync::Arc;

use taxcalc_core::{
    ActivityType, AmtPreferences, Credits, Deductions, FilingStatus, Income, IsoExercise, Money,
    PassiveActivity, TaxReturn, TaxpayerInfo, W2Info, WotcEmployee, WotcTargetGroup,
};
use taxcalc_forms::form_1116::passive_category;
use taxcalc_forms::form_8863::{EnrollmentStatus, StudentExpenses};
use taxcalc_pipeline::{
    CalculationPipeline, CalculationRequest, ExecuteOptions, FederalTaxEngine, FtcRequest,
    MemoryCache, RuleValidator,
};

fn pipeline() -> CalculationPipeline {
    CalculationPipeline::new(
        Arc::new(RuleValidator::new()),
        FederalTaxEngine::for_year(2025).unwrap(),
        Arc::new(MemoryCache::new()),
    )
}

fn single_with_income(income: Income) -> CalculationRequest {
    CalculationRequest::new(
        TaxReturn::new(
            2025,
            TaxpayerInfo::new("Jordan", "Reyes", "321-54-9876", FilingStatus::Single),
        )
        .with_income(income)
        .with_deductions(Deductions::standard()),
    )
}

#[test]
fn iso_exercise_triggers_amt() {
    let request = single_with_income(Income {
        w2_forms: vec![W2Info::new("Acme", Money::from_dollars(200_000))],
        amt_preferences: Some(AmtPreferences {
            iso_exercises: vec![IsoExercise {
                shares: 2_000,
                exercise_price: Money::from_dollars(5),
                fmv_at_exercise: Money::from_dollars(30),
                sold_same_year: false,
            }],
            ..Default::default()
        }),
        ..Default::default()
    });
    let result = pipeline().execute(&request, &ExecuteOptions::default());
    assert!(result.success);
    let b = result.breakdown.unwrap();
    let amt = b.form_6251.as_ref().unwrap();
    assert_eq!(amt.amti, Money::from_dollars(250_000));
    assert_eq!(amt.exemption, Money::from_dollars(88_100));
    assert_eq!(amt.tentative_minimum_tax, Money::from_dollars(42_094));
    assert!(b.amt.is_positive());
    assert!(b.total_federal_tax > b.regular_tax);
}

#[test]
fn sole_proprietor_se_tax_and_qbi() {
    let request = single_with_income(Income {
        self_employment_income: Money::from_dollars(70_000),
        ..Default::default()
    });
    let result = pipeline().execute(&request, &ExecuteOptions::default());
    let b = result.breakdown.unwrap();
    // SE tax ~= 9,890; deduction half of that.
    assert_eq!(b.se_tax, Money::from_cents(989_069));
    assert_eq!(
        b.schedule_1.part_2.se_tax_deduction,
        Money::from_cents(494_534)
    );
    assert!(b.qbi_deduction.is_positive());
    assert!(b.schedule_1.is_required());
}

#[test]
fn rental_allowance_phases_out_with_magi() {
    let mut rental = PassiveActivity::new("r1", "Fourplex", ActivityType::RentalRealEstate);
    rental.deductions = Money::from_dollars(25_000);
    rental.is_active_participant = true;
    let request = single_with_income(Income {
        w2_forms: vec![W2Info::new("Acme", Money::from_dollars(120_000))],
        passive_activities: vec![rental],
        ..Default::default()
    });
    let result = pipeline().execute(&request, &ExecuteOptions::default());
    let b = result.breakdown.unwrap();
    let pal = b.form_8582.as_ref().unwrap();
    assert_eq!(pal.rental_allowance_available, Money::from_dollars(15_000));
    assert_eq!(pal.rental_allowance_used, Money::from_dollars(15_000));
    assert_eq!(
        b.derived_carryovers.suspended_passive_losses.get("r1"),
        Some(&Money::from_dollars(10_000))
    );
}

#[test]
fn foreign_tax_credit_capped_by_limitation() {
    let mut request = single_with_income(Income {
        w2_forms: vec![W2Info::new("Acme", Money::from_dollars(160_000))],
        ..Default::default()
    });
    request.forms.ftc = Some(FtcRequest {
        categories: vec![passive_category(
            Money::from_dollars(20_000),
            Money::from_dollars(3_000),
            "DE",
            "Germany",
        )],
        use_simplified_method: false,
        foreign_source_amti: Money::ZERO,
    });
    let result = pipeline().execute(&request, &ExecuteOptions::default());
    let b = result.breakdown.unwrap();
    let ftc = b.form_1116.as_ref().unwrap();
    let category = &ftc.categories[0];
    assert_eq!(category.credit_allowed, Money::from_dollars(3_000));
    assert_eq!(category.excess_taxes, Money::ZERO);
    assert!(category.excess_limitation.is_positive());
    // Conservation: taxes paid fully credited, nothing carries forward.
    assert_eq!(b.foreign_tax_credit, Money::from_dollars(3_000));
}

#[test]
fn education_credit_with_phaseout() {
    let mut request = single_with_income(Income {
        w2_forms: vec![W2Info::new("Acme", Money::from_dollars(85_000))],
        ..Default::default()
    });
    request.forms.education_students = vec![StudentExpenses {
        student_name: "Riley".into(),
        enrollment_status: EnrollmentStatus::FullTime,
        is_pursuing_degree: true,
        is_first_four_years: true,
        years_aotc_previously_claimed: 0,
        has_felony_drug_conviction: false,
        has_form_1098t: true,
        tuition_and_fees: Money::from_dollars(4_500),
        books_supplies_equipment: Money::ZERO,
        tax_free_assistance: Money::ZERO,
    }];
    let result = pipeline().execute(&request, &ExecuteOptions::default());
    let b = result.breakdown.unwrap();
    assert_eq!(b.education_refundable, Money::from_dollars(500));
    assert_eq!(b.education_nonrefundable, Money::from_dollars(750));
}

#[test]
fn wotc_flows_from_employee_list() {
    let mut request = single_with_income(Income {
        self_employment_income: Money::from_dollars(150_000),
        ..Default::default()
    });
    request.tax_return.credits = Credits {
        wotc_employees: vec![WotcEmployee {
            name: "New hire".into(),
            target_group: WotcTargetGroup::SnapRecipient,
            first_year_wages: Money::from_dollars(6_000),
            hours_worked: 400,
            has_certification: true,
            second_year_wages: Money::ZERO,
            is_second_year: false,
        }],
        ..Default::default()
    };
    let result = pipeline().execute(&request, &ExecuteOptions::default());
    let b = result.breakdown.unwrap();
    assert_eq!(b.wotc_credit, Money::from_dollars(2_400));
}

#[test]
fn cache_round_trip_preserves_breakdown() {
    let p = pipeline();
    let request = single_with_income(Income {
        w2_forms: vec![W2Info::new("Acme", Money::from_dollars(140_000))],
        interest_income: Money::from_dollars(2_200),
        dividend_income: Money::from_dollars(3_500),
        qualified_dividends: Money::from_dollars(3_000),
        long_term_capital_gains: Money::from_dollars(12_000),
        ..Default::default()
    });
    let fresh = p.execute(&request, &ExecuteOptions::default());
    let cached = p.execute(&request, &ExecuteOptions::default());
    assert!(!fresh.cache_hit);
    assert!(cached.cache_hit);
    assert_eq!(
        serde_json::to_string(&fresh.breakdown.unwrap()).unwrap(),
        serde_json::to_string(&cached.breakdown.unwrap()).unwrap()
    );
}
