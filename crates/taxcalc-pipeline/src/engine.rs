//! The federal tax engine.
//!
//! Drives the form components in dependency order: Schedule 1 feeds AGI;
//! passive-loss limits run before AGI-dependent items; itemized
//! deductions and regular tax precede AMT; MTC follows AMT; the FTC
//! limitation follows total tax before credits. The engine is a pure
//! function of the request and never mutates the submitted return.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{
    CarryoverRecord, FilingStatus, Money, PriorYearAmtDetail, PriorYearCarryovers,
    RealEstateProfessional, TaxResult, TaxReturn, YearTable,
};
use taxcalc_forms::form_1116::{self, FtcCategory};
use taxcalc_forms::form_5329::{self, Form5329Input};
use taxcalc_forms::form_5471::{self, Form5471Input};
use taxcalc_forms::form_5884;
use taxcalc_forms::form_6251::{self, Form6251Input, ItemizedAddbacks};
use taxcalc_forms::form_8582::{self, Form8582Input};
use taxcalc_forms::form_8606::{self, Form8606Input};
use taxcalc_forms::form_8801::{self, ExclusionAdjustments, Form8801Input};
use taxcalc_forms::form_8814::{self, ChildIncome};
use taxcalc_forms::form_8863::{self, StudentExpenses};
use taxcalc_forms::form_982::{self, Form982Input};
use taxcalc_forms::schedule_1::{Schedule1, Schedule1Part1, Schedule1Part2};

/// Foreign-tax-credit inputs attached to a request. The engine supplies
/// taxable income and tax figures when invoking Form 1116.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FtcRequest {
    pub categories: Vec<FtcCategory>,
    #[serde(default)]
    pub use_simplified_method: bool,
    /// Foreign-source AMTI for the AMT FTC variant.
    #[serde(default)]
    pub foreign_source_amti: Money,
}

/// Prior-year AMT inputs for the minimum tax credit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MtcRequest {
    #[serde(default)]
    pub prior_year_amti: Money,
    #[serde(default)]
    pub exclusion_adjustments: ExclusionAdjustments,
    #[serde(default)]
    pub details: Vec<PriorYearAmtDetail>,
}

/// Optional per-form inputs carried alongside the return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachedForms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftc: Option<FtcRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtc: Option<MtcRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education_students: Vec<StudentExpenses>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_taxes: Option<Form5329Input>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ira_basis: Option<Form8606Input>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_income: Vec<ChildIncome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cod_income: Option<Form982Input>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_corporations: Vec<Form5471Input>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_professional: Option<RealEstateProfessional>,
    #[serde(default)]
    pub mfs_living_apart: bool,
}

/// A full calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub tax_return: TaxReturn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_year_carryovers: Option<PriorYearCarryovers>,
    #[serde(default)]
    pub forms: AttachedForms,
}

impl CalculationRequest {
    pub fn new(tax_return: TaxReturn) -> Self {
        Self {
            tax_return,
            prior_year_carryovers: None,
            forms: AttachedForms::default(),
        }
    }
}

/// Carryover state derived by the computation, returned alongside the
/// breakdown for next year's request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivedCarryovers {
    pub suspended_passive_losses: std::collections::BTreeMap<String, Money>,
    pub ftc_carryovers: std::collections::BTreeMap<String, Vec<CarryoverRecord>>,
    pub mtc_carryforwards: Vec<CarryoverRecord>,
    pub ira_remaining_basis: Money,
}

/// The complete calculation breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationBreakdown {
    pub tax_year: u16,
    pub filing_status: FilingStatus,

    // Income aggregation
    pub total_income: Money,
    pub schedule_1: Schedule1,
    pub adjustments_to_income: Money,
    pub agi: Money,
    pub taxable_social_security: Money,

    // Deductions
    pub used_itemized: bool,
    pub deduction_taken: Money,
    pub qbi_deduction: Money,
    pub taxable_income: Money,

    // Tax
    pub preferential_income: Money,
    pub regular_tax: Money,
    pub se_tax: Money,
    pub additional_plan_taxes: Money,
    pub child_election_tax: Money,
    pub amt: Money,
    pub total_tax_before_credits: Money,

    // Credits
    pub foreign_tax_credit: Money,
    pub minimum_tax_credit: Money,
    pub education_nonrefundable: Money,
    pub education_refundable: Money,
    pub wotc_credit: Money,
    pub other_nonrefundable_credits: Money,
    pub total_federal_tax: Money,

    // Payments
    pub withholding: Money,
    pub balance_due: Money,

    pub effective_rate: rust_decimal::Decimal,

    // Form results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_6251: Option<form_6251::Form6251Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_8582: Option<form_8582::Form8582Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_1116: Option<form_1116::Form1116Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_8801: Option<form_8801::Form8801Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_8863: Option<form_8863::Form8863Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_5329: Option<form_5329::Form5329Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_8606: Option<form_8606::Form8606Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_8814: Option<form_8814::Form8814Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_982: Option<form_982::Form982Result>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form_5471: Vec<form_5471::Form5471Result>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_5884: Option<form_5884::Form5884Result>,

    pub derived_carryovers: DerivedCarryovers,
}

/// The federal engine. Stateless; all year-sensitive constants come from
/// the injected table.
pub struct FederalTaxEngine {
    table: YearTable,
}

impl FederalTaxEngine {
    pub fn new(table: YearTable) -> Self {
        Self { table }
    }

    pub fn for_year(tax_year: u16) -> TaxResult<Self> {
        Ok(Self::new(YearTable::for_year(tax_year)?))
    }

    /// Self-employment tax with the Social Security wage-base cap.
    fn se_tax(&self, se_earnings: Money) -> Money {
        let base = se_earnings.mul_rate(self.table.se_net_earnings_factor);
        if !base.is_positive() {
            return Money::ZERO;
        }
        let oasdi = base
            .min(Money::new(self.table.ss_wage_base))
            .mul_rate(self.table.oasdi_rate);
        let medicare = base.mul_rate(self.table.medicare_rate);
        oasdi + medicare
    }

    /// Taxable Social Security under the provisional-income worksheet.
    fn taxable_social_security(
        &self,
        status: FilingStatus,
        benefits: Money,
        other_income: Money,
    ) -> Money {
        if benefits.is_zero() {
            return Money::ZERO;
        }
        let (base_threshold, upper_threshold) = match status {
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => {
                (Money::from_dollars(32_000), Money::from_dollars(44_000))
            }
            FilingStatus::MarriedSeparate => (Money::ZERO, Money::ZERO),
            _ => (Money::from_dollars(25_000), Money::from_dollars(34_000)),
        };
        let provisional = other_income + benefits.mul_rate(dec!(0.5));
        if provisional <= base_threshold {
            return Money::ZERO;
        }
        let tier1 = (provisional - base_threshold)
            .min(upper_threshold - base_threshold)
            .mul_rate(dec!(0.5));
        let tier2 = provisional
            .saturating_sub(upper_threshold)
            .mul_rate(dec!(0.85));
        (tier1 + tier2).min(benefits.mul_rate(dec!(0.85)))
    }

    /// Run the full computation.
    pub fn calculate(&self, request: &CalculationRequest) -> TaxResult<CalculationBreakdown> {
        let ret = &request.tax_return;
        let status = ret.taxpayer.filing_status;
        let income = &ret.income;
        let carryovers = request.prior_year_carryovers.clone().unwrap_or_default();
        let mut derived = DerivedCarryovers::default();

        // COD income exclusion runs before income aggregation: only the
        // taxable remainder lands on Schedule 1.
        let form_982_result = request
            .forms
            .cod_income
            .as_ref()
            .map(form_982::compute)
            .transpose()?;
        let taxable_cod = form_982_result
            .as_ref()
            .map(|r| r.taxable_cod_income)
            .unwrap_or(Money::ZERO);

        // CFC inclusions feed Schedule 1 lines 8m/8n.
        let form_5471_results: Vec<form_5471::Form5471Result> = request
            .forms
            .foreign_corporations
            .iter()
            .map(form_5471::compute)
            .collect();
        let subpart_f_total: Money = form_5471_results
            .iter()
            .map(|r| r.subpart_f_inclusion)
            .sum();
        let gilti_total: Money = form_5471_results.iter().map(|r| r.gilti_inclusion).sum();

        // Child interest/dividend election.
        let form_8814_result = if request.forms.child_income.is_empty() {
            None
        } else {
            Some(form_8814::compute(&request.forms.child_income, &self.table))
        };
        let child_income_addition = form_8814_result
            .as_ref()
            .map(|r| r.total_to_include)
            .unwrap_or(Money::ZERO);
        let child_election_tax = form_8814_result
            .as_ref()
            .map(|r| r.total_child_tax)
            .unwrap_or(Money::ZERO);

        // Passive activity loss limitation before AGI-dependent items.
        // MAGI for the special allowance approximates AGI before passive
        // results; one pass suffices because suspended losses do not
        // reopen the allowance MAGI.
        let wages = income.total_wages();
        let se_earnings = income.se_earnings();
        let se_tax = self.se_tax(se_earnings);
        let se_deduction = se_tax.mul_rate(dec!(0.5));

        let magi_for_pal = wages
            + income.interest_income
            + income.dividend_income
            + income.total_capital_gains()
            + income.self_employment_income
            + income.retirement_income
            + child_income_addition
            - se_deduction;

        let mut activities = income.passive_activities.clone();
        for activity in &mut activities {
            if let Some(suspended) = carryovers.suspended_passive_losses.get(&activity.activity_id)
            {
                activity.prior_year_unallowed_loss += *suspended;
            }
        }
        let form_8582_result = if activities.is_empty() {
            None
        } else {
            let result = form_8582::compute(
                &Form8582Input {
                    filing_status: status,
                    magi: magi_for_pal,
                    activities,
                    re_professional: request.forms.re_professional,
                    mfs_living_apart: request.forms.mfs_living_apart,
                },
                &self.table,
            );
            derived.suspended_passive_losses = result.suspended_by_activity.clone();
            for (id, amount) in &result.ptp_suspended {
                derived
                    .suspended_passive_losses
                    .insert(id.clone(), *amount);
            }
            Some(result)
        };
        let passive_net: Money = form_8582_result
            .as_ref()
            .map(|r| r.passive_income - r.allowed_loss)
            .unwrap_or(Money::ZERO);

        // Rental outside the passive-activity set.
        let rental_net = if income.passive_activities.is_empty() {
            income.rental.net()
        } else {
            Money::ZERO
        };

        // IRA basis: taxable portion of traditional distributions.
        let form_8606_result = request.forms.ira_basis.as_ref().map(form_8606::compute);
        let ira_taxable = form_8606_result
            .as_ref()
            .map(|r| r.part_i.taxable_amount + r.part_iii.taxable_amount)
            .unwrap_or(income.retirement_income);
        if let Some(r) = &form_8606_result {
            derived.ira_remaining_basis = r.part_i.remaining_basis;
        }

        // Schedule 1.
        let k1_ordinary = income.total_k1_ordinary();
        let schedule_1 = Schedule1 {
            part_1: Schedule1Part1 {
                business_income: income.self_employment_income,
                schedule_e_income: rental_net + passive_net + k1_ordinary,
                unemployment_compensation: income.unemployment_compensation,
                cod_income: taxable_cod,
                section_951a_inclusion: subpart_f_total,
                gilti_inclusion: gilti_total,
                other_income: if income.other_income.is_zero() {
                    Vec::new()
                } else {
                    vec![taxcalc_forms::schedule_1::OtherItem {
                        description: "other income".into(),
                        amount: income.other_income,
                    }]
                },
                ..Default::default()
            },
            part_2: Schedule1Part2 {
                educator_expenses: ret.deductions.educator_expenses,
                hsa_deduction: ret
                    .deductions
                    .hsa_contributions
                    .min(Money::new(self.table.hsa_limit_family)),
                se_tax_deduction: se_deduction.round_to_cents(),
                se_health_insurance: ret.deductions.self_employed_health_insurance,
                ira_deduction: ret
                    .deductions
                    .ira_contributions
                    .min(Money::new(self.table.ira_contribution_limit)),
                student_loan_interest: ret
                    .deductions
                    .student_loan_interest
                    .min(Money::from_dollars(2_500)),
                ..Default::default()
            },
        };

        // Income before Social Security, for the provisional-income test.
        let k1_investment: Money = income
            .schedule_k1_forms
            .iter()
            .map(|k| k.interest_income + k.ordinary_dividends)
            .sum();
        let income_excl_ss = wages
            + income.interest_income
            + income.dividend_income
            + k1_investment
            + income.total_capital_gains()
            + ira_taxable
            + child_income_addition
            + schedule_1.part_1.total_additional_income();
        let taxable_ss = self
            .taxable_social_security(status, income.social_security_benefits, income_excl_ss)
            .round_to_cents();

        let total_income = income_excl_ss + taxable_ss;
        let adjustments = schedule_1.part_2.total_adjustments();
        let agi = total_income - adjustments;

        // Deduction selection. Medical floors and the SALT cap re-read
        // AGI after Schedule 1.
        let standard = self.table.standard_deduction(status);
        let (used_itemized, deduction_taken) = match &ret.deductions.itemized {
            Some(itemized) if !ret.deductions.use_standard_deduction => {
                let total = itemized.total(agi, &self.table);
                if total > standard {
                    (true, total)
                } else {
                    (false, standard)
                }
            }
            _ => (false, standard),
        };

        // QBI with the taxable-income cap.
        let taxable_before_qbi = (agi - deduction_taken).floor_zero();
        let k1_qbi: Money = income
            .schedule_k1_forms
            .iter()
            .filter(|k| !k.is_sstb)
            .map(|k| k.qbi_ordinary_income)
            .sum();
        let qbi_base = (income.self_employment_income - se_deduction).floor_zero() + k1_qbi;
        let preferential_income = (income.qualified_dividends
            + income.long_term_capital_gains.floor_zero()
            + form_8814_result
                .as_ref()
                .map(|r| r.total_qualified_dividends + r.total_capital_gains)
                .unwrap_or(Money::ZERO))
        .min(taxable_before_qbi);
        let qbi_cap = (taxable_before_qbi - preferential_income)
            .floor_zero()
            .mul_rate(self.table.qbi_deduction_rate);
        let qbi_deduction = qbi_base
            .mul_rate(self.table.qbi_deduction_rate)
            .min(qbi_cap)
            .round_to_cents();

        let taxable_income = (taxable_before_qbi - qbi_deduction).floor_zero();

        // Regular tax: ordinary schedule plus the preferential slice.
        let ordinary_taxable = taxable_income - preferential_income.min(taxable_income);
        let regular_tax = (self.table.ordinary_tax(status, ordinary_taxable)
            + self.table.preferential_tax(
                status,
                ordinary_taxable,
                preferential_income.min(taxable_income),
            ))
        .round_to_cents();

        // AMT (Form 6251) after regular tax and itemized data.
        let itemized_addbacks = if used_itemized {
            ret.deductions.itemized.as_ref().map(|i| ItemizedAddbacks {
                salt_deducted: i.salt_allowed(&self.table),
                state_refund_in_income: Money::ZERO,
                investment_interest: i.investment_interest,
            })
        } else {
            None
        };
        let form_6251_result = form_6251::compute(
            &Form6251Input {
                filing_status: status,
                taxable_income,
                standard_deduction: if used_itemized { Money::ZERO } else { deduction_taken },
                itemized: itemized_addbacks,
                preferences: income.amt_preferences.clone().unwrap_or_default(),
                regular_tax_for_amt: regular_tax,
                preferential_income,
                prior_year_mtc: Money::ZERO,
            },
            &self.table,
        );
        let amt = form_6251_result.amt;

        // MTC (Form 8801) after AMT.
        let form_8801_result = {
            let mtc_inputs = request.forms.mtc.clone().unwrap_or_default();
            let has_mtc_state =
                !carryovers.mtc_carryforwards.is_empty() || !mtc_inputs.details.is_empty();
            if has_mtc_state {
                let result = form_8801::compute(
                    &Form8801Input {
                        filing_status: status,
                        tax_year: ret.tax_year,
                        prior_year_amti: mtc_inputs.prior_year_amti,
                        adjustments: mtc_inputs.exclusion_adjustments,
                        current_year_regular_tax: regular_tax,
                        current_year_tmt: form_6251_result.tentative_minimum_tax,
                        prior_year_amt_details: mtc_inputs.details,
                        mtc_carryforwards: carryovers.mtc_carryforwards.clone(),
                    },
                    &self.table,
                );
                derived.mtc_carryforwards = result.carryforwards_after.clone();
                Some(result)
            } else {
                None
            }
        };
        let minimum_tax_credit = form_8801_result
            .as_ref()
            .map(|r| r.credit_allowed)
            .unwrap_or(Money::ZERO);

        // Additional plan taxes and the child election tax.
        let form_5329_result = request.forms.additional_taxes.as_ref().map(form_5329::compute);
        let additional_plan_taxes = form_5329_result
            .as_ref()
            .map(|r| r.total_additional_tax)
            .unwrap_or(Money::ZERO)
            + form_8606_result
                .as_ref()
                .map(|r| r.part_iii.penalty_amount)
                .unwrap_or(Money::ZERO);

        let total_tax_before_credits =
            regular_tax + amt + se_tax.round_to_cents() + child_election_tax;

        // FTC (Form 1116) after total tax before credits.
        let form_1116_result = request.forms.ftc.as_ref().map(|ftc| {
            form_1116::compute(
                &form_1116::Form1116Input {
                    filing_status: status,
                    tax_year: ret.tax_year,
                    categories: {
                        let mut categories = ftc.categories.clone();
                        for category in &mut categories {
                            if let Some(prior) =
                                carryovers.ftc_carryovers.get(category.basket.tag())
                            {
                                category.carryovers.extend(prior.iter().cloned());
                            }
                        }
                        categories
                    },
                    total_taxable_income: taxable_income,
                    total_tax_before_credits: regular_tax + amt,
                    use_simplified_method: ftc.use_simplified_method,
                    high_tax_kickout_election: false,
                    amt: if ftc.foreign_source_amti.is_positive() {
                        Some(form_1116::AmtFtcInput {
                            foreign_source_amti: ftc.foreign_source_amti,
                            tentative_minimum_tax: form_6251_result.tentative_minimum_tax,
                            amti: Some(form_6251_result.amti),
                        })
                    } else {
                        None
                    },
                },
                &self.table,
            )
        });
        if let Some(r) = &form_1116_result {
            for category in &r.categories {
                let mut records = category.carryovers_after.clone();
                if category.excess_taxes.is_positive() {
                    records.push(CarryoverRecord::new(ret.tax_year, category.excess_taxes));
                }
                derived
                    .ftc_carryovers
                    .insert(category.basket.tag().to_string(), records);
            }
        }
        let foreign_tax_credit = form_1116_result
            .as_ref()
            .map(|r| r.total_credit_allowed)
            .unwrap_or(Money::ZERO);

        // Education credits (Form 8863), MAGI = AGI here.
        let form_8863_result = if request.forms.education_students.is_empty() {
            None
        } else {
            Some(form_8863::compute(
                &request.forms.education_students,
                agi,
                status,
                &self.table,
            ))
        };
        let education_nonrefundable = form_8863_result
            .as_ref()
            .map(|r| r.total_nonrefundable)
            .unwrap_or(Money::ZERO);
        let education_refundable = form_8863_result
            .as_ref()
            .map(|r| r.total_refundable)
            .unwrap_or(Money::ZERO);

        // WOTC (Form 5884) from the employee list on credits.
        let form_5884_result = if ret.credits.wotc_employees.is_empty() {
            None
        } else {
            Some(form_5884::compute(&ret.credits.wotc_employees))
        };
        let wotc_credit = form_5884_result
            .as_ref()
            .map(|r| r.total_credit)
            .unwrap_or(Money::ZERO);

        // Nonrefundable credits cannot drive the income-tax portion
        // below zero; SE tax and plan penalties remain due.
        let other_nonrefundable = ret.credits.total_nonrefundable();
        let income_tax_portion = regular_tax + amt + child_election_tax;
        let nonrefundable_total = (foreign_tax_credit
            + minimum_tax_credit
            + education_nonrefundable
            + wotc_credit
            + other_nonrefundable)
            .min(income_tax_portion);
        let total_federal_tax = (income_tax_portion - nonrefundable_total
            + se_tax.round_to_cents()
            + additional_plan_taxes
            - education_refundable
            - ret.credits.other_refundable)
            .round_to_cents();

        let withholding = income.total_withholding();
        let balance_due = total_federal_tax - withholding;

        let effective_rate = if total_income.is_positive() {
            (total_federal_tax.as_decimal() / total_income.as_decimal()).round_dp(6)
        } else {
            rust_decimal::Decimal::ZERO
        };

        tracing::debug!(
            agi = %agi,
            taxable_income = %taxable_income,
            regular_tax = %regular_tax,
            amt = %amt,
            total = %total_federal_tax,
            "federal calculation complete"
        );

        Ok(CalculationBreakdown {
            tax_year: ret.tax_year,
            filing_status: status,
            total_income: total_income.round_to_cents(),
            schedule_1,
            adjustments_to_income: adjustments.round_to_cents(),
            agi: agi.round_to_cents(),
            taxable_social_security: taxable_ss,
            used_itemized,
            deduction_taken: deduction_taken.round_to_cents(),
            qbi_deduction,
            taxable_income: taxable_income.round_to_cents(),
            preferential_income: preferential_income.round_to_cents(),
            regular_tax,
            se_tax: se_tax.round_to_cents(),
            additional_plan_taxes: additional_plan_taxes.round_to_cents(),
            child_election_tax,
            amt,
            total_tax_before_credits: total_tax_before_credits.round_to_cents(),
            foreign_tax_credit,
            minimum_tax_credit,
            education_nonrefundable,
            education_refundable,
            wotc_credit,
            other_nonrefundable_credits: other_nonrefundable,
            total_federal_tax,
            withholding,
            balance_due: balance_due.round_to_cents(),
            effective_rate,
            form_6251: Some(form_6251_result),
            form_8582: form_8582_result,
            form_1116: form_1116_result,
            form_8801: form_8801_result,
            form_8863: form_8863_result,
            form_5329: form_5329_result,
            form_8606: form_8606_result,
            form_8814: form_8814_result,
            form_982: form_982_result,
            form_5471: form_5471_results,
            form_5884: form_5884_result,
            derived_carryovers: derived,
        })
    }
}
