//! Rule-based validation of submitted tax returns.
//!
//! Rules partition into errors and warnings. In strict mode any error
//! aborts computation; in lenient (advisor-profile) mode errors are
//! captured and computation proceeds.

use taxcalc_core::{Money, Severity, TaxReturn, ValidationIssue};

/// How the pipeline reacts to validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Errors abort the calculation.
    #[default]
    Strict,
    /// Errors are recorded; computation proceeds.
    Lenient,
}

/// Validation outcome: all issues plus the error/warning partition.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

/// Validation seam injected into the pipeline.
pub trait Validator: Send + Sync {
    fn validate(&self, tax_return: &TaxReturn) -> ValidationOutcome;
}

/// The default rule set.
#[derive(Debug, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }
}

fn ssn_is_well_formed(ssn: &str) -> bool {
    let bytes = ssn.as_bytes();
    bytes.len() == 11
        && bytes[3] == b'-'
        && bytes[6] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 3 || i == 6 { *b == b'-' } else { b.is_ascii_digit() })
}

impl Validator for RuleValidator {
    fn validate(&self, ret: &TaxReturn) -> ValidationOutcome {
        let mut issues = Vec::new();

        // Rule 1: supported tax year.
        if ret.tax_year != 2025 {
            issues.push(ValidationIssue::error(
                "tax_year_supported",
                "tax_year",
                format!("tax year {} is not supported", ret.tax_year),
            ));
        }

        // Rule 2: SSN shape.
        if !ssn_is_well_formed(&ret.taxpayer.ssn) {
            issues.push(ValidationIssue::error(
                "ssn_format",
                "taxpayer.ssn",
                "SSN must be formatted NNN-NN-NNNN",
            ));
        }

        // Rule 3: non-negative wages.
        for (i, w2) in ret.income.w2_forms.iter().enumerate() {
            if w2.wages.is_negative() {
                issues.push(ValidationIssue::error(
                    "wages_non_negative",
                    format!("income.w2_forms[{i}].wages"),
                    "wages cannot be negative",
                ));
            }
            // Rule 4: withholding within wages.
            if w2.federal_tax_withheld > w2.wages {
                issues.push(ValidationIssue::error(
                    "withholding_exceeds_wages",
                    format!("income.w2_forms[{i}].federal_tax_withheld"),
                    "federal withholding exceeds wages",
                ));
            }
        }

        // Rule 5: dependent count plausibility.
        if ret.taxpayer.dependents > 15 {
            issues.push(ValidationIssue::warning(
                "dependents_plausible",
                "taxpayer.dependents",
                "unusually high dependent count",
            ));
        }

        // Rule 6: investment income signs.
        if ret.income.interest_income.is_negative() || ret.income.dividend_income.is_negative() {
            issues.push(ValidationIssue::error(
                "investment_income_non_negative",
                "income.interest_income",
                "interest and dividend income cannot be negative",
            ));
        }

        // Rule 7: qualified dividends bounded by ordinary dividends.
        if ret.income.qualified_dividends > ret.income.dividend_income {
            issues.push(ValidationIssue::error(
                "qualified_dividends_bounded",
                "income.qualified_dividends",
                "qualified dividends cannot exceed total dividends",
            ));
        }

        // Rule 8: itemizing requires itemized data.
        if !ret.deductions.use_standard_deduction && ret.deductions.itemized.is_none() {
            issues.push(ValidationIssue::warning(
                "itemized_data_present",
                "deductions.itemized",
                "itemized deduction selected but no line items given; standard deduction will apply",
            ));
        }

        // Rule 9: participation hours plausibility.
        for (i, activity) in ret.income.passive_activities.iter().enumerate() {
            if activity.combined_owner_hours() > 5_000 {
                issues.push(ValidationIssue::error(
                    "participation_hours_plausible",
                    format!("income.passive_activities[{i}]"),
                    "combined participation hours exceed a plausible annual maximum",
                ));
            }
        }

        // Rule 10: SE income magnitude.
        if ret.income.se_earnings() > Money::from_dollars(10_000_000) {
            issues.push(ValidationIssue::warning(
                "se_income_magnitude",
                "income.self_employment_income",
                "self-employment income is unusually large; verify the amount",
            ));
        }

        // Rule 11: state code shape.
        if let Some(state) = &ret.taxpayer.state {
            if state.len() != 2 || !state.chars().all(|c| c.is_ascii_uppercase()) {
                issues.push(ValidationIssue::warning(
                    "state_code_shape",
                    "taxpayer.state",
                    "state should be a two-letter uppercase code",
                ));
            }
        }

        ValidationOutcome { issues }
    }
}
