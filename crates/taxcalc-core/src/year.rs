//! Tax-year constant tables.
//!
//! The table is the sole source of year-sensitive constants. Form
//! components receive a `&YearTable` and never inline a year-specific
//! number. Only tax year 2025 is currently published; the lookup is keyed
//! so additional years can be added without touching form code.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{TaxError, TaxResult};
use crate::models::FilingStatus;
use crate::money::Money;

/// One ordinary-income bracket: the rate applies up to `upper` (None for
/// the top bracket).
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub rate: Decimal,
    pub upper: Option<Decimal>,
}

/// Constants for a single tax year.
#[derive(Debug, Clone)]
pub struct YearTable {
    pub tax_year: u16,

    // Standard deduction by status
    standard_deduction_single: Decimal,
    standard_deduction_mfj: Decimal,
    standard_deduction_mfs: Decimal,
    standard_deduction_hoh: Decimal,

    // Ordinary bracket upper bounds (single / mfj / mfs / hoh), 10..35%.
    brackets_single: [Decimal; 6],
    brackets_mfj: [Decimal; 6],
    brackets_mfs: [Decimal; 6],
    brackets_hoh: [Decimal; 6],

    // Long-term capital gain 0%/15% breakpoints.
    ltcg_zero_single: Decimal,
    ltcg_zero_mfj: Decimal,
    ltcg_zero_mfs: Decimal,
    ltcg_zero_hoh: Decimal,
    ltcg_fifteen_single: Decimal,
    ltcg_fifteen_mfj: Decimal,
    ltcg_fifteen_mfs: Decimal,
    ltcg_fifteen_hoh: Decimal,

    // AMT
    amt_exemption_single: Decimal,
    amt_exemption_mfj: Decimal,
    amt_exemption_mfs: Decimal,
    amt_phaseout_start_single: Decimal,
    amt_phaseout_start_mfj: Decimal,
    amt_28_threshold: Decimal,
    amt_28_threshold_mfs: Decimal,

    // Self-employment / payroll
    pub ss_wage_base: Decimal,
    pub se_net_earnings_factor: Decimal,
    pub se_tax_rate: Decimal,
    pub oasdi_rate: Decimal,
    pub medicare_rate: Decimal,

    // Retirement
    pub ira_contribution_limit: Decimal,
    pub ira_catch_up_50: Decimal,
    roth_phaseout_start_single: Decimal,
    roth_phaseout_end_single: Decimal,
    roth_phaseout_start_mfj: Decimal,
    roth_phaseout_end_mfj: Decimal,
    roth_phaseout_start_mfs: Decimal,
    roth_phaseout_end_mfs: Decimal,

    // HSA
    pub hsa_limit_self: Decimal,
    pub hsa_limit_family: Decimal,

    // Itemized
    pub salt_cap: Decimal,

    // Education credits
    education_phaseout_limit_mfj: Decimal,
    education_phaseout_range_mfj: Decimal,
    education_phaseout_limit_other: Decimal,
    education_phaseout_range_other: Decimal,

    // Form 8814 kiddie amounts
    pub kiddie_base_amount: Decimal,
    pub kiddie_second_tier: Decimal,
    pub kiddie_gross_income_limit: Decimal,

    // FTC
    pub ftc_simplified_threshold_single: Decimal,
    pub ftc_simplified_threshold_mfj: Decimal,
    pub ftc_carryback_years: u8,
    pub ftc_carryforward_years: u8,

    // Rental real estate special allowance (Form 8582 Part II)
    pub rental_allowance_max: Decimal,
    pub rental_allowance_magi_start: Decimal,
    pub rental_allowance_magi_start_mfs_apart: Decimal,

    // QBI
    pub qbi_deduction_rate: Decimal,
}

impl YearTable {
    /// Look up the table for a tax year. Only 2025 is published.
    pub fn for_year(tax_year: u16) -> TaxResult<YearTable> {
        match tax_year {
            2025 => Ok(Self::year_2025()),
            other => Err(TaxError::invalid_input(
                "tax_year",
                format!("no constant table published for tax year {other}"),
            )),
        }
    }

    /// IRS-published parameters for tax year 2025 (filed in 2026).
    pub fn year_2025() -> YearTable {
        YearTable {
            tax_year: 2025,

            standard_deduction_single: dec!(15_750),
            standard_deduction_mfj: dec!(31_500),
            standard_deduction_mfs: dec!(15_750),
            standard_deduction_hoh: dec!(23_625),

            brackets_single: [
                dec!(11_925),
                dec!(48_475),
                dec!(103_350),
                dec!(197_300),
                dec!(250_525),
                dec!(626_350),
            ],
            brackets_mfj: [
                dec!(23_850),
                dec!(96_950),
                dec!(206_700),
                dec!(394_600),
                dec!(501_050),
                dec!(751_600),
            ],
            brackets_mfs: [
                dec!(11_925),
                dec!(48_475),
                dec!(103_350),
                dec!(197_300),
                dec!(250_525),
                dec!(375_800),
            ],
            brackets_hoh: [
                dec!(17_000),
                dec!(64_850),
                dec!(103_350),
                dec!(197_300),
                dec!(250_525),
                dec!(626_350),
            ],

            ltcg_zero_single: dec!(48_350),
            ltcg_zero_mfj: dec!(96_700),
            ltcg_zero_mfs: dec!(48_350),
            ltcg_zero_hoh: dec!(64_750),
            ltcg_fifteen_single: dec!(533_400),
            ltcg_fifteen_mfj: dec!(600_050),
            ltcg_fifteen_mfs: dec!(300_000),
            ltcg_fifteen_hoh: dec!(566_700),

            amt_exemption_single: dec!(88_100),
            amt_exemption_mfj: dec!(137_000),
            amt_exemption_mfs: dec!(68_500),
            amt_phaseout_start_single: dec!(626_350),
            amt_phaseout_start_mfj: dec!(1_252_700),
            amt_28_threshold: dec!(232_600),
            amt_28_threshold_mfs: dec!(116_300),

            ss_wage_base: dec!(176_100),
            se_net_earnings_factor: dec!(0.9235),
            se_tax_rate: dec!(0.153),
            oasdi_rate: dec!(0.124),
            medicare_rate: dec!(0.029),

            ira_contribution_limit: dec!(7_000),
            ira_catch_up_50: dec!(1_000),
            roth_phaseout_start_single: dec!(150_000),
            roth_phaseout_end_single: dec!(165_000),
            roth_phaseout_start_mfj: dec!(236_000),
            roth_phaseout_end_mfj: dec!(246_000),
            roth_phaseout_start_mfs: dec!(0),
            roth_phaseout_end_mfs: dec!(10_000),

            hsa_limit_self: dec!(4_300),
            hsa_limit_family: dec!(8_550),

            salt_cap: dec!(10_000),

            education_phaseout_limit_mfj: dec!(180_000),
            education_phaseout_range_mfj: dec!(20_000),
            education_phaseout_limit_other: dec!(90_000),
            education_phaseout_range_other: dec!(10_000),

            kiddie_base_amount: dec!(1_300),
            kiddie_second_tier: dec!(1_300),
            kiddie_gross_income_limit: dec!(12_500),

            ftc_simplified_threshold_single: dec!(300),
            ftc_simplified_threshold_mfj: dec!(600),
            ftc_carryback_years: 1,
            ftc_carryforward_years: 10,

            rental_allowance_max: dec!(25_000),
            rental_allowance_magi_start: dec!(100_000),
            rental_allowance_magi_start_mfs_apart: dec!(50_000),

            qbi_deduction_rate: dec!(0.20),
        }
    }

    pub fn standard_deduction(&self, status: FilingStatus) -> Money {
        Money::new(match status {
            FilingStatus::Single => self.standard_deduction_single,
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => {
                self.standard_deduction_mfj
            }
            FilingStatus::MarriedSeparate => self.standard_deduction_mfs,
            FilingStatus::HeadOfHousehold => self.standard_deduction_hoh,
        })
    }

    /// Ordinary-income brackets for a status, lowest first. The final
    /// bracket is unbounded.
    pub fn ordinary_brackets(&self, status: FilingStatus) -> Vec<Bracket> {
        let uppers = match status {
            FilingStatus::Single => &self.brackets_single,
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => &self.brackets_mfj,
            FilingStatus::MarriedSeparate => &self.brackets_mfs,
            FilingStatus::HeadOfHousehold => &self.brackets_hoh,
        };
        let rates = [
            dec!(0.10),
            dec!(0.12),
            dec!(0.22),
            dec!(0.24),
            dec!(0.32),
            dec!(0.35),
        ];
        let mut brackets: Vec<Bracket> = rates
            .iter()
            .zip(uppers.iter())
            .map(|(rate, upper)| Bracket {
                rate: *rate,
                upper: Some(*upper),
            })
            .collect();
        brackets.push(Bracket {
            rate: dec!(0.37),
            upper: None,
        });
        brackets
    }

    /// Tax on ordinary taxable income from the bracket schedule. Unrounded.
    pub fn ordinary_tax(&self, status: FilingStatus, taxable: Money) -> Money {
        let taxable = taxable.floor_zero().as_decimal();
        let mut tax = Decimal::ZERO;
        let mut lower = Decimal::ZERO;
        for bracket in self.ordinary_brackets(status) {
            let upper = bracket.upper.unwrap_or(taxable);
            if taxable <= lower {
                break;
            }
            let span = taxable.min(upper) - lower;
            if span > Decimal::ZERO {
                tax += span * bracket.rate;
            }
            lower = upper;
        }
        Money::new(tax)
    }

    /// 0% / 15% long-term capital gain breakpoints for a status.
    pub fn ltcg_breakpoints(&self, status: FilingStatus) -> (Decimal, Decimal) {
        match status {
            FilingStatus::Single => (self.ltcg_zero_single, self.ltcg_fifteen_single),
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => {
                (self.ltcg_zero_mfj, self.ltcg_fifteen_mfj)
            }
            FilingStatus::MarriedSeparate => (self.ltcg_zero_mfs, self.ltcg_fifteen_mfs),
            FilingStatus::HeadOfHousehold => (self.ltcg_zero_hoh, self.ltcg_fifteen_hoh),
        }
    }

    /// Tax on a preferential (LTCG + qualified dividend) slice stacked on
    /// top of ordinary taxable income.
    pub fn preferential_tax(
        &self,
        status: FilingStatus,
        ordinary_taxable: Money,
        preferential: Money,
    ) -> Money {
        let (zero_top, fifteen_top) = self.ltcg_breakpoints(status);
        let base = ordinary_taxable.floor_zero().as_decimal();
        let pref = preferential.floor_zero().as_decimal();
        let top = base + pref;

        let in_zero = (zero_top - base).max(Decimal::ZERO).min(pref);
        let in_fifteen = (fifteen_top - (base + in_zero))
            .max(Decimal::ZERO)
            .min(pref - in_zero);
        let in_twenty = (top - (base + in_zero + in_fifteen)).max(Decimal::ZERO);

        Money::new(in_fifteen * dec!(0.15) + in_twenty * dec!(0.20))
    }

    pub fn amt_exemption(&self, status: FilingStatus) -> Money {
        Money::new(match status {
            FilingStatus::Single | FilingStatus::HeadOfHousehold => self.amt_exemption_single,
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => self.amt_exemption_mfj,
            FilingStatus::MarriedSeparate => self.amt_exemption_mfs,
        })
    }

    pub fn amt_phaseout_start(&self, status: FilingStatus) -> Money {
        Money::new(match status {
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => {
                self.amt_phaseout_start_mfj
            }
            _ => self.amt_phaseout_start_single,
        })
    }

    pub fn amt_28_threshold(&self, status: FilingStatus) -> Money {
        Money::new(match status {
            FilingStatus::MarriedSeparate => self.amt_28_threshold_mfs,
            _ => self.amt_28_threshold,
        })
    }

    /// Roth IRA MAGI phaseout window (start, end) for a status.
    pub fn roth_phaseout(&self, status: FilingStatus) -> (Money, Money) {
        let (start, end) = match status {
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => {
                (self.roth_phaseout_start_mfj, self.roth_phaseout_end_mfj)
            }
            FilingStatus::MarriedSeparate => {
                (self.roth_phaseout_start_mfs, self.roth_phaseout_end_mfs)
            }
            _ => (
                self.roth_phaseout_start_single,
                self.roth_phaseout_end_single,
            ),
        };
        (Money::new(start), Money::new(end))
    }

    /// Education-credit phaseout (limit, range) for a status. MFS is
    /// disqualified and gets (0, 0).
    pub fn education_phaseout(&self, status: FilingStatus) -> (Money, Money) {
        match status {
            FilingStatus::MarriedJoint | FilingStatus::QualifyingWidow => (
                Money::new(self.education_phaseout_limit_mfj),
                Money::new(self.education_phaseout_range_mfj),
            ),
            FilingStatus::MarriedSeparate => (Money::ZERO, Money::ZERO),
            _ => (
                Money::new(self.education_phaseout_limit_other),
                Money::new(self.education_phaseout_range_other),
            ),
        }
    }

    pub fn ftc_simplified_threshold(&self, status: FilingStatus) -> Money {
        Money::new(if status == FilingStatus::MarriedJoint {
            self.ftc_simplified_threshold_mfj
        } else {
            self.ftc_simplified_threshold_single
        })
    }
}
