//! Form 5471 - U.S. Persons With Respect to Certain Foreign Corporations.
//!
//! Determines CFC and 10%-shareholder status, then the Subpart F and
//! GILTI inclusions. Schedules C/E/F/H/I-1 are structured input carriers;
//! their totals are derived from line items but net E&P feeds downstream
//! attribute allocation without being recomputed here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::Money;

/// Ownership of the shareholder in the foreign corporation, in percent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareholderOwnership {
    pub direct_percent: Decimal,
    #[serde(default)]
    pub indirect_percent: Decimal,
    #[serde(default)]
    pub constructive_percent: Decimal,
}

impl ShareholderOwnership {
    pub fn total_percent(&self) -> Decimal {
        self.direct_percent + self.indirect_percent + self.constructive_percent
    }

    /// U.S.-shareholder status: 10% or more by vote or value.
    pub fn is_ten_percent_shareholder(&self) -> bool {
        self.total_percent() >= dec!(10)
    }
}

/// Schedule C - income statement of the foreign corporation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleC {
    #[serde(default)]
    pub gross_receipts: Money,
    #[serde(default)]
    pub returns_and_allowances: Money,
    #[serde(default)]
    pub cost_of_goods_sold: Money,
    #[serde(default)]
    pub dividends: Money,
    #[serde(default)]
    pub interest: Money,
    #[serde(default)]
    pub gross_rents: Money,
    #[serde(default)]
    pub gross_royalties: Money,
    #[serde(default)]
    pub other_income: Money,
    #[serde(default)]
    pub total_deductions: Money,
}

impl ScheduleC {
    pub fn gross_income(&self) -> Money {
        self.gross_receipts - self.returns_and_allowances - self.cost_of_goods_sold
            + self.dividends
            + self.interest
            + self.gross_rents
            + self.gross_royalties
            + self.other_income
    }

    pub fn net_income(&self) -> Money {
        self.gross_income() - self.total_deductions
    }
}

/// Schedule E - income, war profits, and excess profits taxes paid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleE {
    #[serde(default)]
    pub foreign_taxes_paid: Money,
    #[serde(default)]
    pub foreign_taxes_accrued: Money,
}

impl ScheduleE {
    pub fn total_taxes(&self) -> Money {
        self.foreign_taxes_paid + self.foreign_taxes_accrued
    }
}

/// Schedule F - balance sheet summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleF {
    #[serde(default)]
    pub total_assets: Money,
    #[serde(default)]
    pub total_liabilities: Money,
}

impl ScheduleF {
    pub fn net_equity(&self) -> Money {
        self.total_assets - self.total_liabilities
    }
}

/// Schedule H - current earnings and profits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleH {
    #[serde(default)]
    pub current_year_net_income: Money,
    /// Net adjustments per E&P accounting rules (signed).
    #[serde(default)]
    pub ep_adjustments: Money,
}

impl ScheduleH {
    /// Net E&P fed to downstream attribute allocation.
    pub fn net_earnings_and_profits(&self) -> Money {
        self.current_year_net_income + self.ep_adjustments
    }
}

/// Schedule I-1 - GILTI tested items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleI1 {
    #[serde(default)]
    pub tested_income: Money,
    #[serde(default)]
    pub tested_loss: Money,
    /// Qualified business asset investment at year end.
    #[serde(default)]
    pub qbai: Money,
}

impl ScheduleI1 {
    pub fn net_tested_income(&self) -> Money {
        self.tested_income - self.tested_loss
    }

    /// Deemed tangible income return: 10% of QBAI.
    pub fn deemed_tangible_return(&self) -> Money {
        self.qbai.mul_rate(dec!(0.10))
    }
}

/// Subpart F income with its exclusions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubpartFIncome {
    #[serde(default)]
    pub gross_subpart_f: Money,
    #[serde(default)]
    pub high_tax_exception: Money,
    #[serde(default)]
    pub de_minimis_exclusion: Money,
    #[serde(default)]
    pub same_country_exclusion: Money,
}

impl SubpartFIncome {
    pub fn total_exclusions(&self) -> Money {
        self.high_tax_exception + self.de_minimis_exclusion + self.same_country_exclusion
    }

    pub fn net_subpart_f(&self) -> Money {
        self.gross_subpart_f
            .saturating_sub(self.total_exclusions())
    }
}

/// Inputs for the inclusion computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Form5471Input {
    pub corporation_name: String,
    pub country_of_incorporation: String,
    /// CFC determination supplied by the caller (>50% U.S.-owned).
    pub is_cfc: bool,
    pub ownership: ShareholderOwnership,
    #[serde(default)]
    pub subpart_f: SubpartFIncome,
    #[serde(default)]
    pub schedule_c: ScheduleC,
    #[serde(default)]
    pub schedule_e: ScheduleE,
    #[serde(default)]
    pub schedule_f: ScheduleF,
    #[serde(default)]
    pub schedule_h: ScheduleH,
    #[serde(default)]
    pub schedule_i1: ScheduleI1,
}

/// Inclusion results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form5471Result {
    pub is_cfc: bool,
    pub is_ten_percent_shareholder: bool,
    pub inclusion_required: bool,
    pub pro_rata_percent: Decimal,
    pub net_subpart_f_income: Money,
    pub subpart_f_inclusion: Money,
    pub net_tested_income: Money,
    pub deemed_tangible_return: Money,
    pub gilti_inclusion: Money,
    pub total_inclusion: Money,
    /// Schedule H net E&P, carried through for attribute allocation.
    pub net_earnings_and_profits: Money,
}

/// Compute the Subpart F and GILTI inclusions.
pub fn compute(input: &Form5471Input) -> Form5471Result {
    let is_ten_percent = input.ownership.is_ten_percent_shareholder();
    let inclusion_required = input.is_cfc && is_ten_percent;
    let pro_rata = input.ownership.total_percent() / dec!(100);

    let net_subpart_f = input.subpart_f.net_subpart_f();
    let net_tested = input.schedule_i1.net_tested_income();
    let dtr = input.schedule_i1.deemed_tangible_return();

    let (subpart_f_inclusion, gilti_inclusion) = if inclusion_required {
        let spf = net_subpart_f.mul_rate(pro_rata).round_to_cents();
        let gilti_base = net_tested.saturating_sub(dtr);
        let gilti = gilti_base.mul_rate(pro_rata).round_to_cents();
        (spf, gilti)
    } else {
        (Money::ZERO, Money::ZERO)
    };

    Form5471Result {
        is_cfc: input.is_cfc,
        is_ten_percent_shareholder: is_ten_percent,
        inclusion_required,
        pro_rata_percent: input.ownership.total_percent(),
        net_subpart_f_income: net_subpart_f,
        subpart_f_inclusion,
        net_tested_income: net_tested,
        deemed_tangible_return: dtr,
        gilti_inclusion,
        total_inclusion: subpart_f_inclusion + gilti_inclusion,
        net_earnings_and_profits: input.schedule_h.net_earnings_and_profits(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(direct: i64, indirect: i64, constructive: i64) -> ShareholderOwnership {
        ShareholderOwnership {
            direct_percent: Decimal::new(direct, 0),
            indirect_percent: Decimal::new(indirect, 0),
            constructive_percent: Decimal::new(constructive, 0),
        }
    }

    #[test]
    fn ten_percent_test_sums_all_ownership() {
        assert!(owner(4, 3, 3).is_ten_percent_shareholder());
        assert!(!owner(4, 3, 2).is_ten_percent_shareholder());
    }

    #[test]
    fn subpart_f_inclusion_pro_rata() {
        let input = Form5471Input {
            corporation_name: "Foreign Ops Ltd".into(),
            country_of_incorporation: "IE".into(),
            is_cfc: true,
            ownership: owner(25, 0, 0),
            subpart_f: SubpartFIncome {
                gross_subpart_f: Money::from_dollars(400_000),
                high_tax_exception: Money::from_dollars(50_000),
                de_minimis_exclusion: Money::from_dollars(30_000),
                same_country_exclusion: Money::from_dollars(20_000),
            },
            ..Default::default()
        };
        let r = compute(&input);
        assert!(r.inclusion_required);
        assert_eq!(r.net_subpart_f_income, Money::from_dollars(300_000));
        assert_eq!(r.subpart_f_inclusion, Money::from_dollars(75_000));
    }

    #[test]
    fn gilti_nets_tested_income_against_qbai_return() {
        let input = Form5471Input {
            corporation_name: "TechCo".into(),
            country_of_incorporation: "SG".into(),
            is_cfc: true,
            ownership: owner(100, 0, 0),
            schedule_i1: ScheduleI1 {
                tested_income: Money::from_dollars(500_000),
                tested_loss: Money::ZERO,
                qbai: Money::from_dollars(2_000_000),
            },
            ..Default::default()
        };
        let r = compute(&input);
        assert_eq!(r.deemed_tangible_return, Money::from_dollars(200_000));
        assert_eq!(r.gilti_inclusion, Money::from_dollars(300_000));
    }

    #[test]
    fn gilti_floors_at_zero_with_high_qbai() {
        let input = Form5471Input {
            is_cfc: true,
            ownership: owner(50, 0, 0),
            schedule_i1: ScheduleI1 {
                tested_income: Money::from_dollars(100_000),
                tested_loss: Money::ZERO,
                qbai: Money::from_dollars(5_000_000),
            },
            ..Default::default()
        };
        let r = compute(&input);
        assert_eq!(r.gilti_inclusion, Money::ZERO);
    }

    #[test]
    fn no_inclusion_below_ten_percent() {
        let input = Form5471Input {
            is_cfc: true,
            ownership: owner(9, 0, 0),
            subpart_f: SubpartFIncome {
                gross_subpart_f: Money::from_dollars(100_000),
                ..Default::default()
            },
            ..Default::default()
        };
        let r = compute(&input);
        assert!(!r.inclusion_required);
        assert_eq!(r.total_inclusion, Money::ZERO);
        // The net figure is still reported for information.
        assert_eq!(r.net_subpart_f_income, Money::from_dollars(100_000));
    }

    #[test]
    fn no_inclusion_when_not_cfc() {
        let input = Form5471Input {
            is_cfc: false,
            ownership: owner(60, 0, 0),
            subpart_f: SubpartFIncome {
                gross_subpart_f: Money::from_dollars(100_000),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!compute(&input).inclusion_required);
    }

    #[test]
    fn schedule_totals_derive_from_lines() {
        let c = ScheduleC {
            gross_receipts: Money::from_dollars(900_000),
            returns_and_allowances: Money::from_dollars(20_000),
            cost_of_goods_sold: Money::from_dollars(400_000),
            interest: Money::from_dollars(5_000),
            total_deductions: Money::from_dollars(300_000),
            ..Default::default()
        };
        assert_eq!(c.gross_income(), Money::from_dollars(485_000));
        assert_eq!(c.net_income(), Money::from_dollars(185_000));

        let h = ScheduleH {
            current_year_net_income: Money::from_dollars(185_000),
            ep_adjustments: Money::from_dollars(-15_000),
        };
        assert_eq!(h.net_earnings_and_profits(), Money::from_dollars(170_000));
    }
}
