//! Form 8814 - Parents' Election To Report Child's Interest and Dividends.
//!
//! For each qualifying child the first tier is excluded, the second tier
//! is taxed at 10% on the parents' return, and the excess is included in
//! the parents' income, allocated proportionally across ordinary income,
//! qualified dividends, and capital gain distributions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{Money, YearTable};

/// A child's unearned income for the election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildIncome {
    pub child_name: String,
    pub child_age: u8,
    #[serde(default)]
    pub is_full_time_student: bool,
    #[serde(default)]
    pub taxable_interest: Money,
    #[serde(default)]
    pub tax_exempt_interest: Money,
    #[serde(default)]
    pub ordinary_dividends: Money,
    #[serde(default)]
    pub qualified_dividends: Money,
    #[serde(default)]
    pub capital_gain_distributions: Money,
    #[serde(default)]
    pub alaska_pfd: Money,
    #[serde(default)]
    pub federal_tax_withheld: Money,
    #[serde(default)]
    pub made_estimated_payments: bool,
}

impl ChildIncome {
    pub fn gross_income(&self) -> Money {
        self.taxable_interest
            + self.ordinary_dividends
            + self.capital_gain_distributions
            + self.alaska_pfd
    }

    /// Election requirements: age (< 19, or < 24 full-time student),
    /// interest/dividend-type income only, gross income under the limit,
    /// no withholding, no estimated payments.
    pub fn qualifies(&self, table: &YearTable) -> bool {
        let age_ok = if self.is_full_time_student {
            self.child_age < 24
        } else {
            self.child_age < 19
        };
        age_ok
            && self.gross_income() < Money::new(table.kiddie_gross_income_limit)
            && self.federal_tax_withheld.is_zero()
            && !self.made_estimated_payments
    }
}

/// Per-child election result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildElection {
    pub child_name: String,
    pub qualifies: bool,
    pub gross_income: Money,
    /// Tax at 10% on the second tier, added to the parents' tax.
    pub child_tax: Money,
    /// Amount over both tiers, included in the parents' income.
    pub amount_to_include: Money,
    pub ordinary_income_portion: Money,
    pub qualified_dividends_portion: Money,
    pub capital_gains_portion: Money,
}

/// Aggregate Form 8814 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form8814Result {
    pub children: Vec<ChildElection>,
    pub qualifying_children: usize,
    pub total_to_include: Money,
    pub total_ordinary_income: Money,
    pub total_qualified_dividends: Money,
    pub total_capital_gains: Money,
    pub total_child_tax: Money,
}

fn elect_for_child(child: &ChildIncome, table: &YearTable) -> ChildElection {
    let gross = child.gross_income();
    if !child.qualifies(table) {
        return ChildElection {
            child_name: child.child_name.clone(),
            qualifies: false,
            gross_income: gross,
            child_tax: Money::ZERO,
            amount_to_include: Money::ZERO,
            ordinary_income_portion: Money::ZERO,
            qualified_dividends_portion: Money::ZERO,
            capital_gains_portion: Money::ZERO,
        };
    }

    let base = Money::new(table.kiddie_base_amount);
    let second_tier = Money::new(table.kiddie_second_tier);

    let over_base = gross.saturating_sub(base);
    let taxed_at_ten = over_base.min(second_tier);
    let child_tax = taxed_at_ten.mul_rate(dec!(0.10)).round_to_cents();
    let excluded = base + taxed_at_ten;
    let to_include = gross.saturating_sub(excluded);

    // Allocate the included amount by the child's income composition.
    let (qd_portion, cg_portion) = if gross.is_positive() {
        let qd_ratio = child.qualified_dividends.as_decimal() / gross.as_decimal();
        let cg_ratio = child.capital_gain_distributions.as_decimal() / gross.as_decimal();
        (
            to_include.mul_rate(qd_ratio).round_to_cents(),
            to_include.mul_rate(cg_ratio).round_to_cents(),
        )
    } else {
        (Money::ZERO, Money::ZERO)
    };
    let ordinary = to_include - qd_portion - cg_portion;

    ChildElection {
        child_name: child.child_name.clone(),
        qualifies: true,
        gross_income: gross,
        child_tax,
        amount_to_include: to_include,
        ordinary_income_portion: ordinary,
        qualified_dividends_portion: qd_portion,
        capital_gains_portion: cg_portion,
    }
}

/// Compute the election across all children.
pub fn compute(children: &[ChildIncome], table: &YearTable) -> Form8814Result {
    let elections: Vec<ChildElection> =
        children.iter().map(|c| elect_for_child(c, table)).collect();

    let qualifying: Vec<&ChildElection> = elections.iter().filter(|e| e.qualifies).collect();
    let result = Form8814Result {
        qualifying_children: qualifying.len(),
        total_to_include: qualifying.iter().map(|e| e.amount_to_include).sum(),
        total_ordinary_income: qualifying.iter().map(|e| e.ordinary_income_portion).sum(),
        total_qualified_dividends: qualifying
            .iter()
            .map(|e| e.qualified_dividends_portion)
            .sum(),
        total_capital_gains: qualifying.iter().map(|e| e.capital_gains_portion).sum(),
        total_child_tax: qualifying.iter().map(|e| e.child_tax).sum(),
        children: elections,
    };
    result
}

/// Estimate of the child's tax filing separately (Form 8615 shape) at the
/// parents' marginal rate, for the election comparison.
pub fn compare_with_separate_filing(
    children: &[ChildIncome],
    parent_marginal_rate: Decimal,
    table: &YearTable,
) -> (Money, Money, &'static str) {
    let election = compute(children, table);
    let election_tax = election.total_child_tax
        + election.total_to_include.mul_rate(parent_marginal_rate);

    let base = Money::new(table.kiddie_base_amount);
    let second = Money::new(table.kiddie_second_tier);
    let mut separate_tax = Money::ZERO;
    for child in children.iter().filter(|c| c.qualifies(table)) {
        let gross = child.gross_income();
        let at_ten = gross.saturating_sub(base).min(second);
        let at_parent = gross.saturating_sub(base + second);
        separate_tax +=
            at_ten.mul_rate(dec!(0.10)) + at_parent.mul_rate(parent_marginal_rate);
    }

    let election_tax = election_tax.round_to_cents();
    let separate_tax = separate_tax.round_to_cents();
    let recommendation = if election_tax <= separate_tax {
        "form_8814"
    } else {
        "file_separately"
    };
    (election_tax, separate_tax, recommendation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> YearTable {
        YearTable::year_2025()
    }

    fn child(interest: i64, dividends: i64, qualified: i64, gains: i64) -> ChildIncome {
        ChildIncome {
            child_name: "Kid".into(),
            child_age: 12,
            is_full_time_student: false,
            taxable_interest: Money::from_dollars(interest),
            tax_exempt_interest: Money::ZERO,
            ordinary_dividends: Money::from_dollars(dividends),
            qualified_dividends: Money::from_dollars(qualified),
            capital_gain_distributions: Money::from_dollars(gains),
            alaska_pfd: Money::ZERO,
            federal_tax_withheld: Money::ZERO,
            made_estimated_payments: false,
        }
    }

    #[test]
    fn tiers_apply_in_order() {
        // 4,000 gross: 1,300 excluded, 1,300 at 10%, 1,400 included.
        let r = compute(&[child(4_000, 0, 0, 0)], &table());
        let e = &r.children[0];
        assert!(e.qualifies);
        assert_eq!(e.child_tax, Money::from_dollars(130));
        assert_eq!(e.amount_to_include, Money::from_dollars(1_400));
        assert_eq!(e.ordinary_income_portion, Money::from_dollars(1_400));
    }

    #[test]
    fn income_below_first_tier_is_free() {
        let r = compute(&[child(1_200, 0, 0, 0)], &table());
        let e = &r.children[0];
        assert_eq!(e.child_tax, Money::ZERO);
        assert_eq!(e.amount_to_include, Money::ZERO);
    }

    #[test]
    fn second_tier_partially_used() {
        // 2,000 gross: 700 at 10%.
        let r = compute(&[child(2_000, 0, 0, 0)], &table());
        assert_eq!(r.children[0].child_tax, Money::from_dollars(70));
        assert_eq!(r.children[0].amount_to_include, Money::ZERO);
    }

    #[test]
    fn included_amount_keeps_character() {
        // 5,200 gross, half qualified dividends, quarter cap gains.
        let r = compute(&[child(1_300, 2_600, 2_600, 1_300)], &table());
        let e = &r.children[0];
        assert_eq!(e.gross_income, Money::from_dollars(5_200));
        assert_eq!(e.amount_to_include, Money::from_dollars(2_600));
        assert_eq!(e.qualified_dividends_portion, Money::from_dollars(1_300));
        assert_eq!(e.capital_gains_portion, Money::from_dollars(650));
        assert_eq!(e.ordinary_income_portion, Money::from_dollars(650));
    }

    #[test]
    fn age_limit_without_student_status() {
        let mut c = child(3_000, 0, 0, 0);
        c.child_age = 19;
        assert!(!c.qualifies(&table()));
        c.is_full_time_student = true;
        assert!(c.qualifies(&table()));
        c.child_age = 24;
        assert!(!c.qualifies(&table()));
    }

    #[test]
    fn income_limit_blocks_election() {
        let c = child(12_500, 0, 0, 0);
        assert!(!c.qualifies(&table()));
        let c2 = child(12_499, 0, 0, 0);
        assert!(c2.qualifies(&table()));
    }

    #[test]
    fn withholding_blocks_election() {
        let mut c = child(3_000, 0, 0, 0);
        c.federal_tax_withheld = Money::from_dollars(50);
        assert!(!c.qualifies(&table()));
    }

    #[test]
    fn totals_cover_only_qualifying_children() {
        let mut too_old = child(3_000, 0, 0, 0);
        too_old.child_age = 20;
        let r = compute(&[child(4_000, 0, 0, 0), too_old], &table());
        assert_eq!(r.qualifying_children, 1);
        assert_eq!(r.total_to_include, Money::from_dollars(1_400));
    }

    #[test]
    fn comparison_recommends_cheaper_path() {
        let kids = [child(4_000, 0, 0, 0)];
        let (election, separate, rec) =
            compare_with_separate_filing(&kids, dec!(0.24), &table());
        // Equal at the margin here: both tax 1,400 at 24% plus 130.
        assert_eq!(election, separate);
        assert_eq!(rec, "form_8814");
    }
}
