//! Entity structure optimizer: sole proprietorship vs. single-member LLC
//! vs. S corporation.
//!
//! Runs the three structures in parallel over the same business figures
//! and recommends the lowest total cost, tempered by a 0-100 confidence
//! score. The reasonable-salary heuristic is not a legal safe harbor;
//! every salary analysis carries a risk tier and a methodology string
//! that consumers must surface.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{FilingStatus, Money, YearTable};

/// Business structures compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    SoleProprietorship,
    SingleMemberLlc,
    SCorporation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoleProprietorship => "sole_proprietorship",
            Self::SingleMemberLlc => "single_member_llc",
            Self::SCorporation => "s_corporation",
        }
    }
}

/// IRS challenge risk for a salary level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Reasonable-salary heuristic output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonableSalaryAnalysis {
    pub recommended_salary: Money,
    pub salary_range_low: Money,
    pub salary_range_high: Money,
    pub irs_risk_level: RiskTier,
    pub methodology: String,
    pub factors_considered: Vec<String>,
}

/// One structure's numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAnalysis {
    pub entity_type: EntityType,
    pub net_income: Money,
    pub self_employment_tax: Money,
    pub se_tax_deduction: Money,
    /// Combined employee + employer payroll taxes (S corp only).
    pub payroll_taxes: Money,
    pub reasonable_salary: Money,
    pub k1_distribution: Money,
    pub qbi_deduction: Money,
    pub federal_income_tax: Money,
    pub formation_cost: Money,
    pub annual_compliance_cost: Money,
    pub payroll_service_cost: Money,
    /// Income tax + SE/payroll taxes + annual compliance.
    pub total_tax: Money,
}

/// Comparison output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityComparisonResult {
    pub analyses: Vec<EntityAnalysis>,
    pub recommended_entity: EntityType,
    pub recommendation_reason: String,
    /// 0-100.
    pub confidence_score: u8,
    pub max_annual_savings: Money,
    /// Revenue at which S corp savings cover its incremental compliance
    /// cost.
    pub breakeven_revenue: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_analysis: Option<ReasonableSalaryAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_entity: Option<EntityType>,
    pub savings_vs_current: Money,
    pub warnings: Vec<String>,
}

impl EntityComparisonResult {
    pub fn analysis(&self, entity: EntityType) -> Option<&EntityAnalysis> {
        self.analyses.iter().find(|a| a.entity_type == entity)
    }
}

/// Inputs and context for a comparison run.
#[derive(Debug, Clone)]
pub struct EntityOptimizer {
    pub filing_status: FilingStatus,
    pub state: Option<String>,
    /// Household income outside the business, stacked under the brackets.
    pub other_income: Money,
    pub is_sstb: bool,
    table: YearTable,
}

// Compliance cost assumptions, annual unless noted.
const LLC_FORMATION: i64 = 500;
const LLC_ANNUAL: i64 = 800;
const SCORP_FORMATION: i64 = 800;
const SCORP_ANNUAL: i64 = 1_500;
const SCORP_PAYROLL_SERVICE: i64 = 600;
const SOLE_PROP_ANNUAL: i64 = 150;

impl EntityOptimizer {
    pub fn new(filing_status: FilingStatus, table: YearTable) -> Self {
        Self {
            filing_status,
            state: None,
            other_income: Money::ZERO,
            is_sstb: false,
            table,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_other_income(mut self, other_income: Money) -> Self {
        self.other_income = other_income;
        self
    }

    pub fn with_sstb(mut self, is_sstb: bool) -> Self {
        self.is_sstb = is_sstb;
        self
    }

    /// Salary ratio declines as net income grows: roughly 65-75% at low
    /// income down to about 50% at high income.
    fn salary_ratio(net: Money) -> Decimal {
        let n = net.as_decimal();
        let points = [
            (dec!(50_000), dec!(0.72)),
            (dec!(100_000), dec!(0.60)),
            (dec!(200_000), dec!(0.55)),
            (dec!(300_000), dec!(0.50)),
        ];
        if n <= points[0].0 {
            return points[0].1;
        }
        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if n <= x1 {
                let t = (n - x0) / (x1 - x0);
                return y0 + (y1 - y0) * t;
            }
        }
        points[3].1
    }

    /// Reasonable-salary heuristic for an S corp owner-operator.
    pub fn calculate_reasonable_salary(
        &self,
        net_income: Money,
        fixed_salary: Option<Money>,
    ) -> ReasonableSalaryAnalysis {
        if let Some(salary) = fixed_salary {
            let ratio = if net_income.is_positive() {
                salary.as_decimal() / net_income.as_decimal()
            } else {
                Decimal::ONE
            };
            return ReasonableSalaryAnalysis {
                recommended_salary: salary,
                salary_range_low: salary.mul_rate(dec!(0.9)).round_to_dollar(),
                salary_range_high: salary.mul_rate(dec!(1.1)).round_to_dollar(),
                irs_risk_level: Self::risk_for_ratio(ratio),
                methodology: "User-specified salary, checked against the income-ratio heuristic"
                    .into(),
                factors_considered: vec!["owner-specified amount".into()],
            };
        }

        let ratio = Self::salary_ratio(net_income);
        let recommended = net_income.mul_rate(ratio).round_to_dollar();
        ReasonableSalaryAnalysis {
            recommended_salary: recommended,
            salary_range_low: net_income.mul_rate(ratio - dec!(0.10)).round_to_dollar(),
            salary_range_high: net_income
                .mul_rate((ratio + dec!(0.10)).min(Decimal::ONE))
                .round_to_dollar(),
            irs_risk_level: Self::risk_for_ratio(ratio),
            methodology: format!(
                "Declining percentage of net income ({}% at this income level); not a legal safe harbor",
                (ratio * dec!(100)).round_dp(0)
            ),
            factors_considered: vec![
                "net business income".into(),
                "typical owner-operator compensation share".into(),
                "payroll tax base".into(),
            ],
        }
    }

    fn risk_for_ratio(ratio: Decimal) -> RiskTier {
        if ratio >= dec!(0.60) {
            RiskTier::Low
        } else if ratio >= dec!(0.40) {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    /// SE tax on net self-employment income, with the Social Security
    /// wage base cap.
    fn se_tax(&self, net: Money) -> Money {
        let base = net.mul_rate(self.table.se_net_earnings_factor);
        if base.as_decimal() <= Decimal::ZERO {
            return Money::ZERO;
        }
        let oasdi = base
            .min(Money::new(self.table.ss_wage_base))
            .mul_rate(self.table.oasdi_rate);
        let medicare = base.mul_rate(self.table.medicare_rate);
        oasdi + medicare
    }

    /// Combined employee+employer payroll tax on an S corp salary.
    fn payroll_tax(&self, salary: Money) -> Money {
        let oasdi = salary
            .min(Money::new(self.table.ss_wage_base))
            .mul_rate(self.table.oasdi_rate);
        let medicare = salary.mul_rate(self.table.medicare_rate);
        oasdi + medicare
    }

    fn income_tax(&self, taxable: Money) -> Money {
        self.table
            .ordinary_tax(self.filing_status, taxable.floor_zero())
    }

    fn qbi_deduction(&self, qbi_base: Money, taxable_before_qbi: Money) -> Money {
        let tentative = qbi_base.floor_zero().mul_rate(self.table.qbi_deduction_rate);
        // Taxable-income cap.
        let cap = taxable_before_qbi
            .floor_zero()
            .mul_rate(self.table.qbi_deduction_rate);
        tentative.min(cap)
    }

    fn analyze_pass_through(&self, entity: EntityType, net: Money) -> EntityAnalysis {
        let se_tax = self.se_tax(net);
        let se_deduction = se_tax.mul_rate(dec!(0.5));
        let standard_deduction = self.table.standard_deduction(self.filing_status);
        let taxable_before_qbi =
            (net + self.other_income - se_deduction - standard_deduction).floor_zero();
        let qbi = self.qbi_deduction(net - se_deduction, taxable_before_qbi);
        let income_tax = self.income_tax(taxable_before_qbi - qbi);

        let (formation, annual) = match entity {
            EntityType::SingleMemberLlc => (
                Money::from_dollars(LLC_FORMATION),
                Money::from_dollars(LLC_ANNUAL),
            ),
            _ => (Money::ZERO, Money::from_dollars(SOLE_PROP_ANNUAL)),
        };

        EntityAnalysis {
            entity_type: entity,
            net_income: net,
            self_employment_tax: se_tax.round_to_cents(),
            se_tax_deduction: se_deduction.round_to_cents(),
            payroll_taxes: Money::ZERO,
            reasonable_salary: Money::ZERO,
            k1_distribution: Money::ZERO,
            qbi_deduction: qbi.round_to_cents(),
            federal_income_tax: income_tax.round_to_cents(),
            formation_cost: formation,
            annual_compliance_cost: annual,
            payroll_service_cost: Money::ZERO,
            total_tax: (income_tax + se_tax + annual).round_to_cents(),
        }
    }

    fn analyze_s_corp(&self, net: Money, salary: Money) -> EntityAnalysis {
        let payroll = self.payroll_tax(salary);
        let employer_share = payroll.mul_rate(dec!(0.5));
        let k1 = (net - salary - employer_share).floor_zero();
        let standard_deduction = self.table.standard_deduction(self.filing_status);
        let taxable_before_qbi =
            (salary + k1 + self.other_income - standard_deduction).floor_zero();
        // QBI applies to the K-1 distribution only, never the salary.
        let qbi = self.qbi_deduction(k1, taxable_before_qbi);
        let income_tax = self.income_tax(taxable_before_qbi - qbi);

        let annual = Money::from_dollars(SCORP_ANNUAL);
        let payroll_service = Money::from_dollars(SCORP_PAYROLL_SERVICE);

        EntityAnalysis {
            entity_type: EntityType::SCorporation,
            net_income: net,
            self_employment_tax: Money::ZERO,
            se_tax_deduction: Money::ZERO,
            payroll_taxes: payroll.round_to_cents(),
            reasonable_salary: salary,
            k1_distribution: k1.round_to_cents(),
            qbi_deduction: qbi.round_to_cents(),
            federal_income_tax: income_tax.round_to_cents(),
            formation_cost: Money::from_dollars(SCORP_FORMATION),
            annual_compliance_cost: annual,
            payroll_service_cost: payroll_service,
            total_tax: (income_tax + payroll + annual + payroll_service).round_to_cents(),
        }
    }

    /// Revenue at which S corp SE-tax savings cover the incremental
    /// compliance cost.
    fn breakeven_revenue(&self, expenses: Money, salary_ratio: Decimal) -> Money {
        let incremental_cost = Money::from_dollars(SCORP_ANNUAL + SCORP_PAYROLL_SERVICE)
            - Money::from_dollars(SOLE_PROP_ANNUAL);
        let savings_rate =
            self.table.se_tax_rate * self.table.se_net_earnings_factor * (Decimal::ONE - salary_ratio);
        if savings_rate <= Decimal::ZERO {
            return expenses;
        }
        let breakeven_net = Money::new(incremental_cost.as_decimal() / savings_rate);
        (breakeven_net + expenses).round_to_dollar()
    }

    /// Run the three-way comparison.
    pub fn compare(
        &self,
        gross_revenue: Money,
        business_expenses: Money,
        current_entity: Option<EntityType>,
    ) -> EntityComparisonResult {
        let net = gross_revenue - business_expenses;
        let mut warnings = Vec::new();

        if !net.is_positive() {
            let analyses = vec![
                self.analyze_pass_through(EntityType::SoleProprietorship, net.floor_zero()),
                self.analyze_pass_through(EntityType::SingleMemberLlc, net.floor_zero()),
                self.analyze_s_corp(net.floor_zero(), Money::ZERO),
            ];
            return EntityComparisonResult {
                analyses,
                recommended_entity: EntityType::SoleProprietorship,
                recommendation_reason:
                    "The business has no net income; restructuring cannot reduce tax until profitability improves"
                        .into(),
                confidence_score: 90,
                max_annual_savings: Money::ZERO,
                breakeven_revenue: self.breakeven_revenue(business_expenses, dec!(0.6)),
                salary_analysis: None,
                current_entity,
                savings_vs_current: Money::ZERO,
                warnings,
            };
        }

        let salary_analysis = self.calculate_reasonable_salary(net, None);
        let analyses = vec![
            self.analyze_pass_through(EntityType::SoleProprietorship, net),
            self.analyze_pass_through(EntityType::SingleMemberLlc, net),
            self.analyze_s_corp(net, salary_analysis.recommended_salary),
        ];

        let max_tax = analyses.iter().map(|a| a.total_tax).fold(Money::ZERO, Money::max);
        let min_tax = analyses
            .iter()
            .map(|a| a.total_tax)
            .fold(max_tax, Money::min);
        let max_annual_savings = max_tax - min_tax;

        // Lowest total cost wins, but S corp is not recommended at low
        // income where the compliance overhead dominates.
        let low_income = net < Money::from_dollars(40_000);
        let mut best = analyses
            .iter()
            .min_by(|a, b| a.total_tax.as_decimal().cmp(&b.total_tax.as_decimal()))
            .map(|a| a.entity_type)
            .unwrap_or(EntityType::SoleProprietorship);
        if low_income && best == EntityType::SCorporation {
            best = EntityType::SoleProprietorship;
            warnings.push(
                "S corporation overhead usually outweighs savings below $40,000 of net income"
                    .to_string(),
            );
        }

        if self.is_sstb {
            warnings.push(
                "Specified service trade or business: the QBI deduction phases out at higher incomes"
                    .to_string(),
            );
        }
        if let Some(state) = &self.state {
            warnings.push(format!(
                "State {state} may impose entity-level taxes or fees not reflected in the federal comparison"
            ));
        }

        // Confidence: spread between options relative to total tax,
        // dampened near the low-income boundary.
        let spread_ratio = if min_tax.is_positive() {
            (max_annual_savings.as_decimal() / min_tax.as_decimal()).min(Decimal::ONE)
        } else {
            Decimal::ZERO
        };
        let mut confidence = dec!(50) + spread_ratio * dec!(45);
        if low_income {
            confidence -= dec!(10);
        }
        if self.is_sstb {
            confidence -= dec!(10);
        }
        let confidence_score = confidence
            .round_dp(0)
            .clamp(dec!(0), dec!(100))
            .to_u8()
            .unwrap_or(0);

        let savings_vs_current = current_entity
            .and_then(|c| analyses.iter().find(|a| a.entity_type == c))
            .map(|current| {
                let best_tax = analyses
                    .iter()
                    .find(|a| a.entity_type == best)
                    .map(|a| a.total_tax)
                    .unwrap_or(current.total_tax);
                current.total_tax.saturating_sub(best_tax)
            })
            .unwrap_or(Money::ZERO);

        let reason = match best {
            EntityType::SCorporation => format!(
                "S corporation election saves {max_annual_savings} per year over the most expensive structure by moving distributions out of the payroll tax base"
            ),
            EntityType::SingleMemberLlc => {
                "Single-member LLC offers liability protection at the same federal tax cost".into()
            }
            EntityType::SoleProprietorship => {
                "Sole proprietorship minimizes total cost at this income level".into()
            }
        };

        EntityComparisonResult {
            analyses,
            recommended_entity: best,
            recommendation_reason: reason,
            confidence_score,
            max_annual_savings,
            breakeven_revenue: self
                .breakeven_revenue(business_expenses, Self::salary_ratio(net)),
            salary_analysis: Some(salary_analysis),
            current_entity,
            savings_vs_current,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimizer() -> EntityOptimizer {
        EntityOptimizer::new(FilingStatus::Single, YearTable::year_2025())
    }

    #[test]
    fn se_tax_formula_at_70k() {
        // Spec scenario 2: 70,000 x 0.9235 x 0.153 ~= 9,890.
        let opt = optimizer();
        let analysis =
            opt.analyze_pass_through(EntityType::SoleProprietorship, Money::from_dollars(70_000));
        assert_eq!(analysis.self_employment_tax, Money::from_cents(989_069));
        assert_eq!(analysis.se_tax_deduction, Money::from_cents(494_534));
        // Tentative QBI is 20% x (70,000 - 4,945.34) ~= 13,011, but the
        // taxable-income cap binds: 20% x (70,000 - 4,945.34 - 15,750).
        assert_eq!(analysis.qbi_deduction, Money::from_cents(986_093));
    }

    #[test]
    fn se_tax_caps_oasdi_at_wage_base() {
        let opt = optimizer();
        let uncapped =
            opt.analyze_pass_through(EntityType::SoleProprietorship, Money::from_dollars(150_000));
        let capped =
            opt.analyze_pass_through(EntityType::SoleProprietorship, Money::from_dollars(400_000));
        // Above the base only medicare keeps growing.
        let uncapped_rate =
            uncapped.self_employment_tax.as_decimal() / Decimal::new(150_000, 0);
        let capped_rate = capped.self_employment_tax.as_decimal() / Decimal::new(400_000, 0);
        assert!(capped_rate < uncapped_rate);
    }

    #[test]
    fn salary_heuristic_moderate_income() {
        let opt = optimizer();
        let r = opt.calculate_reasonable_salary(Money::from_dollars(100_000), None);
        assert!(r.recommended_salary >= Money::from_dollars(50_000));
        assert!(r.recommended_salary <= Money::from_dollars(70_000));
        assert!(r.salary_range_low < r.recommended_salary);
        assert!(r.salary_range_high > r.recommended_salary);
        assert!(!r.methodology.is_empty());
        assert!(!r.factors_considered.is_empty());
    }

    #[test]
    fn salary_heuristic_low_income_uses_higher_share() {
        let opt = optimizer();
        let r = opt.calculate_reasonable_salary(Money::from_dollars(50_000), None);
        assert!(r.recommended_salary >= Money::from_dollars(35_000));
    }

    #[test]
    fn salary_heuristic_high_income_near_half() {
        let opt = optimizer();
        let r = opt.calculate_reasonable_salary(Money::from_dollars(300_000), None);
        assert!(r.recommended_salary >= Money::from_dollars(140_000));
        assert!(r.recommended_salary <= Money::from_dollars(180_000));
    }

    #[test]
    fn fixed_salary_is_respected() {
        let opt = optimizer();
        let r = opt.calculate_reasonable_salary(
            Money::from_dollars(100_000),
            Some(Money::from_dollars(75_000)),
        );
        assert_eq!(r.recommended_salary, Money::from_dollars(75_000));
        assert!(r.methodology.starts_with("User-specified"));
    }

    #[test]
    fn comparison_covers_all_three_entities() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(150_000),
            Money::from_dollars(30_000),
            None,
        );
        assert_eq!(r.analyses.len(), 3);
        assert!(r.analysis(EntityType::SoleProprietorship).is_some());
        assert!(r.analysis(EntityType::SingleMemberLlc).is_some());
        assert!(r.analysis(EntityType::SCorporation).is_some());
        assert!(r.confidence_score <= 100);
        assert!(!r.recommendation_reason.is_empty());
        assert!(r.breakeven_revenue.is_positive());
        assert!(r.salary_analysis.is_some());
    }

    #[test]
    fn scorp_distribution_escapes_payroll_base() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(300_000),
            Money::from_dollars(50_000),
            None,
        );
        let sole = r.analysis(EntityType::SoleProprietorship).unwrap();
        let scorp = r.analysis(EntityType::SCorporation).unwrap();
        assert!(scorp.payroll_taxes < sole.self_employment_tax);
        assert!(scorp.k1_distribution.is_positive());
        assert_eq!(scorp.self_employment_tax, Money::ZERO);
    }

    #[test]
    fn low_income_never_recommends_scorp() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(35_000),
            Money::from_dollars(5_000),
            None,
        );
        assert_ne!(r.recommended_entity, EntityType::SCorporation);
    }

    #[test]
    fn zero_net_income_recommends_sole_prop() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(20_000),
            Money::from_dollars(25_000),
            None,
        );
        assert_eq!(r.recommended_entity, EntityType::SoleProprietorship);
        assert!(r
            .recommendation_reason
            .to_lowercase()
            .contains("no net income"));
    }

    #[test]
    fn compliance_cost_ordering() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(120_000),
            Money::from_dollars(20_000),
            None,
        );
        let sole = r.analysis(EntityType::SoleProprietorship).unwrap();
        let llc = r.analysis(EntityType::SingleMemberLlc).unwrap();
        let scorp = r.analysis(EntityType::SCorporation).unwrap();
        assert_eq!(sole.formation_cost, Money::ZERO);
        assert!(sole.annual_compliance_cost < Money::from_dollars(500));
        assert!(llc.formation_cost.is_positive());
        assert!(llc.annual_compliance_cost.is_positive());
        assert!(scorp.annual_compliance_cost > sole.annual_compliance_cost);
        assert!(scorp.payroll_service_cost.is_positive());
    }

    #[test]
    fn savings_vs_current_reported() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(300_000),
            Money::from_dollars(50_000),
            Some(EntityType::SoleProprietorship),
        );
        assert_eq!(r.current_entity, Some(EntityType::SoleProprietorship));
        if r.recommended_entity == EntityType::SCorporation {
            assert!(r.savings_vs_current.is_positive());
        }
    }

    #[test]
    fn sstb_and_state_warnings() {
        let opt = optimizer().with_state("CA").with_sstb(true);
        let r = opt.compare(
            Money::from_dollars(200_000),
            Money::from_dollars(40_000),
            None,
        );
        assert!(r.warnings.iter().any(|w| w.contains("CA")));
        assert!(r
            .warnings
            .iter()
            .any(|w| w.to_lowercase().contains("service")));
    }

    #[test]
    fn savings_is_max_minus_min() {
        let opt = optimizer();
        let r = opt.compare(
            Money::from_dollars(250_000),
            Money::from_dollars(50_000),
            None,
        );
        let taxes: Vec<Money> = r.analyses.iter().map(|a| a.total_tax).collect();
        let max = taxes.iter().copied().fold(Money::ZERO, Money::max);
        let min = taxes.iter().copied().fold(max, Money::min);
        assert_eq!(r.max_annual_savings, max - min);
    }
}
