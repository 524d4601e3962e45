//! Form 982 - Reduction of Tax Attributes Due to Discharge of
//! Indebtedness.
//!
//! Each exclusion type caps the excludable COD income differently;
//! bankruptcy and insolvency then reduce tax attributes in statutory
//! order (NOL, general business credit at $3 of COD per $1 of credit, net
//! capital loss, basis, passive losses/credits, FTC carryover). QPRI
//! bypasses the ordering and reduces residence basis only, never below
//! secured liabilities.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use taxcalc_core::{Money, TaxError, TaxResult};

/// COD exclusion type (Form 982 Part I checkboxes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionType {
    None,
    Bankruptcy,
    Insolvency,
    QualifiedFarm,
    QualifiedRealPropertyBusiness,
    QualifiedPrincipalResidence,
    Other,
}

/// Insolvency worksheet: assets and liabilities immediately before the
/// discharge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsolvencyWorksheet {
    pub total_assets: Money,
    pub total_liabilities: Money,
}

impl InsolvencyWorksheet {
    pub fn is_insolvent(&self) -> bool {
        self.total_liabilities > self.total_assets
    }

    /// max(0, liabilities - assets).
    pub fn insolvency_amount(&self) -> Money {
        self.total_liabilities.saturating_sub(self.total_assets)
    }
}

/// Tax attributes available for reduction, in statutory order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxAttributes {
    #[serde(default)]
    pub nol_carryover: Money,
    #[serde(default)]
    pub general_business_credit: Money,
    #[serde(default)]
    pub net_capital_loss: Money,
    #[serde(default)]
    pub property_basis: Money,
    #[serde(default)]
    pub passive_activity_losses: Money,
    #[serde(default)]
    pub passive_activity_credits: Money,
    #[serde(default)]
    pub ftc_carryover: Money,
}

/// Which attribute a reduction hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    NetOperatingLoss,
    GeneralBusinessCredit,
    NetCapitalLoss,
    Basis,
    PassiveActivityLosses,
    PassiveActivityCredits,
    ForeignTaxCreditCarryover,
}

impl AttributeKind {
    /// Credits absorb $3 of excluded COD per $1 of credit reduced.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            Self::GeneralBusinessCredit
                | Self::PassiveActivityCredits
                | Self::ForeignTaxCreditCarryover
        )
    }
}

/// One attribute reduction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeReduction {
    pub kind: AttributeKind,
    pub beginning_balance: Money,
    /// Amount of the attribute reduced (credit dollars for credits).
    pub reduction: Money,
    /// COD income absorbed by this step.
    pub cod_absorbed: Money,
}

impl AttributeReduction {
    pub fn ending_balance(&self) -> Money {
        self.beginning_balance - self.reduction
    }
}

/// Inputs for the residence-basis path (QPRI).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidenceBasis {
    pub adjusted_basis: Money,
    /// Floor: basis cannot drop below remaining secured debt.
    #[serde(default)]
    pub secured_liabilities: Money,
}

/// Inputs to the exclusion computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form982Input {
    pub total_cod_income: Money,
    pub exclusion_type: ExclusionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insolvency: Option<InsolvencyWorksheet>,
    #[serde(default)]
    pub attributes: TaxAttributes,
    /// Basis of qualifying property for the QRPBI cap.
    #[serde(default)]
    pub qualifying_property_basis: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residence: Option<ResidenceBasis>,
    /// Explicit request to reduce non-basis attributes; invalid under
    /// QPRI.
    #[serde(default)]
    pub request_attribute_reduction: bool,
}

/// Complete Form 982 result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form982Result {
    pub exclusion_type: ExclusionType,
    pub maximum_exclusion: Money,
    pub excluded_amount: Money,
    pub taxable_cod_income: Money,
    pub attribute_reductions: Vec<AttributeReduction>,
    /// QPRI only: residence basis after reduction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residence_basis_after: Option<Money>,
}

const QPRI_CAP: i64 = 750_000;

fn maximum_exclusion(input: &Form982Input) -> Money {
    match input.exclusion_type {
        ExclusionType::None | ExclusionType::Other => Money::ZERO,
        ExclusionType::Bankruptcy => input.total_cod_income,
        ExclusionType::Insolvency => input
            .insolvency
            .as_ref()
            .map(|w| w.insolvency_amount())
            .unwrap_or(Money::ZERO),
        ExclusionType::QualifiedFarm => input.total_cod_income,
        ExclusionType::QualifiedRealPropertyBusiness => input.qualifying_property_basis,
        ExclusionType::QualifiedPrincipalResidence => Money::from_dollars(QPRI_CAP),
    }
}

/// Reduce attributes in statutory order until `excluded` COD is absorbed.
fn reduce_attributes(attributes: &TaxAttributes, excluded: Money) -> Vec<AttributeReduction> {
    let order: [(AttributeKind, Money); 7] = [
        (AttributeKind::NetOperatingLoss, attributes.nol_carryover),
        (
            AttributeKind::GeneralBusinessCredit,
            attributes.general_business_credit,
        ),
        (AttributeKind::NetCapitalLoss, attributes.net_capital_loss),
        (AttributeKind::Basis, attributes.property_basis),
        (
            AttributeKind::PassiveActivityLosses,
            attributes.passive_activity_losses,
        ),
        (
            AttributeKind::PassiveActivityCredits,
            attributes.passive_activity_credits,
        ),
        (
            AttributeKind::ForeignTaxCreditCarryover,
            attributes.ftc_carryover,
        ),
    ];

    let mut remaining = excluded;
    let mut reductions = Vec::new();
    for (kind, balance) in order {
        if remaining.is_zero() {
            break;
        }
        if balance.is_zero() {
            continue;
        }
        let (reduction, absorbed) = if kind.is_credit() {
            // $1 of credit absorbs $3 of COD.
            let credit_needed = remaining.mul_rate(dec!(1) / dec!(3));
            let reduction = credit_needed.min(balance).round_to_cents();
            (reduction, reduction.mul_rate(dec!(3)).min(remaining))
        } else {
            let reduction = remaining.min(balance);
            (reduction, reduction)
        };
        remaining -= absorbed;
        reductions.push(AttributeReduction {
            kind,
            beginning_balance: balance,
            reduction,
            cod_absorbed: absorbed,
        });
    }
    reductions
}

/// Compute the exclusion and attribute reductions.
pub fn compute(input: &Form982Input) -> TaxResult<Form982Result> {
    if input.exclusion_type == ExclusionType::QualifiedPrincipalResidence
        && input.request_attribute_reduction
    {
        return Err(TaxError::invalid_input(
            "request_attribute_reduction",
            "qualified principal residence exclusion reduces residence basis only",
        ));
    }

    let maximum = maximum_exclusion(input);
    let excluded = input.total_cod_income.min(maximum);
    let taxable = input.total_cod_income - excluded;

    let (attribute_reductions, residence_basis_after) = match input.exclusion_type {
        ExclusionType::QualifiedPrincipalResidence => {
            let residence = input.residence.clone().unwrap_or_default();
            let floor = residence.secured_liabilities;
            let max_reduction = residence.adjusted_basis.saturating_sub(floor);
            let reduction = excluded.min(max_reduction);
            (
                Vec::new(),
                Some(residence.adjusted_basis - reduction),
            )
        }
        ExclusionType::Bankruptcy | ExclusionType::Insolvency | ExclusionType::QualifiedFarm => {
            (reduce_attributes(&input.attributes, excluded), None)
        }
        ExclusionType::QualifiedRealPropertyBusiness => {
            // Reduces basis of the qualifying property.
            let reduction = excluded.min(input.qualifying_property_basis);
            (
                vec![AttributeReduction {
                    kind: AttributeKind::Basis,
                    beginning_balance: input.qualifying_property_basis,
                    reduction,
                    cod_absorbed: reduction,
                }],
                None,
            )
        }
        ExclusionType::None | ExclusionType::Other => (Vec::new(), None),
    };

    Ok(Form982Result {
        exclusion_type: input.exclusion_type,
        maximum_exclusion: maximum,
        excluded_amount: excluded,
        taxable_cod_income: taxable,
        attribute_reductions,
        residence_basis_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(cod: i64, exclusion: ExclusionType) -> Form982Input {
        Form982Input {
            total_cod_income: Money::from_dollars(cod),
            exclusion_type: exclusion,
            insolvency: None,
            attributes: TaxAttributes::default(),
            qualifying_property_basis: Money::ZERO,
            residence: None,
            request_attribute_reduction: false,
        }
    }

    #[test]
    fn bankruptcy_excludes_everything() {
        let r = compute(&input(100_000, ExclusionType::Bankruptcy)).unwrap();
        assert_eq!(r.excluded_amount, Money::from_dollars(100_000));
        assert_eq!(r.taxable_cod_income, Money::ZERO);
    }

    #[test]
    fn insolvency_caps_exclusion() {
        let mut i = input(50_000, ExclusionType::Insolvency);
        i.insolvency = Some(InsolvencyWorksheet {
            total_assets: Money::from_dollars(120_000),
            total_liabilities: Money::from_dollars(140_000),
        });
        let r = compute(&i).unwrap();
        assert_eq!(r.maximum_exclusion, Money::from_dollars(20_000));
        assert_eq!(r.excluded_amount, Money::from_dollars(20_000));
        assert_eq!(r.taxable_cod_income, Money::from_dollars(30_000));
    }

    #[test]
    fn exactly_solvent_excludes_nothing() {
        let mut i = input(30_000, ExclusionType::Insolvency);
        i.insolvency = Some(InsolvencyWorksheet {
            total_assets: Money::from_dollars(100_000),
            total_liabilities: Money::from_dollars(100_000),
        });
        let r = compute(&i).unwrap();
        assert!(!i.insolvency.unwrap().is_insolvent());
        assert_eq!(r.excluded_amount, Money::ZERO);
        assert_eq!(r.taxable_cod_income, Money::from_dollars(30_000));
    }

    #[test]
    fn cod_less_than_insolvency_fully_excluded() {
        let mut i = input(30_000, ExclusionType::Insolvency);
        i.insolvency = Some(InsolvencyWorksheet {
            total_assets: Money::from_dollars(100_000),
            total_liabilities: Money::from_dollars(150_000),
        });
        let r = compute(&i).unwrap();
        assert_eq!(r.excluded_amount, Money::from_dollars(30_000));
        assert_eq!(r.taxable_cod_income, Money::ZERO);
    }

    #[test]
    fn attribute_order_nol_then_credit_then_capital_loss_then_basis() {
        let mut i = input(100_000, ExclusionType::Bankruptcy);
        i.attributes = TaxAttributes {
            nol_carryover: Money::from_dollars(20_000),
            general_business_credit: Money::from_dollars(10_000),
            net_capital_loss: Money::from_dollars(30_000),
            property_basis: Money::from_dollars(50_000),
            ..Default::default()
        };
        let r = compute(&i).unwrap();
        let kinds: Vec<AttributeKind> = r.attribute_reductions.iter().map(|x| x.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AttributeKind::NetOperatingLoss,
                AttributeKind::GeneralBusinessCredit,
                AttributeKind::NetCapitalLoss,
                AttributeKind::Basis,
            ]
        );
        // NOL absorbs 20k; GBC 10k credit absorbs 30k; capital loss 30k;
        // basis absorbs the last 20k.
        assert_eq!(r.attribute_reductions[3].reduction, Money::from_dollars(20_000));
    }

    #[test]
    fn credit_reduces_at_one_third_rate() {
        let mut i = input(30_000, ExclusionType::Bankruptcy);
        i.attributes = TaxAttributes {
            general_business_credit: Money::from_dollars(15_000),
            ..Default::default()
        };
        let r = compute(&i).unwrap();
        let gbc = &r.attribute_reductions[0];
        assert_eq!(gbc.reduction, Money::from_dollars(10_000));
        assert_eq!(gbc.cod_absorbed, Money::from_dollars(30_000));
        assert_eq!(gbc.ending_balance(), Money::from_dollars(5_000));
    }

    #[test]
    fn absorption_total_equals_excluded_when_attributes_suffice() {
        let mut i = input(80_000, ExclusionType::Bankruptcy);
        i.attributes = TaxAttributes {
            nol_carryover: Money::from_dollars(50_000),
            net_capital_loss: Money::from_dollars(20_000),
            property_basis: Money::from_dollars(30_000),
            ..Default::default()
        };
        let r = compute(&i).unwrap();
        let absorbed: Money = r.attribute_reductions.iter().map(|x| x.cod_absorbed).sum();
        assert_eq!(absorbed, Money::from_dollars(80_000));
    }

    #[test]
    fn qpri_caps_at_750k_and_reduces_basis_only() {
        let mut i = input(900_000, ExclusionType::QualifiedPrincipalResidence);
        i.residence = Some(ResidenceBasis {
            adjusted_basis: Money::from_dollars(1_000_000),
            secured_liabilities: Money::from_dollars(400_000),
        });
        let r = compute(&i).unwrap();
        assert_eq!(r.excluded_amount, Money::from_dollars(750_000));
        assert_eq!(r.taxable_cod_income, Money::from_dollars(150_000));
        assert!(r.attribute_reductions.is_empty());
        // Basis floor at secured liabilities: 1,000,000 - 600,000 = 400,000.
        assert_eq!(r.residence_basis_after, Some(Money::from_dollars(400_000)));
    }

    #[test]
    fn qpri_rejects_attribute_reduction_request() {
        let mut i = input(100_000, ExclusionType::QualifiedPrincipalResidence);
        i.request_attribute_reduction = true;
        let err = compute(&i).unwrap_err();
        assert!(matches!(err, TaxError::InvalidInput { .. }));
    }

    #[test]
    fn qrpbi_limited_to_property_basis() {
        let mut i = input(120_000, ExclusionType::QualifiedRealPropertyBusiness);
        i.qualifying_property_basis = Money::from_dollars(80_000);
        let r = compute(&i).unwrap();
        assert_eq!(r.excluded_amount, Money::from_dollars(80_000));
        assert_eq!(r.taxable_cod_income, Money::from_dollars(40_000));
    }

    #[test]
    fn no_exclusion_is_fully_taxable() {
        let r = compute(&input(25_000, ExclusionType::None)).unwrap();
        assert_eq!(r.excluded_amount, Money::ZERO);
        assert_eq!(r.taxable_cod_income, Money::from_dollars(25_000));
    }
}
