//! Taxpayer identity and filing status.

use serde::{Deserialize, Serialize};

/// Federal filing status.
///
/// Married-filing-separately is subject to the reduced half-exemption rule
/// everywhere a status-dependent threshold appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
    QualifyingWidow,
}

impl FilingStatus {
    pub fn is_married_separate(&self) -> bool {
        matches!(self, Self::MarriedSeparate)
    }

    pub fn is_joint(&self) -> bool {
        matches!(self, Self::MarriedJoint | Self::QualifyingWidow)
    }

    /// Stable tag used in metrics and serialized projections.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::MarriedJoint => "married_joint",
            Self::MarriedSeparate => "married_separate",
            Self::HeadOfHousehold => "head_of_household",
            Self::QualifyingWidow => "qualifying_widow",
        }
    }
}

/// Taxpayer identity and status signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxpayerInfo {
    pub first_name: String,
    pub last_name: String,
    /// Formatted as `NNN-NN-NNNN`.
    pub ssn: String,
    pub filing_status: FilingStatus,
    #[serde(default)]
    pub dependents: u8,
    /// Two-letter state of residence, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Age at the end of the tax year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default)]
    pub is_blind: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_age: Option<u8>,
}

impl TaxpayerInfo {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        ssn: impl Into<String>,
        filing_status: FilingStatus,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ssn: ssn.into(),
            filing_status,
            dependents: 0,
            state: None,
            age: None,
            is_blind: false,
            spouse_age: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_dependents(mut self, dependents: u8) -> Self {
        self.dependents = dependents;
        self
    }

    pub fn with_age(mut self, age: u8) -> Self {
        self.age = Some(age);
        self
    }

    /// 65-or-older signal used by the additional standard deduction.
    pub fn is_65_or_older(&self) -> bool {
        self.age.is_some_and(|a| a >= 65)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tags_are_stable() {
        assert_eq!(FilingStatus::MarriedSeparate.as_str(), "married_separate");
        assert_eq!(FilingStatus::QualifyingWidow.as_str(), "qualifying_widow");
    }

    #[test]
    fn serde_round_trip_uses_snake_case() {
        let json = serde_json::to_string(&FilingStatus::HeadOfHousehold).unwrap();
        assert_eq!(json, "\"head_of_household\"");
        let back: FilingStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FilingStatus::HeadOfHousehold);
    }

    #[test]
    fn age_signals() {
        let tp = TaxpayerInfo::new("A", "B", "000-00-0000", FilingStatus::Single).with_age(65);
        assert!(tp.is_65_or_older());
    }
}
