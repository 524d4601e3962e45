//! Credits: nonrefundable/refundable collections and WOTC employees.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// WOTC target group, which determines the first-year wage limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WotcTargetGroup {
    TanfRecipient,
    SnapRecipient,
    SsiRecipient,
    VocationalRehab,
    ExFelon,
    DesignatedCommunityResident,
    VeteranSnap,
    VeteranUnemployed6Mo,
    VeteranDisabled,
    VeteranDisabledUnemployed,
    SummerYouth,
    LongTermUnemployed,
    LongTermFamilyAssistance,
}

/// A certified employee for the Work Opportunity Tax Credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WotcEmployee {
    pub name: String,
    pub target_group: WotcTargetGroup,
    pub first_year_wages: Money,
    pub hours_worked: u32,
    /// Form 8850 certification; absence yields zero credit.
    #[serde(default = "default_true")]
    pub has_certification: bool,
    /// Second-year wages for the long-term family assistance group.
    #[serde(default)]
    pub second_year_wages: Money,
    #[serde(default)]
    pub is_second_year: bool,
}

fn default_true() -> bool {
    true
}

/// Credit collections on the return. Computed credits (education, FTC,
/// MTC) are produced by their forms; amounts here are caller-supplied
/// credits that do not have a dedicated form model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub child_tax_credit: Money,
    #[serde(default)]
    pub child_care_credit: Money,
    #[serde(default)]
    pub other_nonrefundable: Money,
    #[serde(default)]
    pub other_refundable: Money,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wotc_employees: Vec<WotcEmployee>,
}

impl Credits {
    pub fn total_nonrefundable(&self) -> Money {
        self.child_tax_credit + self.child_care_credit + self.other_nonrefundable
    }
}
