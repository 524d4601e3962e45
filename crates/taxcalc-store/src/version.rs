//! Report version and audit-entry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use taxcalc_core::{chained_hash, content_hash};

/// Kinds of reports under version control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    TaxReturn,
    RecommendationReport,
    CalculationBreakdown,
    ComparisonReport,
    AuditReport,
    SummaryReport,
    DocumentReceipt,
}

/// Kinds of changes producing a new version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Updated,
    Recalculated,
    Corrected,
    Amended,
    Finalized,
    Exported,
    Archived,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recalculated => "recalculated",
            Self::Corrected => "corrected",
            Self::Amended => "amended",
            Self::Finalized => "finalized",
            Self::Exported => "exported",
            Self::Archived => "archived",
        }
    }
}

/// An immutable version of a report. Never mutated after creation; the
/// store owns these exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVersion {
    pub version_id: Uuid,
    pub report_id: String,
    /// Dense 1..N per (report_id, tenant_id).
    pub version_number: u32,
    pub report_type: ReportType,
    pub tenant_id: String,
    /// Opaque structured payload.
    pub content: Value,
    /// SHA-256 over the normalized content projection.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub change_type: ChangeType,
    pub change_reason: String,
    /// Link to the computation snapshot that produced the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version_id: Option<Uuid>,
    /// SHA-256 over the identity fields and content hash.
    pub integrity_hash: String,
}

/// Integrity hash recipe shared by creation and verification.
pub fn compute_integrity_hash(
    version_id: &Uuid,
    report_id: &str,
    version_number: u32,
    content_hash: &str,
    created_at: &DateTime<Utc>,
) -> String {
    let version_id = version_id.to_string();
    let version_number = version_number.to_string();
    let created_at = created_at.to_rfc3339();
    chained_hash(&[
        &version_id,
        report_id,
        &version_number,
        content_hash,
        &created_at,
    ])
}

impl ReportVersion {
    /// Build a new version, computing both hashes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        report_id: impl Into<String>,
        version_number: u32,
        report_type: ReportType,
        tenant_id: impl Into<String>,
        content: Value,
        created_by: impl Into<String>,
        change_type: ChangeType,
        change_reason: impl Into<String>,
        snapshot_id: Option<String>,
        previous_version_id: Option<Uuid>,
    ) -> Self {
        let version_id = Uuid::new_v4();
        let created_at = Utc::now();
        let report_id = report_id.into();
        let content_hash = content_hash(&content);
        let integrity_hash = compute_integrity_hash(
            &version_id,
            &report_id,
            version_number,
            &content_hash,
            &created_at,
        );
        Self {
            version_id,
            report_id,
            version_number,
            report_type,
            tenant_id: tenant_id.into(),
            content,
            content_hash,
            created_at,
            created_by: created_by.into(),
            change_type,
            change_reason: change_reason.into(),
            snapshot_id,
            previous_version_id,
            integrity_hash,
        }
    }

    /// Recompute both hashes from stored fields and compare.
    pub fn verify_integrity(&self) -> bool {
        if content_hash(&self.content) != self.content_hash {
            return false;
        }
        let expected = compute_integrity_hash(
            &self.version_id,
            &self.report_id,
            self.version_number,
            &self.content_hash,
            &self.created_at,
        );
        expected == self.integrity_hash
    }
}

/// Client identity attached to audit entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditContext {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ip_address: None,
            user_agent: None,
        }
    }
}

/// Append-only record of an action against a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: Uuid,
    pub report_id: String,
    /// Weak reference to the version acted on.
    pub version_id: Uuid,
    pub tenant_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub details: Value,
}
