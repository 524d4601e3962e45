//! The report version store: create/update operations, lookups,
//! comparison, and chain verification over a storage engine.

use serde_json::{json, Value};
use uuid::Uuid;

use taxcalc_core::{TaxError, TaxResult};

use crate::diff::{diff_contents, ContentChange};
use crate::storage::VersionStorage;
use crate::version::{AuditContext, AuditEntry, ChangeType, ReportType, ReportVersion};

/// Comparison output for two versions of one report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionComparison {
    pub report_id: String,
    pub version_1: u32,
    pub version_2: u32,
    pub changes: Vec<ContentChange>,
    pub has_changes: bool,
}

/// Chain verification output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChainVerification {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Versioned, audited report store. Generic over the storage engine.
pub struct ReportVersionStore<S: VersionStorage> {
    storage: S,
}

impl<S: VersionStorage> ReportVersionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create a report at version 1. Fails with `AlreadyExists` when the
    /// report already has a first version for this tenant.
    #[allow(clippy::too_many_arguments)]
    pub fn create_report(
        &self,
        report_id: &str,
        report_type: ReportType,
        content: Value,
        tenant_id: &str,
        created_by: &str,
        change_reason: &str,
        snapshot_id: Option<String>,
        audit: &AuditContext,
    ) -> TaxResult<ReportVersion> {
        let version = ReportVersion::new(
            report_id,
            1,
            report_type,
            tenant_id,
            content,
            created_by,
            ChangeType::Created,
            change_reason,
            snapshot_id,
            None,
        );
        self.storage.insert_version(&version)?;
        self.record_audit(
            &version,
            "report_created",
            created_by,
            audit,
            json!({
                "report_type": report_type,
                "change_reason": change_reason,
            }),
        )?;
        tracing::info!(report_id, tenant_id, "report created");
        Ok(version)
    }

    /// Create the next version of an existing report. Fails with
    /// `NotFound` when no prior version exists. Concurrent updaters race
    /// on the storage uniqueness constraint; the loser receives
    /// `AlreadyExists` and should re-read the latest version.
    #[allow(clippy::too_many_arguments)]
    pub fn update_report(
        &self,
        report_id: &str,
        content: Value,
        tenant_id: &str,
        created_by: &str,
        change_type: ChangeType,
        change_reason: &str,
        snapshot_id: Option<String>,
        audit: &AuditContext,
    ) -> TaxResult<ReportVersion> {
        let current = self
            .storage
            .get_latest_version(report_id, tenant_id)?
            .ok_or_else(|| {
                TaxError::not_found(format!("report {report_id} for tenant {tenant_id}"))
            })?;

        let version = ReportVersion::new(
            report_id,
            current.version_number + 1,
            current.report_type,
            tenant_id,
            content,
            created_by,
            change_type,
            change_reason,
            snapshot_id,
            Some(current.version_id),
        );
        self.storage.insert_version(&version)?;
        self.record_audit(
            &version,
            &format!("report_{}", change_type.as_str()),
            created_by,
            audit,
            json!({
                "change_type": change_type,
                "change_reason": change_reason,
                "previous_version": current.version_number,
                "new_version": version.version_number,
            }),
        )?;
        tracing::info!(
            report_id,
            tenant_id,
            version = version.version_number,
            "report updated"
        );
        Ok(version)
    }

    fn record_audit(
        &self,
        version: &ReportVersion,
        action: &str,
        created_by: &str,
        audit: &AuditContext,
        details: Value,
    ) -> TaxResult<()> {
        self.storage.insert_audit(&AuditEntry {
            audit_id: Uuid::new_v4(),
            report_id: version.report_id.clone(),
            version_id: version.version_id,
            tenant_id: version.tenant_id.clone(),
            timestamp: chrono::Utc::now(),
            action: action.to_string(),
            user_id: audit
                .user_id
                .clone()
                .unwrap_or_else(|| created_by.to_string()),
            ip_address: audit.ip_address.clone(),
            user_agent: audit.user_agent.clone(),
            details,
        })
    }

    pub fn get_version(
        &self,
        version_id: &Uuid,
        tenant_id: Option<&str>,
    ) -> TaxResult<Option<ReportVersion>> {
        self.storage.get_version(version_id, tenant_id)
    }

    pub fn get_latest_version(
        &self,
        report_id: &str,
        tenant_id: &str,
    ) -> TaxResult<Option<ReportVersion>> {
        self.storage.get_latest_version(report_id, tenant_id)
    }

    pub fn get_version_history(
        &self,
        report_id: &str,
        tenant_id: &str,
    ) -> TaxResult<Vec<ReportVersion>> {
        self.storage.get_version_history(report_id, tenant_id)
    }

    pub fn get_audit_trail(
        &self,
        report_id: &str,
        tenant_id: &str,
        limit: usize,
    ) -> TaxResult<Vec<AuditEntry>> {
        self.storage.get_audit_trail(report_id, tenant_id, limit)
    }

    /// Structural diff between two versions of the same report.
    pub fn compare_versions(
        &self,
        version_id_1: &Uuid,
        version_id_2: &Uuid,
        tenant_id: Option<&str>,
    ) -> TaxResult<VersionComparison> {
        let v1 = self
            .storage
            .get_version(version_id_1, tenant_id)?
            .ok_or_else(|| TaxError::not_found(format!("version {version_id_1}")))?;
        let v2 = self
            .storage
            .get_version(version_id_2, tenant_id)?
            .ok_or_else(|| TaxError::not_found(format!("version {version_id_2}")))?;
        if v1.report_id != v2.report_id {
            return Err(TaxError::invalid_input(
                "version_id_2",
                "versions belong to different reports",
            ));
        }
        let changes = diff_contents(&v1.content, &v2.content);
        Ok(VersionComparison {
            report_id: v1.report_id,
            version_1: v1.version_number,
            version_2: v2.version_number,
            has_changes: !changes.is_empty(),
            changes,
        })
    }

    /// Verify the whole chain for a report: per-version integrity
    /// hashes, dense version numbers 1..N, and previous-version linkage
    /// with v1 unlinked.
    pub fn verify_chain_integrity(
        &self,
        report_id: &str,
        tenant_id: &str,
    ) -> TaxResult<ChainVerification> {
        let versions = self.storage.get_version_history(report_id, tenant_id)?;
        let mut errors = Vec::new();

        for (i, version) in versions.iter().enumerate() {
            if !version.verify_integrity() {
                errors.push(format!(
                    "version {}: integrity hash mismatch",
                    version.version_number
                ));
            }
            let expected_number = (i + 1) as u32;
            if version.version_number != expected_number {
                errors.push(format!(
                    "version {}: expected version number {}",
                    version.version_number, expected_number
                ));
            }
            if i == 0 {
                if version.previous_version_id.is_some() {
                    errors.push("version 1: must not have a previous version".to_string());
                }
            } else {
                let expected_prev = versions[i - 1].version_id;
                if version.previous_version_id != Some(expected_prev) {
                    errors.push(format!(
                        "version {}: incorrect previous_version_id",
                        version.version_number
                    ));
                }
            }
        }

        Ok(ChainVerification {
            is_valid: errors.is_empty(),
            errors,
        })
    }
}
