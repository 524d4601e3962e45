//! Storage boundary for versions and audit entries.
//!
//! Any engine can implement [`VersionStorage`]; the contract it must
//! honor is the uniqueness of (report_id, version_number, tenant_id) on
//! insert. The in-memory engine here is the reference implementation and
//! the test double.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use taxcalc_core::{TaxError, TaxResult};

use crate::version::{AuditEntry, ReportVersion};

/// Abstract storage for report versions and the audit trail.
///
/// Implementations must enforce UNIQUE(report_id, version_number,
/// tenant_id): a conflicting insert fails with
/// [`TaxError::AlreadyExists`] and exactly one of two concurrent writers
/// for the same key succeeds.
pub trait VersionStorage: Send + Sync {
    /// Insert a version. Fails with `AlreadyExists` on a key conflict.
    fn insert_version(&self, version: &ReportVersion) -> TaxResult<()>;

    fn get_version(&self, version_id: &Uuid, tenant_id: Option<&str>)
        -> TaxResult<Option<ReportVersion>>;

    fn get_latest_version(
        &self,
        report_id: &str,
        tenant_id: &str,
    ) -> TaxResult<Option<ReportVersion>>;

    /// All versions for a report ascending by version_number.
    fn get_version_history(&self, report_id: &str, tenant_id: &str)
        -> TaxResult<Vec<ReportVersion>>;

    /// Append an audit entry. Causally after the version insert it
    /// refers to.
    fn insert_audit(&self, entry: &AuditEntry) -> TaxResult<()>;

    /// Audit entries for a report, timestamp descending, limited.
    fn get_audit_trail(
        &self,
        report_id: &str,
        tenant_id: &str,
        limit: usize,
    ) -> TaxResult<Vec<AuditEntry>>;
}

#[derive(Default)]
struct MemoryInner {
    versions: Vec<ReportVersion>,
    /// (report_id, version_number, tenant_id) -> index into versions.
    unique_index: HashMap<(String, u32, String), usize>,
    audit: Vec<AuditEntry>,
}

/// In-memory storage engine.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionStorage for MemoryStorage {
    fn insert_version(&self, version: &ReportVersion) -> TaxResult<()> {
        let mut inner = self.inner.lock().expect("storage lock poisoned");
        let key = (
            version.report_id.clone(),
            version.version_number,
            version.tenant_id.clone(),
        );
        if inner.unique_index.contains_key(&key) {
            return Err(TaxError::already_exists(format!(
                "version {} of report {} for tenant {}",
                version.version_number, version.report_id, version.tenant_id
            )));
        }
        let index = inner.versions.len();
        inner.versions.push(version.clone());
        inner.unique_index.insert(key, index);
        Ok(())
    }

    fn get_version(
        &self,
        version_id: &Uuid,
        tenant_id: Option<&str>,
    ) -> TaxResult<Option<ReportVersion>> {
        let inner = self.inner.lock().expect("storage lock poisoned");
        Ok(inner
            .versions
            .iter()
            .find(|v| {
                v.version_id == *version_id
                    && tenant_id.map_or(true, |t| v.tenant_id == t)
            })
            .cloned())
    }

    fn get_latest_version(
        &self,
        report_id: &str,
        tenant_id: &str,
    ) -> TaxResult<Option<ReportVersion>> {
        let inner = self.inner.lock().expect("storage lock poisoned");
        Ok(inner
            .versions
            .iter()
            .filter(|v| v.report_id == report_id && v.tenant_id == tenant_id)
            .max_by_key(|v| v.version_number)
            .cloned())
    }

    fn get_version_history(
        &self,
        report_id: &str,
        tenant_id: &str,
    ) -> TaxResult<Vec<ReportVersion>> {
        let inner = self.inner.lock().expect("storage lock poisoned");
        let mut versions: Vec<ReportVersion> = inner
            .versions
            .iter()
            .filter(|v| v.report_id == report_id && v.tenant_id == tenant_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    fn insert_audit(&self, entry: &AuditEntry) -> TaxResult<()> {
        let mut inner = self.inner.lock().expect("storage lock poisoned");
        inner.audit.push(entry.clone());
        Ok(())
    }

    fn get_audit_trail(
        &self,
        report_id: &str,
        tenant_id: &str,
        limit: usize,
    ) -> TaxResult<Vec<AuditEntry>> {
        let inner = self.inner.lock().expect("storage lock poisoned");
        let mut entries: Vec<AuditEntry> = inner
            .audit
            .iter()
            .filter(|e| e.report_id == report_id && e.tenant_id == tenant_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}
