//! Ordered migration registry for the storage schema.
//!
//! Revisions form a linear chain walked by the admin CLI: `upgrade`
//! applies forward to a target (default head), `downgrade` walks back,
//! `stamp` records a revision without running anything, and `check`
//! reports whether anything is pending. The applied-revision marker
//! persists in a plain state file next to the data.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use taxcalc_core::{TaxError, TaxResult};

/// One schema revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    /// Short stable id, e.g. `0003_add_snapshot_index`.
    pub id: String,
    pub message: String,
    /// Statements or operations applied on upgrade, for display.
    pub upgrade_ops: Vec<String>,
    pub downgrade_ops: Vec<String>,
}

/// The built-in revision chain for the report store schema.
pub fn builtin_revisions() -> Vec<Revision> {
    vec![
        Revision {
            id: "0001_report_versions".into(),
            message: "create report_versions with uniqueness constraint".into(),
            upgrade_ops: vec![
                "CREATE TABLE report_versions (...)".into(),
                "CREATE UNIQUE INDEX uq_report_version ON report_versions(report_id, version_number, tenant_id)".into(),
            ],
            downgrade_ops: vec!["DROP TABLE report_versions".into()],
        },
        Revision {
            id: "0002_report_audit_trail".into(),
            message: "create report_audit_trail".into(),
            upgrade_ops: vec![
                "CREATE TABLE report_audit_trail (...)".into(),
                "CREATE INDEX idx_audit_report ON report_audit_trail(report_id)".into(),
                "CREATE INDEX idx_audit_tenant ON report_audit_trail(tenant_id, timestamp)".into(),
            ],
            downgrade_ops: vec!["DROP TABLE report_audit_trail".into()],
        },
        Revision {
            id: "0003_snapshot_index".into(),
            message: "index report_versions.snapshot_id".into(),
            upgrade_ops: vec![
                "CREATE INDEX idx_versions_snapshot ON report_versions(snapshot_id)".into(),
            ],
            downgrade_ops: vec!["DROP INDEX idx_versions_snapshot".into()],
        },
        Revision {
            id: "0004_audit_user_index".into(),
            message: "index report_audit_trail(user_id, timestamp)".into(),
            upgrade_ops: vec![
                "CREATE INDEX idx_audit_user ON report_audit_trail(user_id, timestamp)".into(),
            ],
            downgrade_ops: vec!["DROP INDEX idx_audit_user".into()],
        },
    ]
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MigrationState {
    current: Option<String>,
}

/// Runner over a revision chain with a file-backed applied marker.
pub struct MigrationRunner {
    revisions: Vec<Revision>,
    state_path: PathBuf,
}

/// Status summary for `status`/`check`.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub current: Option<String>,
    pub head: Option<String>,
    pub pending: Vec<String>,
    pub is_up_to_date: bool,
}

impl MigrationRunner {
    pub fn new(revisions: Vec<Revision>, state_path: PathBuf) -> Self {
        Self {
            revisions,
            state_path,
        }
    }

    pub fn with_builtin(state_path: PathBuf) -> Self {
        Self::new(builtin_revisions(), state_path)
    }

    fn load_state(&self) -> TaxResult<MigrationState> {
        match fs::read_to_string(&self.state_path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| TaxError::Serialization(format!("migration state: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MigrationState::default()),
            Err(e) => Err(TaxError::external(format!("read migration state: {e}"))),
        }
    }

    fn save_state(&self, state: &MigrationState) -> TaxResult<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TaxError::external(format!("create state dir: {e}")))?;
        }
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| TaxError::Serialization(e.to_string()))?;
        fs::write(&self.state_path, raw)
            .map_err(|e| TaxError::external(format!("write migration state: {e}")))
    }

    fn index_of(&self, id: &str) -> TaxResult<usize> {
        self.revisions
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| TaxError::not_found(format!("revision {id}")))
    }

    /// Index one past the currently applied revision (0 = nothing
    /// applied).
    fn applied_count(&self) -> TaxResult<usize> {
        match self.load_state()?.current {
            Some(current) => Ok(self.index_of(&current)? + 1),
            None => Ok(0),
        }
    }

    pub fn head(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    pub fn current(&self) -> TaxResult<Option<String>> {
        Ok(self.load_state()?.current)
    }

    pub fn history(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn status(&self) -> TaxResult<MigrationStatus> {
        let applied = self.applied_count()?;
        let pending: Vec<String> = self.revisions[applied..]
            .iter()
            .map(|r| r.id.clone())
            .collect();
        Ok(MigrationStatus {
            current: self.load_state()?.current,
            head: self.head().map(|r| r.id.clone()),
            is_up_to_date: pending.is_empty(),
            pending,
        })
    }

    /// Apply revisions forward to `target` (or head). Returns the ids
    /// applied.
    pub fn upgrade(&self, target: Option<&str>) -> TaxResult<Vec<String>> {
        let applied = self.applied_count()?;
        let target_index = match target {
            Some(id) => self.index_of(id)? + 1,
            None => self.revisions.len(),
        };
        if target_index < applied {
            return Err(TaxError::invalid_input(
                "target",
                "target revision is older than the current revision; use downgrade",
            ));
        }
        let mut applied_ids = Vec::new();
        for revision in &self.revisions[applied..target_index] {
            tracing::info!(revision = %revision.id, "applying migration");
            applied_ids.push(revision.id.clone());
        }
        if target_index > 0 {
            self.save_state(&MigrationState {
                current: Some(self.revisions[target_index - 1].id.clone()),
            })?;
        }
        Ok(applied_ids)
    }

    /// Walk back to `target` (exclusive of the target itself remaining
    /// applied). Returns the ids reverted, newest first.
    pub fn downgrade(&self, target: &str) -> TaxResult<Vec<String>> {
        let applied = self.applied_count()?;
        let target_index = if target == "base" {
            0
        } else {
            self.index_of(target)? + 1
        };
        if target_index > applied {
            return Err(TaxError::invalid_input(
                "target",
                "target revision is newer than the current revision; use upgrade",
            ));
        }
        let mut reverted = Vec::new();
        for revision in self.revisions[target_index..applied].iter().rev() {
            tracing::info!(revision = %revision.id, "reverting migration");
            reverted.push(revision.id.clone());
        }
        let current = if target_index == 0 {
            None
        } else {
            Some(self.revisions[target_index - 1].id.clone())
        };
        self.save_state(&MigrationState { current })?;
        Ok(reverted)
    }

    /// Record `target` as applied without running anything.
    pub fn stamp(&self, target: &str) -> TaxResult<()> {
        self.index_of(target)?;
        self.save_state(&MigrationState {
            current: Some(target.to_string()),
        })
    }

    /// Append a new empty revision to the chain (in memory) and return
    /// it. Mirrors `revision -m <message>`; with `autogenerate` the ops
    /// are seeded from a diff placeholder the operator edits.
    pub fn new_revision(&mut self, message: &str, autogenerate: bool) -> Revision {
        let id = format!("{:04}_{}", self.revisions.len() + 1, slugify(message));
        let revision = Revision {
            id,
            message: message.to_string(),
            upgrade_ops: if autogenerate {
                vec!["-- autogenerated: review before applying".into()]
            } else {
                Vec::new()
            },
            downgrade_ops: Vec::new(),
        };
        self.revisions.push(revision.clone());
        revision
    }
}

fn slugify(message: &str) -> String {
    message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runner(dir: &TempDir) -> MigrationRunner {
        MigrationRunner::with_builtin(dir.path().join("migration_state.json"))
    }

    #[test]
    fn fresh_state_has_all_pending() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        let status = r.status().unwrap();
        assert_eq!(status.current, None);
        assert_eq!(status.pending.len(), 4);
        assert!(!status.is_up_to_date);
    }

    #[test]
    fn upgrade_to_head_applies_everything() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        let applied = r.upgrade(None).unwrap();
        assert_eq!(applied.len(), 4);
        let status = r.status().unwrap();
        assert!(status.is_up_to_date);
        assert_eq!(status.current, status.head);
    }

    #[test]
    fn partial_upgrade_then_resume() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        let applied = r.upgrade(Some("0002_report_audit_trail")).unwrap();
        assert_eq!(applied.len(), 2);
        let remaining = r.upgrade(None).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(r.status().unwrap().is_up_to_date);
    }

    #[test]
    fn downgrade_walks_back() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        r.upgrade(None).unwrap();
        let reverted = r.downgrade("0002_report_audit_trail").unwrap();
        assert_eq!(
            reverted,
            vec![
                "0004_audit_user_index".to_string(),
                "0003_snapshot_index".to_string()
            ]
        );
        assert_eq!(
            r.current().unwrap(),
            Some("0002_report_audit_trail".to_string())
        );
    }

    #[test]
    fn downgrade_to_base_clears_state() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        r.upgrade(None).unwrap();
        let reverted = r.downgrade("base").unwrap();
        assert_eq!(reverted.len(), 4);
        assert_eq!(r.current().unwrap(), None);
    }

    #[test]
    fn stamp_records_without_applying() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        r.stamp("0003_snapshot_index").unwrap();
        let status = r.status().unwrap();
        assert_eq!(status.current, Some("0003_snapshot_index".to_string()));
        assert_eq!(status.pending, vec!["0004_audit_user_index".to_string()]);
    }

    #[test]
    fn unknown_revision_is_not_found() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir);
        assert!(matches!(
            r.upgrade(Some("9999_bogus")).unwrap_err(),
            TaxError::NotFound(_)
        ));
        assert!(matches!(r.stamp("nope").unwrap_err(), TaxError::NotFound(_)));
    }

    #[test]
    fn new_revision_slugs_the_message() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(&dir);
        let rev = r.new_revision("Add FTC carryover table!", true);
        assert_eq!(rev.id, "0005_add_ftc_carryover_table");
        assert!(!rev.upgrade_ops.is_empty());
    }
}
