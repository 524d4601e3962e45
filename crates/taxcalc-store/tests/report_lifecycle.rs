//! Full lifecycle: compute a breakdown, version it, recalculate, verify
//! the chain and the audit trail.

use std::sync::Arc;

use serde_json::json;

use taxcalc_core::{Deductions, FilingStatus, Income, Money, TaxReturn, TaxpayerInfo, W2Info};
use taxcalc_pipeline::{
    CalculationPipeline, CalculationRequest, ExecuteOptions, FederalTaxEngine, MemoryCache,
    RuleValidator,
};
use taxcalc_store::{
    AuditContext, ChangeType, MemoryStorage, ReportType, ReportVersionStore,
};

fn compute(wages: i64) -> serde_json::Value {
    let pipeline = CalculationPipeline::new(
        Arc::new(RuleValidator::new()),
        FederalTaxEngine::for_year(2025).unwrap(),
        Arc::new(MemoryCache::new()),
    );
    let request = CalculationRequest::new(
        TaxReturn::new(
            2025,
            TaxpayerInfo::new("Morgan", "Diaz", "231-45-6789", FilingStatus::Single),
        )
        .with_income(Income {
            w2_forms: vec![W2Info::new("Acme", Money::from_dollars(wages))],
            ..Default::default()
        })
        .with_deductions(Deductions::standard()),
    );
    let result = pipeline.execute(&request, &ExecuteOptions::default());
    assert!(result.success);
    serde_json::to_value(result.breakdown.unwrap()).unwrap()
}

#[test]
fn computed_breakdowns_version_cleanly() {
    let store = ReportVersionStore::new(MemoryStorage::new());
    let audit = AuditContext::for_user("preparer-7");

    let v1 = store
        .create_report(
            "ret-2025-001",
            ReportType::CalculationBreakdown,
            compute(90_000),
            "tenant-a",
            "engine",
            "initial calculation",
            Some("snap-001".into()),
            &audit,
        )
        .unwrap();
    assert_eq!(v1.version_number, 1);
    assert!(v1.verify_integrity());

    // Amended W-2 arrives; recalculate three times as corrections land.
    for (i, wages) in [92_000, 92_500, 93_000].iter().enumerate() {
        let version = store
            .update_report(
                "ret-2025-001",
                compute(*wages),
                "tenant-a",
                "engine",
                ChangeType::Recalculated,
                "amended W-2",
                Some(format!("snap-{:03}", i + 2)),
                &audit,
            )
            .unwrap();
        assert_eq!(version.version_number, (i + 2) as u32);
    }

    let history = store.get_version_history("ret-2025-001", "tenant-a").unwrap();
    assert_eq!(history.len(), 4);
    let numbers: Vec<u32> = history.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    let verification = store
        .verify_chain_integrity("ret-2025-001", "tenant-a")
        .unwrap();
    assert!(verification.is_valid, "{:?}", verification.errors);

    let trail = store.get_audit_trail("ret-2025-001", "tenant-a", 50).unwrap();
    assert!(trail.len() >= 4);
    assert!(trail.iter().any(|e| e.action == "report_created"));
    assert_eq!(
        trail
            .iter()
            .filter(|e| e.action == "report_recalculated")
            .count(),
        3
    );
    // All entries carry the acting user.
    assert!(trail.iter().all(|e| e.user_id == "preparer-7"));
}

#[test]
fn diff_between_recalculations_shows_changed_tax() {
    let store = ReportVersionStore::new(MemoryStorage::new());
    let audit = AuditContext::for_user("preparer-7");

    let v1 = store
        .create_report(
            "ret-2025-002",
            ReportType::CalculationBreakdown,
            compute(90_000),
            "tenant-a",
            "engine",
            "initial",
            None,
            &audit,
        )
        .unwrap();
    let v2 = store
        .update_report(
            "ret-2025-002",
            compute(120_000),
            "tenant-a",
            "engine",
            ChangeType::Recalculated,
            "raise",
            None,
            &audit,
        )
        .unwrap();

    let comparison = store
        .compare_versions(&v1.version_id, &v2.version_id, Some("tenant-a"))
        .unwrap();
    assert!(comparison.has_changes);
    let changed_paths: Vec<&str> = comparison.changes.iter().map(|c| c.path.as_str()).collect();
    assert!(changed_paths.contains(&"total_income"));
    assert!(changed_paths.contains(&"regular_tax"));
    assert!(changed_paths.contains(&"total_federal_tax"));
}

#[test]
fn cross_tenant_chains_are_independent() {
    let store = ReportVersionStore::new(MemoryStorage::new());
    let audit = AuditContext::default();

    for tenant in ["tenant-a", "tenant-b"] {
        store
            .create_report(
                "shared-id",
                ReportType::SummaryReport,
                json!({"tenant": tenant}),
                tenant,
                "system",
                "",
                None,
                &audit,
            )
            .unwrap();
    }
    store
        .update_report(
            "shared-id",
            json!({"tenant": "tenant-a", "rev": 2}),
            "tenant-a",
            "system",
            ChangeType::Updated,
            "",
            None,
            &audit,
        )
        .unwrap();

    assert_eq!(
        store
            .get_version_history("shared-id", "tenant-a")
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        store
            .get_version_history("shared-id", "tenant-b")
            .unwrap()
            .len(),
        1
    );
    for tenant in ["tenant-a", "tenant-b"] {
        assert!(store
            .verify_chain_integrity("shared-id", tenant)
            .unwrap()
            .is_valid);
    }
}
