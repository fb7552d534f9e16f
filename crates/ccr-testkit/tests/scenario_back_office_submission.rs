//! The in-memory back office behaves like the HTTP one from the caller's side.

use ccr_api::{ApiError, BackOfficeApi, ReconciliationSubmission, ReportKind};
use ccr_reconcile::{reconcile, ReconcileOptions};
use ccr_schemas::{Amount, CounterRecord, ExpectedRecord, ReferenceDirectory, ReferenceMachine};
use ccr_testkit::InMemoryBackOffice;
use chrono::NaiveDate;

fn counted(id: &str, units: i64) -> CounterRecord {
    CounterRecord {
        serial_number: String::new(),
        internal_file_id: id.to_string(),
        resolved_machine_id: id.to_string(),
        date: String::new(),
        time: String::new(),
        physical_denomination_counts: Default::default(),
        virtual_denomination_counts: Default::default(),
        total_physical: Amount::from_units(units),
        total_virtual: Amount::ZERO,
        total_counted: Amount::from_units(units),
    }
}

#[tokio::test]
async fn scenario_submission_recorded_once() {
    let mut dir = ReferenceDirectory::new();
    dir.insert("1", ReferenceMachine::new("S1").with_zone("NORTE"));
    let bo = InMemoryBackOffice::new(dir).with_user("ops", "pw");

    let token = bo.login("ops", "pw").await.unwrap();
    assert_eq!(token, "token-ops");
    assert!(matches!(
        bo.login("ops", "nope").await,
        Err(ApiError::Status { code: 401, .. })
    ));

    let directory = bo.fetch_reference_directory().await.unwrap();
    let report = reconcile(
        &[counted("1", 50)],
        &[ExpectedRecord::new("1", Amount::from_units(50))],
        &directory,
        &ReconcileOptions::default(),
    )
    .unwrap();

    let submission =
        ReconciliationSubmission::new("ops", Some("NORTE".to_string()), "cfg", report);
    let receipt = bo.submit_reconciliation(&submission).await.unwrap();
    assert_eq!(receipt.id, "rec-1");
    assert_eq!(receipt.submission_id, submission.submission_id);

    let again = bo.submit_reconciliation(&submission).await.unwrap_err();
    assert!(matches!(again, ApiError::Status { code: 409, .. }));

    let stored = bo.submissions();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].results[0].zone.as_deref(), Some("NORTE"));
}

#[tokio::test]
async fn scenario_reports_served_by_kind_and_date() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let bo: Box<dyn BackOfficeApi> = Box::new(
        InMemoryBackOffice::default().with_report(ReportKind::Zones, day, b"zone,total\n".to_vec()),
    );

    assert_eq!(
        bo.fetch_report(ReportKind::Zones, day).await.unwrap(),
        b"zone,total\n".to_vec()
    );
    let err = bo
        .fetch_report(ReportKind::Collection, day)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { code: 404, .. }));
}
