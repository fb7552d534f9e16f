use ccr_reconcile::{ReconcileReport, ReconciliationResult, ReconciliationSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One finished reconciliation, as recorded by the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSubmission {
    /// Client-generated; resubmitting the same ID is idempotent server-side.
    pub submission_id: Uuid,
    pub performed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub performed_at: DateTime<Utc>,
    /// Hash of the effective configuration that produced `results`.
    pub config_hash: String,
    pub summary: ReconciliationSummary,
    pub results: Vec<ReconciliationResult>,
}

impl ReconciliationSubmission {
    pub fn new(
        performed_by: impl Into<String>,
        zone: Option<String>,
        config_hash: impl Into<String>,
        report: ReconcileReport,
    ) -> Self {
        Self::new_at(performed_by, zone, config_hash, report, Utc::now())
    }

    pub fn new_at(
        performed_by: impl Into<String>,
        zone: Option<String>,
        config_hash: impl Into<String>,
        report: ReconcileReport,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            performed_by: performed_by.into(),
            zone,
            performed_at,
            config_hash: config_hash.into(),
            summary: report.summary,
            results: report.results,
        }
    }
}

/// Back-office acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// Server-side record ID.
    pub id: String,
    pub submission_id: Uuid,
    pub accepted_at: DateTime<Utc>,
}
