use std::collections::HashMap;
use std::sync::Mutex;

use ccr_api::{ApiError, BackOfficeApi, ReconciliationSubmission, ReportKind, SubmissionReceipt};
use ccr_schemas::ReferenceDirectory;
use chrono::{NaiveDate, Utc};

/// In-process back office.
///
/// Holds one directory, a set of users, canned reports, and every accepted
/// submission. A repeated submission ID is rejected with 409, like the real
/// service.
#[derive(Default)]
pub struct InMemoryBackOffice {
    directory: ReferenceDirectory,
    users: HashMap<String, String>,
    reports: HashMap<(ReportKind, NaiveDate), Vec<u8>>,
    submissions: Mutex<Vec<ReconciliationSubmission>>,
}

impl InMemoryBackOffice {
    pub fn new(directory: ReferenceDirectory) -> Self {
        Self {
            directory,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users.insert(username.to_string(), password.to_string());
        self
    }

    pub fn with_report(mut self, kind: ReportKind, date: NaiveDate, body: impl Into<Vec<u8>>) -> Self {
        self.reports.insert((kind, date), body.into());
        self
    }

    /// Snapshot of accepted submissions, oldest first.
    pub fn submissions(&self) -> Vec<ReconciliationSubmission> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl BackOfficeApi for InMemoryBackOffice {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        match self.users.get(username) {
            Some(p) if p == password => Ok(format!("token-{username}")),
            _ => Err(ApiError::Status {
                code: 401,
                message: "invalid credentials".to_string(),
            }),
        }
    }

    async fn fetch_reference_directory(&self) -> Result<ReferenceDirectory, ApiError> {
        Ok(self.directory.clone())
    }

    async fn submit_reconciliation(
        &self,
        submission: &ReconciliationSubmission,
    ) -> Result<SubmissionReceipt, ApiError> {
        let mut subs = self
            .submissions
            .lock()
            .map_err(|_| ApiError::Transport("submission store poisoned".to_string()))?;
        if subs
            .iter()
            .any(|s| s.submission_id == submission.submission_id)
        {
            return Err(ApiError::Status {
                code: 409,
                message: format!("submission {} already recorded", submission.submission_id),
            });
        }
        subs.push(submission.clone());
        Ok(SubmissionReceipt {
            id: format!("rec-{}", subs.len()),
            submission_id: submission.submission_id,
            accepted_at: Utc::now(),
        })
    }

    async fn fetch_report(&self, kind: ReportKind, date: NaiveDate) -> Result<Vec<u8>, ApiError> {
        self.reports
            .get(&(kind, date))
            .cloned()
            .ok_or_else(|| ApiError::Status {
                code: 404,
                message: format!("no {kind} report for {date}"),
            })
    }
}
