//! ccr-api
//!
//! Back-office boundary: the reference directory comes in, reconciliation
//! submissions go out, signed-off reports come back as opaque bytes.
//!
//! This crate owns the wire shapes and the [`BackOfficeApi`] trait plus one
//! HTTP implementation. It does not reconcile anything; callers (CLI) hand it
//! a finished report.

mod http;
mod submission;

use std::fmt;
use std::str::FromStr;

use ccr_schemas::ReferenceDirectory;

pub use http::HttpBackOfficeApi;
pub use reqwest;
pub use submission::{ReconciliationSubmission, SubmissionReceipt};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network or transport failure.
    Transport(String),
    /// The back office answered with a non-2xx status.
    Status { code: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// An authenticated call was attempted without a token.
    Auth(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "transport error: {msg}"),
            ApiError::Status { code, message } => {
                write!(f, "back office http error status={code}: {message}")
            }
            ApiError::Decode(msg) => write!(f, "decode error: {msg}"),
            ApiError::Auth(msg) => write!(f, "auth error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

// ---------------------------------------------------------------------------
// Report kinds
// ---------------------------------------------------------------------------

/// Reports the back office can render for a collection day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Every machine collected on the day.
    Collection,
    /// Only `mismatch`, `missing` and `extra` machines.
    Discrepancies,
    /// Per-zone treasury confirmation sheet.
    Zones,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Collection => "collection",
            ReportKind::Discrepancies => "discrepancies",
            ReportKind::Zones => "zones",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collection" => Ok(ReportKind::Collection),
            "discrepancies" => Ok(ReportKind::Discrepancies),
            "zones" => Ok(ReportKind::Zones),
            other => Err(format!(
                "unknown report kind '{other}'; expected one of: collection | discrepancies | zones"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Back-office data access.
///
/// Object safe and `Send + Sync` so callers can hold a `Box<dyn BackOfficeApi>`.
#[async_trait::async_trait]
pub trait BackOfficeApi: Send + Sync {
    /// Exchange operator credentials for a bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError>;

    /// The known-machines directory keyed by machine ID.
    async fn fetch_reference_directory(&self) -> Result<ReferenceDirectory, ApiError>;

    async fn submit_reconciliation(
        &self,
        submission: &ReconciliationSubmission,
    ) -> Result<SubmissionReceipt, ApiError>;

    /// Rendered report for `date` (`YYYY-MM-DD`), returned verbatim.
    async fn fetch_report(&self, kind: ReportKind, date: chrono::NaiveDate)
        -> Result<Vec<u8>, ApiError>;
}
