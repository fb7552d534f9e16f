use std::fmt;

use ccr_schemas::{Amount, ReferenceMachine};
use serde::{Deserialize, Serialize};

use crate::matcher::MatchStrategy;

/// Terminal state of one machine in a reconciliation run.
///
/// Declaration order is the output priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    Mismatch,
    Missing,
    Extra,
    Match,
}

impl ReconcileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStatus::Mismatch => "mismatch",
            ReconcileStatus::Missing => "missing",
            ReconcileStatus::Extra => "extra",
            ReconcileStatus::Match => "match",
        }
    }
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One machine's reconciliation outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub machine_id: String,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub zone: Option<String>,
    pub expected_amount: Amount,
    pub counted_amount: Amount,
    pub counted_physical: Amount,
    pub counted_virtual: Amount,
    /// `counted_amount - expected_amount`.
    pub difference: Amount,
    pub status: ReconcileStatus,
    /// Which cascade step paired the counter record with its spreadsheet row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<ReferenceMachine>,
}

/// Machines per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "match")]
    pub matched: usize,
    #[serde(rename = "mismatch")]
    pub mismatched: usize,
    pub missing: usize,
    pub extra: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: ReconcileStatus) {
        match status {
            ReconcileStatus::Match => self.matched += 1,
            ReconcileStatus::Mismatch => self.mismatched += 1,
            ReconcileStatus::Missing => self.missing += 1,
            ReconcileStatus::Extra => self.extra += 1,
        }
    }

    pub fn get(&self, status: ReconcileStatus) -> usize {
        match status {
            ReconcileStatus::Match => self.matched,
            ReconcileStatus::Mismatch => self.mismatched,
            ReconcileStatus::Missing => self.missing,
            ReconcileStatus::Extra => self.extra,
        }
    }

    pub fn total(&self) -> usize {
        self.matched + self.mismatched + self.missing + self.extra
    }
}

/// Run-level aggregates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    /// Sum over every spreadsheet row, matched or not.
    pub total_expected: Amount,
    /// Sum over every counter record.
    pub total_counted: Amount,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

impl ReconciliationSummary {
    pub fn difference(&self) -> Amount {
        self.total_counted - self.total_expected
    }

    /// `true` when every machine reconciled as `match`.
    pub fn is_clean(&self) -> bool {
        self.counts.total() == self.counts.matched
    }
}

/// Full output of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub results: Vec<ReconciliationResult>,
    pub summary: ReconciliationSummary,
}

impl ReconcileReport {
    pub fn by_status(&self, status: ReconcileStatus) -> impl Iterator<Item = &ReconciliationResult> {
        self.results.iter().filter(move |r| r.status == status)
    }

    pub fn find(&self, machine_id: &str) -> Option<&ReconciliationResult> {
        self.results.iter().find(|r| r.machine_id == machine_id)
    }
}

/// Tunables for a run. Read from the `/reconcile` config section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// A matched pair is `match` when `|difference| < tolerance` (strict).
    pub tolerance: Amount,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            tolerance: Amount::from_units(1),
        }
    }
}

/// Structurally invalid reconciler input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidInputError {
    /// A spreadsheet record has an empty machine ID.
    EmptyExpectedMachineId { index: usize },
    /// A counter record has an empty resolved machine ID.
    EmptyCounterMachineId { index: usize },
    /// An input was not the expected collection type.
    NotACollection {
        input: &'static str,
        expected: &'static str,
    },
    /// An element of an input collection has the wrong shape.
    Malformed { input: &'static str, detail: String },
}

impl fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExpectedMachineId { index } => {
                write!(f, "expected record #{index} has an empty machineId")
            }
            Self::EmptyCounterMachineId { index } => {
                write!(f, "counter record #{index} has an empty resolvedMachineId")
            }
            Self::NotACollection { input, expected } => {
                write!(f, "{input} input must be {expected}")
            }
            Self::Malformed { input, detail } => write!(f, "{input} input is malformed: {detail}"),
        }
    }
}

impl std::error::Error for InvalidInputError {}
