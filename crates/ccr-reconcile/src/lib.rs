//! ccr-reconcile
//!
//! Identity resolution and reconciliation of counted cash against expected
//! values.
//!
//! Architectural decisions:
//! - Counter records are matched to spreadsheet rows through an ordered
//!   strategy cascade (exact, zero-stripped, serial-mapped, integer scan)
//! - A spreadsheet row is claimed by at most one counted machine
//! - Every machine identity ends in exactly one result: `match`, `mismatch`,
//!   `missing` or `extra`
//! - Output order is deterministic: status priority, then machine ID
//!
//! Deterministic, pure logic. No IO.

mod engine;
pub mod export;
mod index;
mod json;
pub mod matcher;
mod types;
mod zones;

pub use engine::reconcile;
pub use index::{merge_counted, CountedMachine, ExpectedIndex};
pub use json::reconcile_from_json;
pub use matcher::{find_match, MatchKey, MatchStrategy, MATCH_CASCADE};
pub use types::*;
pub use zones::{summarize_by_zone, ZoneSummary};
