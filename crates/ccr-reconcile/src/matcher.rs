//! The identity-matching cascade.
//!
//! Each strategy looks for an unclaimed spreadsheet row for one counted
//! machine. [`find_match`] tries them in [`MATCH_CASCADE`] order and stops at
//! the first hit. Strategies never claim; the engine does.

use ccr_schemas::ids::{leading_integer, zero_stripped};
use ccr_schemas::SerialIndex;
use serde::{Deserialize, Serialize};

use crate::index::ExpectedIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Resolved machine ID equals a spreadsheet key (or its zero-stripped alias).
    Exact,
    /// Zero-stripped resolved machine ID equals a spreadsheet key.
    ZeroStripped,
    /// Serial number maps through the reference directory to a spreadsheet key.
    SerialMapped,
    /// Leading integer of the machine ID equals that of an unclaimed row.
    /// O(rows) per call.
    IntegerScan,
}

pub const MATCH_CASCADE: [MatchStrategy; 4] = [
    MatchStrategy::Exact,
    MatchStrategy::ZeroStripped,
    MatchStrategy::SerialMapped,
    MatchStrategy::IntegerScan,
];

/// Identifiers a counted machine can be matched by.
#[derive(Clone, Copy, Debug)]
pub struct MatchKey<'a> {
    pub machine_id: &'a str,
    pub serial_number: &'a str,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::ZeroStripped => "zero_stripped",
            MatchStrategy::SerialMapped => "serial_mapped",
            MatchStrategy::IntegerScan => "integer_scan",
        }
    }

    /// Index of the unclaimed row this strategy pairs `key` with, if any.
    pub fn candidate(
        self,
        key: MatchKey<'_>,
        index: &ExpectedIndex,
        serials: &SerialIndex,
    ) -> Option<usize> {
        let id = key.machine_id.trim();
        match self {
            MatchStrategy::Exact => index.lookup(id),
            MatchStrategy::ZeroStripped => {
                let stripped = zero_stripped(id);
                if stripped == id {
                    None
                } else {
                    index.lookup(&stripped)
                }
            }
            MatchStrategy::SerialMapped => {
                let mapped = serials.machine_for(key.serial_number)?;
                index.lookup(mapped)
            }
            MatchStrategy::IntegerScan => {
                let n = leading_integer(id)?;
                index
                    .unclaimed()
                    .find(|(_, rec)| leading_integer(&rec.machine_id) == Some(n))
                    .map(|(i, _)| i)
            }
        }
    }
}

/// First strategy in the cascade that finds an unclaimed row.
pub fn find_match(
    key: MatchKey<'_>,
    index: &ExpectedIndex,
    serials: &SerialIndex,
) -> Option<(usize, MatchStrategy)> {
    MATCH_CASCADE
        .iter()
        .find_map(|s| s.candidate(key, index, serials).map(|i| (i, *s)))
}
