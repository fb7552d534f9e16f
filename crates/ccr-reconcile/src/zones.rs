//! Zone roll-up for treasury confirmation.

use std::collections::BTreeMap;

use ccr_schemas::Amount;
use serde::{Deserialize, Serialize};

use crate::{ReconciliationResult, StatusCounts};

/// Aggregates for one operational zone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    /// Empty for machines with no known zone.
    pub zone: String,
    pub total_expected: Amount,
    pub total_counted: Amount,
    pub difference: Amount,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

/// Per-zone totals, ordered by zone name.
pub fn summarize_by_zone(results: &[ReconciliationResult]) -> Vec<ZoneSummary> {
    let mut zones: BTreeMap<&str, ZoneSummary> = BTreeMap::new();
    for r in results {
        let zone = r.zone.as_deref().unwrap_or("");
        let z = zones.entry(zone).or_insert_with(|| ZoneSummary {
            zone: zone.to_string(),
            ..ZoneSummary::default()
        });
        z.total_expected += r.expected_amount;
        z.total_counted += r.counted_amount;
        z.difference += r.difference;
        z.counts.record(r.status);
    }
    zones.into_values().collect()
}
