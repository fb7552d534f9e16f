use serde::Deserialize;

use ccr_schemas::Denomination;

/// Number of denomination slots in the header and in each count block.
pub const DENOMINATION_SLOTS: usize = 8;

/// Used for any header slot that is absent or non-numeric.
pub const DEFAULT_DENOMINATIONS: [Denomination; DENOMINATION_SLOTS] =
    [20, 50, 100, 200, 500, 1000, 2000, 10000];

/// marker + serial + internal id + date + time + 8 physical + 8 virtual.
pub const MIN_DATA_FIELDS: usize = 5 + 2 * DENOMINATION_SLOTS;

/// Positional layout of the counter file.
///
/// Read from the `/counter` section of the layered config; every field has a
/// default matching the device's stock export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CounterLayout {
    pub header_marker: String,
    pub data_marker: String,
    /// Header field index of the first denomination.
    pub header_denomination_offset: usize,
    pub default_denominations: [Denomination; DENOMINATION_SLOTS],
}

impl Default for CounterLayout {
    fn default() -> Self {
        Self {
            header_marker: "H".to_string(),
            data_marker: "D".to_string(),
            header_denomination_offset: 1,
            default_denominations: DEFAULT_DENOMINATIONS,
        }
    }
}

impl CounterLayout {
    pub(crate) fn is_header(&self, fields: &[&str]) -> bool {
        fields
            .first()
            .is_some_and(|m| m.eq_ignore_ascii_case(&self.header_marker))
    }

    pub(crate) fn is_data(&self, fields: &[&str]) -> bool {
        fields
            .first()
            .is_some_and(|m| m.eq_ignore_ascii_case(&self.data_marker))
    }
}
