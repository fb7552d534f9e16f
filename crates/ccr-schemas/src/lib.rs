//! ccr-schemas
//!
//! Shared record shapes for the cash-collection reconciliation pipeline.
//!
//! - [`CounterRecord`]: one machine as counted by the cash-counting device.
//! - [`ExpectedRecord`]: one machine as listed in the expected-values sheet.
//! - [`ReferenceDirectory`]: the known-machines directory served by the back office.
//!
//! Pure data. No IO.

pub mod ids;
mod money;
mod reference;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use money::{Amount, AmountParseError, MICROS_SCALE};
pub use reference::{MachineIndex, ReferenceDirectory, ReferenceMachine, SerialIndex};

/// Bill denomination in whole currency units (e.g. `20`, `10000`).
pub type Denomination = u32;

/// Denomination → number of bills.
pub type DenominationCounts = BTreeMap<Denomination, i64>;

/// One machine as read from the counter file.
///
/// Built once per parse call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRecord {
    /// Headercard serial printed on the physical unit.
    pub serial_number: String,
    /// The file's own local key for the record.
    pub internal_file_id: String,
    /// Machine ID from the serial lookup, or `internal_file_id` when unmapped.
    pub resolved_machine_id: String,
    pub date: String,
    pub time: String,
    pub physical_denomination_counts: DenominationCounts,
    pub virtual_denomination_counts: DenominationCounts,
    pub total_physical: Amount,
    pub total_virtual: Amount,
    /// Always `total_physical + total_virtual`.
    pub total_counted: Amount,
}

impl CounterRecord {
    /// `true` when the machine ID came from the reference directory rather
    /// than the file's own key.
    pub fn is_serial_resolved(&self) -> bool {
        self.resolved_machine_id != self.internal_file_id
    }
}

/// One row of the expected-values spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedRecord {
    /// Never empty for records emitted by the spreadsheet parser.
    pub machine_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub expected_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl ExpectedRecord {
    pub fn new(machine_id: impl Into<String>, expected_amount: Amount) -> Self {
        Self {
            machine_id: machine_id.into(),
            serial_number: None,
            expected_amount,
            location: None,
            zone: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_record_serializes_camel_case() {
        let rec = CounterRecord {
            serial_number: "A1".to_string(),
            internal_file_id: "9".to_string(),
            resolved_machine_id: "100".to_string(),
            date: "01/02/2024".to_string(),
            time: "10:00".to_string(),
            physical_denomination_counts: BTreeMap::from([(20, 2)]),
            virtual_denomination_counts: BTreeMap::new(),
            total_physical: Amount::from_units(40),
            total_virtual: Amount::ZERO,
            total_counted: Amount::from_units(40),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["resolvedMachineId"], "100");
        assert_eq!(v["totalCounted"], 40.0);
        assert!(rec.is_serial_resolved());
    }

    #[test]
    fn expected_record_omits_absent_optionals() {
        let rec = ExpectedRecord::new("42", Amount::from_units(10)).with_zone("Z1");
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["zone"], "Z1");
        assert!(v.get("location").is_none());
        assert!(v.get("serialNumber").is_none());
    }
}
