//! Reference directory of known machines, as served by the back office.
//!
//! Wire shape: a JSON object keyed by machine ID, each value carrying at least
//! `serialNumber`, `location` and `zone`. Any other fields (`finalizado`,
//! assistant names, comments, ...) are preserved verbatim in
//! [`ReferenceMachine::extra`] and only ever used for display.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ids::{float_to_id, zero_stripped};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceMachine {
    #[serde(default, deserialize_with = "lenient_string")]
    pub serial_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zone: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ReferenceMachine {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: Some(serial_number.into()),
            ..Self::default()
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
}

/// Accept strings, numbers, or null. Blank strings become `None`.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Some(Value::Number(n)) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => float_to_id(n.as_f64().unwrap_or_default()),
        }),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Machine ID → reference metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceDirectory {
    machines: BTreeMap<String, ReferenceMachine>,
}

impl ReferenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, machine_id: impl Into<String>, machine: ReferenceMachine) {
        self.machines.insert(machine_id.into(), machine);
    }

    pub fn get(&self, machine_id: &str) -> Option<&ReferenceMachine> {
        self.machines.get(machine_id)
    }

    /// ID lookup tolerant of zero padding, built once per run.
    pub fn machine_index(&self) -> MachineIndex<'_> {
        let mut aliases = HashMap::with_capacity(self.machines.len());
        for machine_id in self.machines.keys() {
            let alias = zero_stripped(machine_id);
            if alias != machine_id.as_str() {
                aliases
                    .entry(alias.into_owned())
                    .or_insert_with(|| machine_id.as_str());
            }
        }
        MachineIndex {
            directory: self,
            aliases,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ReferenceMachine)> {
        self.machines.iter()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Build the serial-number → machine-ID index.
    ///
    /// Machines without a serial are skipped. When two machines share a
    /// serial, the one with the lowest machine ID (key order) wins.
    pub fn serial_index(&self) -> SerialIndex {
        let mut by_serial = HashMap::with_capacity(self.machines.len());
        for (machine_id, machine) in &self.machines {
            if let Some(serial) = machine.serial_number.as_deref() {
                by_serial
                    .entry(serial.to_string())
                    .or_insert_with(|| machine_id.clone());
            }
        }
        SerialIndex { by_serial }
    }
}

impl FromIterator<(String, ReferenceMachine)> for ReferenceDirectory {
    fn from_iter<I: IntoIterator<Item = (String, ReferenceMachine)>>(iter: I) -> Self {
        Self {
            machines: iter.into_iter().collect(),
        }
    }
}

/// Machine ID → reference metadata, also keyed by zero-stripped IDs.
///
/// A raw directory key always wins over an alias. When two keys strip to the
/// same alias, the lowest key (directory order) wins.
#[derive(Debug, Clone)]
pub struct MachineIndex<'a> {
    directory: &'a ReferenceDirectory,
    aliases: HashMap<String, &'a str>,
}

impl<'a> MachineIndex<'a> {
    pub fn get(&self, machine_id: &str) -> Option<&'a ReferenceMachine> {
        let machine_id = machine_id.trim();
        if let Some(m) = self.directory.machines.get(machine_id) {
            return Some(m);
        }
        let stripped = zero_stripped(machine_id);
        if let Some(m) = self.directory.machines.get(stripped.as_ref()) {
            return Some(m);
        }
        self.aliases
            .get(stripped.as_ref())
            .and_then(|key| self.directory.machines.get(*key))
    }
}

/// Serial number → machine ID.
#[derive(Debug, Clone, Default)]
pub struct SerialIndex {
    by_serial: HashMap<String, String>,
}

impl SerialIndex {
    pub fn machine_for(&self, serial: &str) -> Option<&str> {
        let serial = serial.trim();
        if serial.is_empty() {
            return None;
        }
        self.by_serial.get(serial).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_serial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_serial.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_shape_with_extra_fields() {
        let raw = r#"{
            "7": {"serialNumber": "SN-9", "location": "Sala Norte", "zone": "Z1",
                  "finalizado": true, "asistente": "Ana", "comentarios": null},
            "8": {"serialNumber": 12345, "location": "", "zone": null}
        }"#;
        let dir: ReferenceDirectory = serde_json::from_str(raw).unwrap();
        assert_eq!(dir.len(), 2);

        let m7 = dir.get("7").unwrap();
        assert_eq!(m7.serial_number.as_deref(), Some("SN-9"));
        assert_eq!(m7.extra.get("finalizado"), Some(&Value::Bool(true)));

        let m8 = dir.get("8").unwrap();
        assert_eq!(m8.serial_number.as_deref(), Some("12345"));
        assert_eq!(m8.location, None);
        assert_eq!(m8.zone, None);
    }

    #[test]
    fn serial_index_maps_serial_to_machine() {
        let mut dir = ReferenceDirectory::new();
        dir.insert("7", ReferenceMachine::new("SN-9"));
        dir.insert("8", ReferenceMachine::default());
        let idx = dir.serial_index();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.machine_for("SN-9"), Some("7"));
        assert_eq!(idx.machine_for(" SN-9 "), Some("7"));
        assert_eq!(idx.machine_for(""), None);
    }

    #[test]
    fn duplicate_serial_keeps_lowest_machine_id() {
        let mut dir = ReferenceDirectory::new();
        dir.insert("20", ReferenceMachine::new("DUP"));
        dir.insert("10", ReferenceMachine::new("DUP"));
        assert_eq!(dir.serial_index().machine_for("DUP"), Some("10"));
    }

    #[test]
    fn lookup_tolerates_zero_padding() {
        let mut dir = ReferenceDirectory::new();
        dir.insert("42", ReferenceMachine::new("A"));
        dir.insert("0007", ReferenceMachine::new("B"));
        let idx = dir.machine_index();
        assert_eq!(idx.get("0042").and_then(|m| m.serial_number.as_deref()), Some("A"));
        assert_eq!(idx.get("7").and_then(|m| m.serial_number.as_deref()), Some("B"));
        assert_eq!(idx.get("007").and_then(|m| m.serial_number.as_deref()), Some("B"));
        assert!(idx.get("43").is_none());
    }

    #[test]
    fn raw_key_wins_over_alias() {
        let mut dir = ReferenceDirectory::new();
        dir.insert("07", ReferenceMachine::new("PADDED"));
        dir.insert("7", ReferenceMachine::new("PLAIN"));
        let idx = dir.machine_index();
        assert_eq!(idx.get("7").and_then(|m| m.serial_number.as_deref()), Some("PLAIN"));
        assert_eq!(idx.get("07").and_then(|m| m.serial_number.as_deref()), Some("PADDED"));
        assert_eq!(idx.get("007").and_then(|m| m.serial_number.as_deref()), Some("PLAIN"));
    }
}
