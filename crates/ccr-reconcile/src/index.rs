//! Lookup structures built once per run.

use std::collections::{BTreeSet, HashMap};

use ccr_schemas::ids::zero_stripped;
use ccr_schemas::{Amount, CounterRecord, ExpectedRecord, SerialIndex};

/// All counter records sharing one machine identity, summed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountedMachine {
    /// Resolved machine ID of the first merged record.
    pub machine_id: String,
    /// First non-empty serial among the merged records.
    pub serial_number: String,
    /// Whether any merged record took its ID from the reference directory.
    pub serial_resolved: bool,
    pub total_physical: Amount,
    pub total_virtual: Amount,
    pub total_counted: Amount,
    /// How many counter lines were merged into this entry.
    pub records: usize,
}

/// Identity a counter record reconciles under: the machine its serial maps
/// to, else its resolved ID, zero-stripped either way.
fn counter_identity(rec: &CounterRecord, serials: &SerialIndex) -> String {
    let id = serials
        .machine_for(&rec.serial_number)
        .unwrap_or(&rec.resolved_machine_id);
    zero_stripped(id).into_owned()
}

/// Merge counter records by machine identity, keeping first-appearance order.
///
/// `"0042"` and `"42"` are one machine, and so are a record whose serial maps
/// to `"7"` and a record resolved directly to `"7"`.
pub fn merge_counted(records: &[CounterRecord], serials: &SerialIndex) -> Vec<CountedMachine> {
    let mut out: Vec<CountedMachine> = Vec::with_capacity(records.len());
    let mut pos: HashMap<String, usize> = HashMap::with_capacity(records.len());

    for rec in records {
        let serial = rec.serial_number.trim();
        match pos.get(&counter_identity(rec, serials)) {
            Some(&i) => {
                let m = &mut out[i];
                if m.serial_number.is_empty() {
                    m.serial_number = serial.to_string();
                }
                m.serial_resolved |= rec.is_serial_resolved();
                m.total_physical += rec.total_physical;
                m.total_virtual += rec.total_virtual;
                m.total_counted += rec.total_counted;
                m.records += 1;
            }
            None => {
                pos.insert(counter_identity(rec, serials), out.len());
                out.push(CountedMachine {
                    machine_id: rec.resolved_machine_id.trim().to_string(),
                    serial_number: serial.to_string(),
                    serial_resolved: rec.is_serial_resolved(),
                    total_physical: rec.total_physical,
                    total_virtual: rec.total_virtual,
                    total_counted: rec.total_counted,
                    records: 1,
                });
            }
        }
    }
    out
}

/// Spreadsheet rows keyed by machine ID and by its zero-stripped alias, with
/// an explicit claimed set.
///
/// Rows whose machine IDs agree once zero-stripped are merged: amounts add
/// up, the first ID and the first non-empty serial/location/zone are kept.
/// A claimed row is invisible to every lookup.
#[derive(Clone, Debug, Default)]
pub struct ExpectedIndex {
    entries: Vec<ExpectedRecord>,
    keys: HashMap<String, usize>,
    claimed: BTreeSet<usize>,
}

impl ExpectedIndex {
    pub fn build(records: &[ExpectedRecord]) -> Self {
        let mut entries: Vec<ExpectedRecord> = Vec::with_capacity(records.len());
        let mut keys: HashMap<String, usize> = HashMap::with_capacity(records.len() * 2);

        let mut identities: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for rec in records {
            let id = rec.machine_id.trim();
            let identity = zero_stripped(id).into_owned();
            let i = match identities.get(&identity) {
                Some(&i) => {
                    merge_into(&mut entries[i], rec);
                    i
                }
                None => {
                    identities.insert(identity, entries.len());
                    let mut entry = rec.clone();
                    entry.machine_id = id.to_string();
                    entries.push(entry);
                    entries.len() - 1
                }
            };
            keys.entry(id.to_string()).or_insert(i);
        }

        for (identity, i) in identities {
            keys.entry(identity).or_insert(i);
        }

        Self {
            entries,
            keys,
            claimed: BTreeSet::new(),
        }
    }

    /// Unclaimed row stored under `key` (raw or alias).
    pub fn lookup(&self, key: &str) -> Option<usize> {
        self.keys
            .get(key.trim())
            .copied()
            .filter(|i| !self.claimed.contains(i))
    }

    /// Mark a row as consumed. Returns `false` if it was already claimed.
    pub fn claim(&mut self, i: usize) -> bool {
        i < self.entries.len() && self.claimed.insert(i)
    }

    pub fn is_claimed(&self, i: usize) -> bool {
        self.claimed.contains(&i)
    }

    pub fn get(&self, i: usize) -> Option<&ExpectedRecord> {
        self.entries.get(i)
    }

    /// Unclaimed rows in spreadsheet order.
    pub fn unclaimed(&self) -> impl Iterator<Item = (usize, &ExpectedRecord)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.claimed.contains(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn merge_into(entry: &mut ExpectedRecord, rec: &ExpectedRecord) {
    entry.expected_amount += rec.expected_amount;
    fill_blank(&mut entry.serial_number, &rec.serial_number);
    fill_blank(&mut entry.location, &rec.location);
    fill_blank(&mut entry.zone, &rec.zone);
}

fn fill_blank(slot: &mut Option<String>, other: &Option<String>) {
    if slot.as_deref().map_or(true, str::is_empty) {
        if let Some(v) = other.as_deref().filter(|v| !v.is_empty()) {
            *slot = Some(v.to_string());
        }
    }
}
