//! Heuristic column detection.
//!
//! Each target field owns an ordered rule list: every header-substring rule in
//! priority order, then (for all fields but the serial) a positional rule. The
//! first rule that hits a column wins. Matching is case-insensitive.

use serde::Deserialize;

/// A column the parser wants to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    MachineId,
    Amount,
    Location,
    Zone,
    Serial,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::MachineId,
        Field::Amount,
        Field::Location,
        Field::Zone,
        Field::Serial,
    ];

    /// Column used when no header matches.
    pub fn fallback_position(self) -> Option<usize> {
        match self {
            Field::MachineId => Some(0),
            Field::Amount => Some(1),
            Field::Location => Some(2),
            Field::Zone => Some(3),
            Field::Serial => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Header contains this lowercase substring.
    HeaderContains(String),
    /// Column at this index, if the sheet has one.
    Position(usize),
}

impl Rule {
    fn resolve(&self, headers: &[String]) -> Option<usize> {
        match self {
            Rule::HeaderContains(pattern) => headers.iter().position(|h| h.contains(pattern.as_str())),
            Rule::Position(i) => (*i < headers.len()).then_some(*i),
        }
    }
}

/// Header synonyms per field, in priority order.
///
/// Read from the `/sheet/columns` section of the layered config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    pub machine_id: Vec<String>,
    pub amount: Vec<String>,
    pub location: Vec<String>,
    pub zone: Vec<String>,
    pub serial: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            machine_id: owned(&["machine", "máquina", "maquina", "id"]),
            amount: owned(&["value", "amount", "total", "valor", "monto", "importe"]),
            location: owned(&["location", "ubicación", "ubicacion", "local", "sala"]),
            zone: owned(&["zone", "area", "zona", "área"]),
            serial: owned(&["serial", "card", "header", "serie", "tarjeta"]),
        }
    }
}

impl DetectionRules {
    pub fn patterns(&self, field: Field) -> &[String] {
        match field {
            Field::MachineId => &self.machine_id,
            Field::Amount => &self.amount,
            Field::Location => &self.location,
            Field::Zone => &self.zone,
            Field::Serial => &self.serial,
        }
    }

    /// The full ordered rule list for `field`.
    pub fn rules_for(&self, field: Field) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .patterns(field)
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .map(Rule::HeaderContains)
            .collect();
        rules.extend(field.fallback_position().map(Rule::Position));
        rules
    }

    /// `true` when `header` matches any of `field`'s header patterns.
    pub fn header_matches(&self, field: Field, header: &str) -> bool {
        let header = header.to_lowercase();
        self.patterns(field)
            .iter()
            .map(|p| p.trim().to_lowercase())
            .any(|p| !p.is_empty() && header.contains(&p))
    }
}

/// Detected column index per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub machine_id: Option<usize>,
    pub amount: Option<usize>,
    pub location: Option<usize>,
    pub zone: Option<usize>,
    pub serial: Option<usize>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::MachineId => self.machine_id,
            Field::Amount => self.amount,
            Field::Location => self.location,
            Field::Zone => self.zone,
            Field::Serial => self.serial,
        }
    }

    fn set(&mut self, field: Field, col: Option<usize>) {
        match field {
            Field::MachineId => self.machine_id = col,
            Field::Amount => self.amount = col,
            Field::Location => self.location = col,
            Field::Zone => self.zone = col,
            Field::Serial => self.serial = col,
        }
    }
}

/// Locate every field in a header row.
pub fn detect_columns(headers: &[String], rules: &DetectionRules) -> ColumnMap {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut map = ColumnMap::default();
    for field in Field::ALL {
        let col = rules
            .rules_for(field)
            .iter()
            .find_map(|rule| rule.resolve(&lowered));
        map.set(field, col);
    }
    map
}
