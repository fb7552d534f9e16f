use ccr_reconcile::*;
use ccr_schemas::{Amount, CounterRecord, ExpectedRecord, ReferenceDirectory, ReferenceMachine};

fn counted(id: &str, serial: &str, units: i64) -> CounterRecord {
    CounterRecord {
        serial_number: serial.to_string(),
        internal_file_id: id.to_string(),
        resolved_machine_id: id.to_string(),
        date: String::new(),
        time: String::new(),
        physical_denomination_counts: Default::default(),
        virtual_denomination_counts: Default::default(),
        total_physical: Amount::from_units(units),
        total_virtual: Amount::ZERO,
        total_counted: Amount::from_units(units),
    }
}

fn run(counter: &[CounterRecord], expected: &[ExpectedRecord], dir: &ReferenceDirectory) -> ReconcileReport {
    reconcile(counter, expected, dir, &ReconcileOptions::default()).unwrap()
}

#[test]
fn scenario_zero_padded_ids_match_either_way() {
    let report = run(
        &[counted("0042", "", 500), counted("7", "", 20)],
        &[
            ExpectedRecord::new("42", Amount::from_units(500)),
            ExpectedRecord::new("007", Amount::from_units(20)),
        ],
        &ReferenceDirectory::new(),
    );

    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| r.status == ReconcileStatus::Match));

    let padded_counter = report.find("42").unwrap();
    assert_eq!(padded_counter.matched_by, Some(MatchStrategy::ZeroStripped));

    // The sheet's own spelling is kept on matched results.
    let padded_sheet = report.find("007").unwrap();
    assert_eq!(padded_sheet.matched_by, Some(MatchStrategy::Exact));
}

#[test]
fn scenario_serial_lookup_rescues_unmapped_machine() {
    let mut dir = ReferenceDirectory::new();
    dir.insert("7", ReferenceMachine::new("SN-9").with_location("Sala Norte"));

    let report = run(
        &[counted("999", "SN-9", 250)],
        &[ExpectedRecord::new("7", Amount::from_units(250))],
        &dir,
    );

    assert_eq!(report.results.len(), 1);
    let r = &report.results[0];
    assert_eq!(r.machine_id, "7");
    assert_eq!(r.status, ReconcileStatus::Match);
    assert_eq!(r.matched_by, Some(MatchStrategy::SerialMapped));
    assert_eq!(r.serial_number.as_deref(), Some("SN-9"));
    assert_eq!(r.location.as_deref(), Some("Sala Norte"));
}

#[test]
fn scenario_integer_scan_is_last_resort() {
    let report = run(
        &[counted("15", "", 40)],
        &[ExpectedRecord::new("15-B", Amount::from_units(40))],
        &ReferenceDirectory::new(),
    );
    let r = &report.results[0];
    assert_eq!(r.machine_id, "15-B");
    assert_eq!(r.matched_by, Some(MatchStrategy::IntegerScan));
    assert_eq!(report.summary.counts.matched, 1);
}

#[test]
fn scenario_unknown_serial_leaves_machine_extra() {
    let mut dir = ReferenceDirectory::new();
    dir.insert("7", ReferenceMachine::new("SN-9"));

    let report = run(
        &[counted("A1", "SN-404", 10)],
        &[ExpectedRecord::new("7", Amount::from_units(10))],
        &dir,
    );

    assert_eq!(report.summary.counts.extra, 1);
    assert_eq!(report.summary.counts.missing, 1);
    let extra = report.find("A1").unwrap();
    assert_eq!(extra.expected_amount, Amount::ZERO);
    assert_eq!(extra.difference, extra.counted_amount);
    let missing = report.find("7").unwrap();
    assert_eq!(missing.difference, Amount::from_units(-10));
    assert_eq!(missing.serial_number.as_deref(), Some("SN-9"));
}
