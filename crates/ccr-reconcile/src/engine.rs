use std::collections::HashMap;

use ccr_schemas::ids::zero_stripped;
use ccr_schemas::{
    Amount, CounterRecord, ExpectedRecord, MachineIndex, ReferenceDirectory, ReferenceMachine,
    SerialIndex,
};
use tracing::{debug, info};

use crate::index::{merge_counted, CountedMachine, ExpectedIndex};
use crate::matcher::{find_match, MatchKey, MatchStrategy};
use crate::{
    InvalidInputError, ReconcileOptions, ReconcileReport, ReconcileStatus, ReconciliationResult,
    ReconciliationSummary, StatusCounts,
};

fn validate(counter: &[CounterRecord], expected: &[ExpectedRecord]) -> Result<(), InvalidInputError> {
    if let Some(index) = counter
        .iter()
        .position(|r| r.resolved_machine_id.trim().is_empty())
    {
        return Err(InvalidInputError::EmptyCounterMachineId { index });
    }
    if let Some(index) = expected.iter().position(|r| r.machine_id.trim().is_empty()) {
        return Err(InvalidInputError::EmptyExpectedMachineId { index });
    }
    Ok(())
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn classify(difference: Amount, opts: &ReconcileOptions) -> ReconcileStatus {
    if difference.abs() < opts.tolerance {
        ReconcileStatus::Match
    } else {
        ReconcileStatus::Mismatch
    }
}

/// Fill display-only fields. Spreadsheet values win over reference values;
/// the counter serial wins over both.
fn enrich(result: &mut ReconciliationResult, reference: Option<&ReferenceMachine>) {
    if let Some(r) = reference {
        if result.serial_number.is_none() {
            result.serial_number = non_blank(r.serial_number.as_deref());
        }
        if result.location.is_none() {
            result.location = non_blank(r.location.as_deref());
        }
        if result.zone.is_none() {
            result.zone = non_blank(r.zone.as_deref());
        }
    }
    result.reference_data = reference.cloned();
}

/// Reference entry a result may be enriched from.
///
/// An ID that came from the spreadsheet or the directory names a real machine.
/// An unresolved counter ID is the file's own key, so only its serial can
/// identify a reference entry.
fn reference_for<'a>(
    result: &ReconciliationResult,
    id_names_machine: bool,
    machines: &MachineIndex<'a>,
    serials: &SerialIndex,
) -> Option<&'a ReferenceMachine> {
    if id_names_machine {
        return machines.get(&result.machine_id);
    }
    let mapped = serials.machine_for(result.serial_number.as_deref()?)?;
    machines.get(mapped)
}

/// Fold `other` into `existing`; both describe one machine identity. A matched
/// side keeps its spreadsheet row and the counted amounts add up.
fn fold(
    existing: &mut ReconciliationResult,
    mut other: ReconciliationResult,
    opts: &ReconcileOptions,
) {
    if existing.matched_by.is_none() && other.matched_by.is_some() {
        std::mem::swap(existing, &mut other);
    }
    existing.counted_amount += other.counted_amount;
    existing.counted_physical += other.counted_physical;
    existing.counted_virtual += other.counted_virtual;
    if existing.serial_number.is_none() {
        existing.serial_number = other.serial_number;
    }
    existing.difference = existing.counted_amount - existing.expected_amount;
    existing.status = match existing.matched_by {
        Some(_) => classify(existing.difference, opts),
        None => ReconcileStatus::Extra,
    };
}

fn matched_result(
    counted: &CountedMachine,
    expected: &ExpectedRecord,
    strategy: MatchStrategy,
    opts: &ReconcileOptions,
) -> ReconciliationResult {
    let difference = counted.total_counted - expected.expected_amount;
    ReconciliationResult {
        machine_id: expected.machine_id.clone(),
        serial_number: non_blank(Some(&counted.serial_number))
            .or_else(|| non_blank(expected.serial_number.as_deref())),
        location: non_blank(expected.location.as_deref()),
        zone: non_blank(expected.zone.as_deref()),
        expected_amount: expected.expected_amount,
        counted_amount: counted.total_counted,
        counted_physical: counted.total_physical,
        counted_virtual: counted.total_virtual,
        difference,
        status: classify(difference, opts),
        matched_by: Some(strategy),
        reference_data: None,
    }
}

fn extra_result(counted: &CountedMachine) -> ReconciliationResult {
    ReconciliationResult {
        machine_id: counted.machine_id.clone(),
        serial_number: non_blank(Some(&counted.serial_number)),
        location: None,
        zone: None,
        expected_amount: Amount::ZERO,
        counted_amount: counted.total_counted,
        counted_physical: counted.total_physical,
        counted_virtual: counted.total_virtual,
        difference: counted.total_counted,
        status: ReconcileStatus::Extra,
        matched_by: None,
        reference_data: None,
    }
}

fn missing_result(expected: &ExpectedRecord) -> ReconciliationResult {
    ReconciliationResult {
        machine_id: expected.machine_id.clone(),
        serial_number: non_blank(expected.serial_number.as_deref()),
        location: non_blank(expected.location.as_deref()),
        zone: non_blank(expected.zone.as_deref()),
        expected_amount: expected.expected_amount,
        counted_amount: Amount::ZERO,
        counted_physical: Amount::ZERO,
        counted_virtual: Amount::ZERO,
        difference: -expected.expected_amount,
        status: ReconcileStatus::Missing,
        matched_by: None,
        reference_data: None,
    }
}

/// Reconcile counted machines against expected values.
///
/// - Counter records sharing a machine identity are summed first; so are
///   spreadsheet rows. Identity ignores zero padding and follows the serial
///   index.
/// - Each counted machine walks the match cascade; a hit claims the row.
/// - Unpaired counted machines are `extra`, unclaimed rows are `missing`.
/// - Exactly one result per identity. A counted machine that lands on an
///   identity already reported is folded into that result.
/// - Results are ordered by status priority, then machine ID (lexical).
///
/// The reference directory only feeds the serial-mapped step and display
/// enrichment; it never changes a classification.
pub fn reconcile(
    counter: &[CounterRecord],
    expected: &[ExpectedRecord],
    directory: &ReferenceDirectory,
    opts: &ReconcileOptions,
) -> Result<ReconcileReport, InvalidInputError> {
    validate(counter, expected)?;

    let serials = directory.serial_index();
    let machines = directory.machine_index();
    let counted = merge_counted(counter, &serials);
    let mut index = ExpectedIndex::build(expected);

    // (result, whether its machine ID names a directory machine)
    let mut pending: Vec<(ReconciliationResult, bool)> =
        Vec::with_capacity(counted.len() + index.len());
    let mut by_identity: HashMap<String, usize> = HashMap::with_capacity(counted.len());

    for machine in &counted {
        let key = MatchKey {
            machine_id: &machine.machine_id,
            serial_number: &machine.serial_number,
        };
        let hit = find_match(key, &index, &serials)
            .and_then(|(i, strategy)| index.get(i).cloned().map(|e| (i, e, strategy)));
        let (result, id_names_machine) = match hit {
            Some((i, row, strategy)) => {
                index.claim(i);
                debug!(
                    machine_id = %machine.machine_id,
                    row = %row.machine_id,
                    strategy = strategy.as_str(),
                    "counter record matched"
                );
                (matched_result(machine, &row, strategy, opts), true)
            }
            None => (extra_result(machine), machine.serial_resolved),
        };

        let identity = zero_stripped(&result.machine_id).into_owned();
        match by_identity.get(&identity) {
            Some(&i) => {
                debug!(
                    machine_id = %machine.machine_id,
                    into = %pending[i].0.machine_id,
                    "counted machine folded into existing result"
                );
                let (existing, trusted) = &mut pending[i];
                fold(existing, result, opts);
                *trusted = *trusted || id_names_machine || existing.matched_by.is_some();
            }
            None => {
                by_identity.insert(identity, pending.len());
                pending.push((result, id_names_machine));
            }
        }
    }

    for (_, row) in index.unclaimed() {
        pending.push((missing_result(row), true));
    }

    let mut results: Vec<ReconciliationResult> = pending
        .into_iter()
        .map(|(mut result, id_names_machine)| {
            let reference = reference_for(&result, id_names_machine, &machines, &serials);
            enrich(&mut result, reference);
            result
        })
        .collect();

    results.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.machine_id.cmp(&b.machine_id))
    });

    let mut counts = StatusCounts::default();
    for r in &results {
        counts.record(r.status);
    }
    let summary = ReconciliationSummary {
        total_expected: expected.iter().map(|r| r.expected_amount).sum(),
        total_counted: counter.iter().map(|r| r.total_counted).sum(),
        counts,
    };

    info!(
        results = results.len(),
        matched = counts.matched,
        mismatched = counts.mismatched,
        missing = counts.missing,
        extra = counts.extra,
        total_expected = %summary.total_expected,
        total_counted = %summary.total_counted,
        "reconciliation complete"
    );

    Ok(ReconcileReport { results, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(id: &str, serial: &str, counted: Amount) -> CounterRecord {
        CounterRecord {
            serial_number: serial.to_string(),
            internal_file_id: id.to_string(),
            resolved_machine_id: id.to_string(),
            date: String::new(),
            time: String::new(),
            physical_denomination_counts: Default::default(),
            virtual_denomination_counts: Default::default(),
            total_physical: counted,
            total_virtual: Amount::ZERO,
            total_counted: counted,
        }
    }

    fn run(c: &[CounterRecord], e: &[ExpectedRecord]) -> ReconcileReport {
        reconcile(c, e, &ReferenceDirectory::new(), &ReconcileOptions::default()).unwrap()
    }

    #[test]
    fn empty_inputs_produce_empty_report() {
        let r = run(&[], &[]);
        assert!(r.results.is_empty());
        assert_eq!(r.summary, ReconciliationSummary::default());
        assert!(r.summary.is_clean());
    }

    #[test]
    fn tolerance_is_strict() {
        let r = run(
            &[
                counter("1", "", Amount::from_micros(1_000_999_000)),
                counter("2", "", Amount::from_units(1001)),
            ],
            &[
                ExpectedRecord::new("1", Amount::from_units(1000)),
                ExpectedRecord::new("2", Amount::from_units(1000)),
            ],
        );
        assert_eq!(r.find("1").unwrap().status, ReconcileStatus::Match);
        assert_eq!(r.find("2").unwrap().status, ReconcileStatus::Mismatch);
        assert_eq!(r.find("2").unwrap().difference, Amount::from_units(1));
    }

    #[test]
    fn negative_difference_beyond_tolerance_is_mismatch() {
        let r = run(
            &[counter("1", "", Amount::from_units(900))],
            &[ExpectedRecord::new("1", Amount::from_units(1000))],
        );
        let m = r.find("1").unwrap();
        assert_eq!(m.status, ReconcileStatus::Mismatch);
        assert_eq!(m.difference, Amount::from_units(-100));
    }

    #[test]
    fn custom_tolerance_applies() {
        let opts = ReconcileOptions {
            tolerance: Amount::from_units(50),
        };
        let r = reconcile(
            &[counter("1", "", Amount::from_units(1040))],
            &[ExpectedRecord::new("1", Amount::from_units(1000))],
            &ReferenceDirectory::new(),
            &opts,
        )
        .unwrap();
        assert_eq!(r.results[0].status, ReconcileStatus::Match);
    }

    #[test]
    fn output_grouped_by_status_then_machine_id() {
        let r = run(
            &[
                counter("9", "", Amount::from_units(10)),
                counter("10", "", Amount::from_units(10)),
                counter("3", "", Amount::from_units(5)),
                counter("2", "", Amount::from_units(10)),
            ],
            &[
                ExpectedRecord::new("3", Amount::from_units(10)),
                ExpectedRecord::new("2", Amount::from_units(10)),
                ExpectedRecord::new("8", Amount::from_units(10)),
            ],
        );
        let order: Vec<(&str, ReconcileStatus)> = r
            .results
            .iter()
            .map(|x| (x.machine_id.as_str(), x.status))
            .collect();
        assert_eq!(
            order,
            vec![
                ("3", ReconcileStatus::Mismatch),
                ("8", ReconcileStatus::Missing),
                ("10", ReconcileStatus::Extra),
                ("9", ReconcileStatus::Extra),
                ("2", ReconcileStatus::Match),
            ]
        );
    }

    #[test]
    fn zero_padded_counter_ids_yield_one_result() {
        let r = run(
            &[
                counter("0042", "", Amount::from_units(5)),
                counter("42", "", Amount::from_units(5)),
            ],
            &[ExpectedRecord::new("42", Amount::from_units(5))],
        );
        assert_eq!(r.results.len(), 1);
        let m = r.find("42").unwrap();
        assert_eq!(m.status, ReconcileStatus::Mismatch);
        assert_eq!(m.counted_amount, Amount::from_units(10));
        assert_eq!(m.difference, Amount::from_units(5));
        assert_eq!(r.summary.counts.total(), 1);
    }

    #[test]
    fn counted_machine_landing_on_claimed_row_is_folded() {
        // "15" claims "15-B" by integer scan; "15-B" itself then finds nothing.
        let r = run(
            &[
                counter("15", "", Amount::from_units(4)),
                counter("15-B", "", Amount::from_units(6)),
            ],
            &[ExpectedRecord::new("15-B", Amount::from_units(10))],
        );
        assert_eq!(r.results.len(), 1);
        let m = &r.results[0];
        assert_eq!(m.machine_id, "15-B");
        assert_eq!(m.status, ReconcileStatus::Match);
        assert_eq!(m.counted_amount, Amount::from_units(10));
        assert_eq!(m.matched_by, Some(MatchStrategy::IntegerScan));
    }

    #[test]
    fn unresolved_internal_id_never_borrows_reference_data() {
        let mut dir = ReferenceDirectory::new();
        dir.insert(
            "200",
            ReferenceMachine::new("ZZ-OTHER")
                .with_location("Sala X")
                .with_zone("NORTE"),
        );
        let r = reconcile(
            &[counter("200", "A2", Amount::from_units(3000))],
            &[],
            &dir,
            &ReconcileOptions::default(),
        )
        .unwrap();
        let extra = &r.results[0];
        assert_eq!(extra.status, ReconcileStatus::Extra);
        assert_eq!(extra.serial_number.as_deref(), Some("A2"));
        assert!(extra.reference_data.is_none());
        assert_eq!(extra.zone, None);
        assert_eq!(extra.location, None);
    }

    #[test]
    fn serial_resolved_extra_is_enriched() {
        let mut dir = ReferenceDirectory::new();
        dir.insert("300", ReferenceMachine::new("S3").with_zone("SUR"));
        let mut rec = counter("300", "S3", Amount::from_units(10));
        rec.internal_file_id = "12".to_string();
        let r = reconcile(&[rec], &[], &dir, &ReconcileOptions::default()).unwrap();
        let extra = &r.results[0];
        assert_eq!(extra.status, ReconcileStatus::Extra);
        assert_eq!(extra.zone.as_deref(), Some("SUR"));
        assert!(extra.reference_data.is_some());
    }

    #[test]
    fn empty_ids_are_invalid_input() {
        let err = reconcile(
            &[counter(" ", "", Amount::ZERO)],
            &[],
            &ReferenceDirectory::new(),
            &ReconcileOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, InvalidInputError::EmptyCounterMachineId { index: 0 });

        let err = reconcile(
            &[],
            &[ExpectedRecord::new("1", Amount::ZERO), ExpectedRecord::new("", Amount::ZERO)],
            &ReferenceDirectory::new(),
            &ReconcileOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, InvalidInputError::EmptyExpectedMachineId { index: 1 });
    }

    #[test]
    fn enrichment_prefers_sheet_values_over_reference() {
        let mut dir = ReferenceDirectory::new();
        dir.insert(
            "1",
            ReferenceMachine::new("SER-1")
                .with_location("Ref Hall")
                .with_zone("REF"),
        );
        let r = reconcile(
            &[counter("1", "", Amount::from_units(10))],
            &[ExpectedRecord::new("1", Amount::from_units(10)).with_zone("SHEET")],
            &dir,
            &ReconcileOptions::default(),
        )
        .unwrap();
        let m = &r.results[0];
        assert_eq!(m.zone.as_deref(), Some("SHEET"));
        assert_eq!(m.location.as_deref(), Some("Ref Hall"));
        assert_eq!(m.serial_number.as_deref(), Some("SER-1"));
        assert!(m.reference_data.is_some());
        assert_eq!(m.status, ReconcileStatus::Match);
    }
}
