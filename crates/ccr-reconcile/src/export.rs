//! CSV export of reconciliation results.

use std::io::Write;

use crate::ReconciliationResult;

const HEADER: [&str; 11] = [
    "machine_id",
    "serial_number",
    "location",
    "zone",
    "expected",
    "counted",
    "physical",
    "virtual",
    "difference",
    "status",
    "matched_by",
];

/// Write `results` (already ordered) as CSV with a header row.
pub fn write_results_csv<W: Write>(results: &[ReconciliationResult], w: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(HEADER)?;
    for r in results {
        wtr.write_record([
            r.machine_id.as_str(),
            r.serial_number.as_deref().unwrap_or(""),
            r.location.as_deref().unwrap_or(""),
            r.zone.as_deref().unwrap_or(""),
            &r.expected_amount.to_string(),
            &r.counted_amount.to_string(),
            &r.counted_physical.to_string(),
            &r.counted_virtual.to_string(),
            &r.difference.to_string(),
            r.status.as_str(),
            r.matched_by.map(|m| m.as_str()).unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
