//! Counter file + sheet + reference directory through the whole pipeline.
//!
//! Machine A1 maps to 100 via the directory and matches exactly; A2 is
//! unmapped and keeps its file key 200 (extra); 300 was never counted
//! (missing).

use anyhow::Result;
use ccr_config::{load_layered_yaml_from_strings, LoadedConfig};
use ccr_reconcile::{MatchStrategy, ReconcileStatus};
use ccr_schemas::{Amount, ReferenceDirectory, ReferenceMachine};
use ccr_testkit::{load_reference_json, run_pipeline, CounterFileBuilder, FixtureDir};

fn directory() -> ReferenceDirectory {
    let mut dir = ReferenceDirectory::new();
    dir.insert("100", ReferenceMachine::new("A1").with_location("Sala Norte"));
    dir
}

fn counter_file() -> String {
    CounterFileBuilder::new()
        .machine("A1", "1", &[(1000, 5)], &[])
        .machine("A2", "200", &[(1000, 3)], &[])
        .build()
}

#[test]
fn scenario_end_to_end_reconciliation() -> Result<()> {
    let fx = FixtureDir::new()?;
    let counter = fx.write("counter.txt", counter_file())?;
    let sheet = fx.write("expected.csv", "Machine,Amount\n100,5000\n300,1000\n")?;

    let report = run_pipeline(&counter, &sheet, &directory(), &LoadedConfig::empty()?)?;

    let got: Vec<(&str, ReconcileStatus, Amount)> = report
        .results
        .iter()
        .map(|r| (r.machine_id.as_str(), r.status, r.difference))
        .collect();
    assert_eq!(
        got,
        vec![
            ("300", ReconcileStatus::Missing, Amount::from_units(-1000)),
            ("200", ReconcileStatus::Extra, Amount::from_units(3000)),
            ("100", ReconcileStatus::Match, Amount::ZERO),
        ]
    );

    let s = report.summary;
    assert_eq!(s.total_expected, Amount::from_units(6000));
    assert_eq!(s.total_counted, Amount::from_units(8000));
    assert_eq!((s.counts.matched, s.counts.missing, s.counts.extra), (1, 1, 1));

    let matched = report.find("100").unwrap();
    assert_eq!(matched.matched_by, Some(MatchStrategy::Exact));
    assert_eq!(matched.serial_number.as_deref(), Some("A1"));
    assert_eq!(matched.location.as_deref(), Some("Sala Norte"));
    Ok(())
}

#[test]
fn scenario_reference_round_trips_through_disk() -> Result<()> {
    let fx = FixtureDir::new()?;
    let path = fx.write_reference("machines.json", &directory())?;
    assert_eq!(load_reference_json(&path)?, directory());
    Ok(())
}

#[test]
fn scenario_config_tunes_every_stage() -> Result<()> {
    // Non-default markers, a site-specific amount header and a wider tolerance.
    let counter_src = counter_file().replace("H;", "CAB;").replace("\nD;", "\nDET;");
    let fx = FixtureDir::new()?;
    let counter = fx.write("counter.txt", counter_src)?;
    let sheet = fx.write("expected.csv", "Equipo;Saldo\n100;4990\n")?;

    let config = load_layered_yaml_from_strings(&[r#"
counter:
  header_marker: CAB
  data_marker: DET
sheet:
  columns:
    machine_id: [equipo]
    amount: [saldo]
reconcile:
  tolerance: 20
"#])?;

    let report = run_pipeline(&counter, &sheet, &directory(), &config)?;
    let m = report.find("100").unwrap();
    assert_eq!(m.status, ReconcileStatus::Match);
    assert_eq!(m.difference, Amount::from_units(10));
    assert_eq!(report.summary.counts.extra, 1);
    Ok(())
}
