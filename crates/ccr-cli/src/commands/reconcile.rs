//! `reconcile`: parse both inputs, reconcile, export, optionally submit.
//!
//! OFFLINE when `--reference` is given and nothing is submitted; CONNECTED
//! otherwise (directory fetched from, and/or results submitted to, the back
//! office).

use anyhow::{bail, Context, Result};
use ccr_api::{BackOfficeApi, ReconciliationSubmission, SubmissionReceipt};
use ccr_config::{str_at, ConfigMode, LoadedConfig};
use ccr_counter::{parse_counter_file, CounterLayout};
use ccr_reconcile::export::write_results_csv;
use ccr_reconcile::{
    reconcile, summarize_by_zone, ReconcileOptions, ReconcileReport, ReconciliationResult,
    ReconciliationSummary, ZoneSummary,
};
use ccr_sheet::{parse_sheet_file, DetectionRules};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{check_unused_keys, connect_api, load_config, read_reference_file, write_json};

pub struct ReconcileArgs {
    pub counter: PathBuf,
    pub sheet: PathBuf,
    pub reference: Option<PathBuf>,
    pub config_paths: Vec<String>,
    pub out: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub submit: bool,
    pub performed_by: Option<String>,
    pub zone: Option<String>,
    pub strict_config: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileOutput<'a> {
    config_hash: &'a str,
    summary: &'a ReconciliationSummary,
    zones: Vec<ZoneSummary>,
    results: &'a [ReconciliationResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<SubmissionReceipt>,
}

pub fn mode_for(reference: Option<&Path>, submit: bool) -> ConfigMode {
    if reference.is_some() && !submit {
        ConfigMode::Offline
    } else {
        ConfigMode::Connected
    }
}

pub async fn run_reconcile(args: ReconcileArgs) -> Result<()> {
    let config = load_config(&args.config_paths)?;
    let mode = mode_for(args.reference.as_deref(), args.submit);
    check_unused_keys(&config, mode, args.strict_config)?;
    info!(mode = mode.as_str(), config_hash = %config.config_hash, "reconcile starting");

    // Fail before parsing when the submission could never be attributed.
    let performed_by = if args.submit {
        Some(resolve_operator(&config, args.performed_by.as_deref())?)
    } else {
        None
    };

    let api = match mode {
        ConfigMode::Connected => Some(connect_api(&config).await?),
        ConfigMode::Offline => None,
    };

    let directory = match (&args.reference, &api) {
        (Some(p), _) => read_reference_file(p)?,
        (None, Some(api)) => api
            .fetch_reference_directory()
            .await
            .context("fetch reference directory failed")?,
        (None, None) => bail!("either --reference or a reachable back office is required"),
    };

    let layout: CounterLayout = config.section("/counter")?;
    let rules: DetectionRules = config.section("/sheet/columns")?;
    let opts: ReconcileOptions = config.section("/reconcile")?;

    let counter = parse_counter_file(&args.counter, &directory, &layout)
        .with_context(|| format!("counter parse failed: {}", args.counter.display()))?;
    let expected = parse_sheet_file(&args.sheet, &rules)
        .with_context(|| format!("spreadsheet parse failed: {}", args.sheet.display()))?;

    let report = reconcile(&counter, &expected, &directory, &opts)?;

    if let Some(csv_path) = &args.csv {
        write_csv(&report, csv_path)?;
    }

    let receipt = match (&api, performed_by) {
        (Some(api), Some(by)) => {
            let submission = ReconciliationSubmission::new(
                by,
                args.zone.clone(),
                config.config_hash.clone(),
                report.clone(),
            );
            Some(
                api.submit_reconciliation(&submission)
                    .await
                    .context("submit reconciliation failed")?,
            )
        }
        _ => None,
    };

    let output = ReconcileOutput {
        config_hash: &config.config_hash,
        summary: &report.summary,
        zones: summarize_by_zone(&report.results),
        results: &report.results,
        receipt,
    };
    write_json(&output, args.out.as_deref())
}

fn resolve_operator(config: &LoadedConfig, flag: Option<&str>) -> Result<String> {
    flag.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| str_at(&config.config_json, "/operator/name"))
        .context("--submit requires --performed-by or /operator/name in config")
}

fn write_csv(report: &ReconcileReport, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create failed: {}", path.display()))?;
    write_results_csv(&report.results, BufWriter::new(file))
        .with_context(|| format!("csv export failed: {}", path.display()))?;
    info!(path = %path.display(), rows = report.results.len(), "csv written");
    Ok(())
}
