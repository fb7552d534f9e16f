//! `report`: download a rendered back-office report to disk.

use anyhow::{Context, Result};
use ccr_api::{BackOfficeApi, ReportKind};
use ccr_config::ConfigMode;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::info;

use super::{check_unused_keys, connect_api, load_config};

pub async fn run_report(
    kind: ReportKind,
    date: NaiveDate,
    config_paths: &[String],
    out: &Path,
) -> Result<()> {
    let config = load_config(config_paths)?;
    check_unused_keys(&config, ConfigMode::Connected, false)?;

    let api = connect_api(&config).await?;
    let bytes = api
        .fetch_report(kind, date)
        .await
        .with_context(|| format!("fetch {kind} report for {date} failed"))?;

    fs::write(out, &bytes).with_context(|| format!("write failed: {}", out.display()))?;
    info!(kind = kind.as_str(), %date, bytes = bytes.len(), path = %out.display(), "report saved");
    println!("report_written=true path={} bytes={}", out.display(), bytes.len());
    Ok(())
}
