//! Command handlers for the `ccr` binary.
//!
//! Shared plumbing (config loading, output, back-office connection) lives
//! here; command-specific logic lives in the submodules.

pub mod parse;
pub mod reconcile;
pub mod report;

use anyhow::{bail, Context, Result};
use ccr_api::{BackOfficeApi, HttpBackOfficeApi};
use ccr_config::{
    report_unused_keys, resolve_credentials_for_mode, str_at, ConfigMode, LoadedConfig,
    UnusedKeyPolicy,
};
use ccr_schemas::ReferenceDirectory;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Load layered config; no paths means all defaults.
pub fn load_config(config_paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    ccr_config::load_layered_yaml(&path_refs)
}

/// Warn about (or, when `strict`, refuse) config keys nothing reads in `mode`.
pub fn check_unused_keys(config: &LoadedConfig, mode: ConfigMode, strict: bool) -> Result<()> {
    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(mode, &config.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        warn!(mode = report.mode.as_str(), pointer = p.as_str(), "unused config key");
    }
    Ok(())
}

pub fn read_reference_file(path: &Path) -> Result<ReferenceDirectory> {
    let bytes =
        fs::read(path).with_context(|| format!("read reference failed: {}", path.display()))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    serde_json::from_slice(bytes).with_context(|| {
        format!(
            "reference file must be a JSON object keyed by machine id: {}",
            path.display()
        )
    })
}

/// Pretty JSON to `out`, or to stdout.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("json serialize failed")?;
    match out {
        Some(p) => {
            fs::write(p, s + "\n").with_context(|| format!("write failed: {}", p.display()))?;
            info!(path = %p.display(), "output written");
        }
        None => println!("{s}"),
    }
    Ok(())
}

/// Authenticated back-office client from `/api/*` config and env credentials.
pub async fn connect_api(config: &LoadedConfig) -> Result<HttpBackOfficeApi> {
    let json = &config.config_json;
    let base_url = str_at(json, "/api/base_url")
        .context("CONFIG_MISSING /api/base_url is required to reach the back office")?;
    let timeout = match json.pointer("/api/timeout_secs") {
        None => DEFAULT_TIMEOUT_SECS,
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 => n,
            _ => bail!("CONFIG_INVALID_SECTION /api/timeout_secs must be a positive integer"),
        },
    };

    let creds = resolve_credentials_for_mode(json, ConfigMode::Connected)?;
    let http = reqwest_client(timeout)?;
    let api = HttpBackOfficeApi::with_client(base_url, http);

    let token = match (creds.token, creds.username, creds.password) {
        (Some(token), _, _) => token,
        (None, Some(user), Some(pass)) => api
            .login(&user, &pass)
            .await
            .context("back office login failed")?,
        // resolve_credentials_for_mode already refused this combination.
        _ => bail!("SECRETS_MISSING mode=CONNECTED"),
    };
    Ok(api.with_token(token))
}

fn reqwest_client(timeout_secs: u64) -> Result<ccr_api::reqwest::Client> {
    ccr_api::reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("http client build failed")
}
