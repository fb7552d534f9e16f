use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{parse, reconcile, report};

#[derive(Parser)]
#[command(name = "ccr")]
#[command(about = "Cash collection reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a counter export and print its records as JSON
    ParseCounter {
        file: PathBuf,

        /// Reference directory JSON used to resolve serials to machine IDs
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Write JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Parse an expected-values spreadsheet and print its records as JSON
    ParseSheet {
        file: PathBuf,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Reconcile a counter export against an expected-values spreadsheet
    Reconcile {
        #[arg(long)]
        counter: PathBuf,

        #[arg(long)]
        sheet: PathBuf,

        /// Reference directory JSON. Without it the directory is fetched from
        /// the back office (CONNECTED mode).
        #[arg(long)]
        reference: Option<PathBuf>,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write the results as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Submit the finished reconciliation to the back office
        #[arg(long, default_value_t = false)]
        submit: bool,

        /// Operator recorded on the submission (defaults to /operator/name)
        #[arg(long)]
        performed_by: Option<String>,

        /// Zone this collection round covers
        #[arg(long)]
        zone: Option<String>,

        /// Fail instead of warning when the config carries unused keys
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },

    /// Download a rendered back-office report
    Report {
        /// collection | discrepancies | zones
        #[arg(long)]
        kind: ccr_api::ReportKind,

        /// Collection day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        out: PathBuf,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> operator...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent when the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ParseCounter {
            file,
            reference,
            config_paths,
            out,
        } => parse::run_parse_counter(&file, reference.as_deref(), &config_paths, out.as_deref())?,

        Commands::ParseSheet {
            file,
            config_paths,
            out,
        } => parse::run_parse_sheet(&file, &config_paths, out.as_deref())?,

        Commands::Reconcile {
            counter,
            sheet,
            reference,
            config_paths,
            out,
            csv,
            submit,
            performed_by,
            zone,
            strict_config,
        } => {
            reconcile::run_reconcile(reconcile::ReconcileArgs {
                counter,
                sheet,
                reference,
                config_paths,
                out,
                csv,
                submit,
                performed_by,
                zone,
                strict_config,
            })
            .await?
        }

        Commands::Report {
            kind,
            date,
            config_paths,
            out,
        } => report::run_report(kind, date, &config_paths, &out).await?,

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = ccr_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
