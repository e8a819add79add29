use crate::backend::Backend;
use crate::model::{Action, BlobEncoding, InvocationReport, RunConfig};
use crate::runner::DisplayState;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "json-field-harness",
    version,
    about = "Exercise a JSON-typed model field through a hosted GraphQL API and a local store"
)]
pub struct Cli {
    /// GraphQL endpoint of the hosted API
    #[arg(long, env = "HARNESS_API_URL")]
    pub api_url: Option<String>,

    /// API key sent as the x-api-key header
    #[arg(long, env = "HARNESS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Root directory of the local record store
    #[arg(long, env = "HARNESS_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// How the sample object is written into the JSON fields
    #[arg(long, value_enum, default_value_t = BlobEncoding::Stringified)]
    pub blob_encoding: BlobEncoding,

    /// HTTP request timeout for API actions
    #[arg(long, default_value = "10s")]
    pub timeout: humantime::Duration,

    /// Action to run in --json or --text mode
    #[arg(long, value_enum)]
    pub action: Option<Action>,

    /// Run --action once and print the report as JSON (no TUI)
    #[arg(long, requires = "action", conflicts_with = "text")]
    pub json: bool,

    /// Run --action once and print a text summary (no TUI)
    #[arg(long, requires = "action")]
    pub text: bool,

    /// Also write the report of a one-shot run to this file
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

impl Cli {
    pub fn is_one_shot(&self) -> bool {
        self.json || self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    #[cfg(feature = "tui")]
    if !args.is_one_shot() {
        check_tui_args(&args)?;
        return crate::tui::run(args).await;
    }

    init_tracing();
    let action = args
        .action
        .context("--action is required without the TUI (see --help for the list)")?;
    let report = run_once(&args, action).await?;
    print_report(&args, &report).await?;

    if report.result.is_failure() {
        return Err(anyhow::anyhow!("{} failed", action.label()));
    }
    Ok(())
}

/// Reject flags that only mean something for one-shot runs.
#[cfg(feature = "tui")]
fn check_tui_args(args: &Cli) -> Result<()> {
    if args.export_json.is_some() {
        return Err(anyhow::anyhow!(
            "--export-json only applies to --json or --text runs. Press 's' in the TUI to save."
        ));
    }
    Ok(())
}

/// Install the stderr log subscriber for one-shot modes. The TUI owns the terminal instead.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("json_field_harness=warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        api_url: args.api_url.clone(),
        api_key: args.api_key.clone(),
        store_dir: args
            .store_dir
            .clone()
            .unwrap_or_else(crate::storage::default_store_dir),
        blob_encoding: args.blob_encoding,
        timeout: Duration::from(args.timeout),
        user_agent: format!("json-field-harness/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Run a single action through the operation runner.
async fn run_once(args: &Cli, action: Action) -> Result<InvocationReport> {
    let cfg = build_config(args);
    let backend = Backend::new(&cfg)?;
    let mut display = DisplayState::default();

    let started = Instant::now();
    backend.invoke_into(action, &mut display).await;
    Ok(InvocationReport::new(
        action,
        started.elapsed(),
        display.into_result(),
    ))
}

async fn print_report(args: &Cli, report: &InvocationReport) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();

    if args.json {
        let out = serde_json::to_string_pretty(report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "== {} ({}) ==",
            report.action.label(),
            humantime::format_duration(round_to_millis(report.elapsed))
        )));
        let summary = crate::text_summary::build_text_summary(&report.result);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    let export_res = match args.export_json.as_deref() {
        Some(p) => crate::storage::export_json(p, report).map(|()| {
            let _ = out_tx.send(OutputLine::Stderr(format!("Exported: {}", p.display())));
        }),
        None => Ok(()),
    };

    drop(out_tx);
    let _ = out_handle.await;
    export_res
}

fn round_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
