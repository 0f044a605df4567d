//! Wearable Segmenter CLI
//!
//! Cuts IMU recordings into fixed-length windows per subject and activity.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wearable_segmenter::{
    config::{ColumnConfig, Config},
    core::{windowing::window_count, Record, TimeWindowSegmenter, WindowSummary},
    source::load_table,
    stats::{PipelineStats, StatsSnapshot},
    VERSION,
};

#[derive(Parser)]
#[command(name = "wearable-segment")]
#[command(version = VERSION)]
#[command(about = "Segment wearable IMU recordings into uniform time windows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that read an input file.
#[derive(clap::Args)]
struct InputArgs {
    /// Input file (json, jsonl or csv)
    #[arg(long, short)]
    input: PathBuf,

    /// Configuration file (defaults to the user config, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling rate of the input in Hz
    #[arg(long)]
    rate: Option<f64>,

    /// Resample every group to this rate (Hz) before segmenting
    #[arg(long)]
    resample: Option<f64>,

    /// Accelerometer columns, comma-separated
    #[arg(long)]
    acc_columns: Option<String>,

    /// Gyroscope columns, comma-separated
    #[arg(long)]
    gyr_columns: Option<String>,

    /// Keep axis cells as they are instead of extracting numbers
    #[arg(long)]
    no_clean: bool,

    /// Skip timestamp normalization and sorting
    #[arg(long)]
    no_fix_timestamps: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a recording into windows
    Segment {
        #[command(flatten)]
        input: InputArgs,

        /// Window length in seconds
        #[arg(long)]
        window_size: Option<f64>,

        /// Step between window starts in seconds
        #[arg(long)]
        step_size: Option<f64>,

        /// Write window summaries to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "jsonl")]
        format: String,

        /// Include the window records in the export
        #[arg(long)]
        with_records: bool,

        /// Stop after this many windows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Check sampling continuity of every group
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Allowed deviation from the sampling period in milliseconds
        #[arg(long, default_value = "5")]
        tolerance_ms: f64,
    },

    /// Show configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },

    /// Show cumulative statistics of previous runs
    Status {
        /// Clear the cumulative statistics
        #[arg(long)]
        reset: bool,
    },
}

/// One exported window.
#[derive(Serialize)]
struct WindowExport<'a> {
    run_id: &'a str,
    #[serde(flatten)]
    summary: WindowSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a [Record]>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Segment {
            input,
            window_size,
            step_size,
            output,
            format,
            with_records,
            limit,
        } => cmd_segment(
            &input,
            window_size,
            step_size,
            output,
            &format,
            with_records,
            limit,
        ),
        Commands::Check {
            input,
            tolerance_ms,
        } => cmd_check(&input, tolerance_ms),
        Commands::Config { init } => cmd_config(init),
        Commands::Status { reset } => cmd_status(reset),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Resolve configuration from file and command-line overrides.
fn resolve_config(args: &InputArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading configuration from {path:?}"))?,
        None => Config::load().unwrap_or_default(),
    };

    if let Some(rate) = args.rate {
        config.sampling_rate = rate;
    }
    if let Some(ref acc) = args.acc_columns {
        config.columns.acc = ColumnConfig::parse_triple(acc)
            .with_context(|| format!("expected three accelerometer columns, got {acc:?}"))?;
    }
    if let Some(ref gyr) = args.gyr_columns {
        config.columns.gyr = ColumnConfig::parse_triple(gyr)
            .with_context(|| format!("expected three gyroscope columns, got {gyr:?}"))?;
    }
    if args.no_clean {
        config.clean_columns = false;
    }
    if args.no_fix_timestamps {
        config.fix_timestamps = false;
    }
    Ok(config)
}

/// Load the input and build a segmenter, resampling when requested.
fn build_segmenter(args: &InputArgs, config: Config) -> anyhow::Result<TimeWindowSegmenter> {
    let table = load_table(&args.input).with_context(|| format!("reading {:?}", args.input))?;
    let mut segmenter = TimeWindowSegmenter::new(config, &table)?;

    if let Some(target) = args.resample {
        segmenter.resample_to(target)?;
    }
    Ok(segmenter)
}

fn cmd_segment(
    input: &InputArgs,
    window_size: Option<f64>,
    step_size: Option<f64>,
    output: Option<PathBuf>,
    format: &str,
    with_records: bool,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    if format != "json" && format != "jsonl" {
        bail!("unknown export format {format:?} (expected json or jsonl)");
    }

    let mut config = resolve_config(input)?;
    if let Some(seconds) = window_size {
        config.window_size = seconds;
    }
    if let Some(seconds) = step_size {
        config.step_size = seconds;
    }

    println!("Wearable Segmenter v{VERSION}");
    println!();

    let segmenter = build_segmenter(input, config)?;
    let sizing = segmenter.sizing();
    println!("Input: {:?}", input.input);
    println!("  Groups: {}", segmenter.groups().len());
    println!("  Records: {}", segmenter.len());
    println!("  Sampling rate: {} Hz", segmenter.sampling_rate());
    println!(
        "  Window: {} records, step {} records",
        sizing.window_len, sizing.step_len
    );
    println!(
        "  Full windows: {}",
        segmenter
            .groups()
            .iter()
            .map(|g| window_count(g.len(), sizing))
            .sum::<usize>()
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let run_id = Uuid::new_v4().to_string();
    let mut exported: Vec<String> = Vec::new();
    let mut summaries: Vec<serde_json::Value> = Vec::new();
    let mut emitted = 0_usize;

    for window in segmenter.segment().take(limit.unwrap_or(usize::MAX)) {
        if !running.load(Ordering::SeqCst) {
            println!("Interrupted, stopping segmentation.");
            break;
        }

        let summary = window.summary();
        println!(
            "[{}] {} window #{}: {} records from offset {}",
            summary
                .start
                .map(|s| s.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
                .unwrap_or_else(|| "no time".to_string()),
            window.key(),
            summary.index,
            summary.records,
            summary.offset
        );

        if output.is_some() {
            let export = WindowExport {
                run_id: &run_id,
                summary,
                records: with_records.then(|| window.records()),
            };
            if format == "jsonl" {
                exported.push(serde_json::to_string(&export).context("serializing window")?);
            } else {
                summaries.push(serde_json::to_value(&export).context("serializing window")?);
            }
        }
        emitted += 1;
    }

    if let Some(path) = output {
        let content = if format == "jsonl" {
            exported.join("\n")
        } else {
            serde_json::to_string_pretty(&summaries).context("serializing windows")?
        };
        write_export(&path, &content)?;
        println!();
        println!("Exported {emitted} windows to {path:?}");
    }

    let stats = segmenter.stats();
    println!();
    println!("This run:");
    println!("{}", stats.summary());

    if let Err(e) = persist_run(segmenter.config(), &stats.snapshot()) {
        tracing::warn!("Could not save pipeline stats: {e}");
    }
    Ok(())
}

/// Fold one run's counters into the cumulative statistics file.
fn persist_run(config: &Config, run: &StatsSnapshot) -> anyhow::Result<()> {
    config.ensure_directories()?;
    let totals = PipelineStats::with_persistence(stats_path(config));
    totals.absorb(run);
    totals.save()?;
    Ok(())
}

fn stats_path(config: &Config) -> PathBuf {
    config.data_path.join("stats.json")
}

fn cmd_check(input: &InputArgs, tolerance_ms: f64) -> anyhow::Result<()> {
    let config = resolve_config(input)?;
    let segmenter = build_segmenter(input, config)?;

    println!(
        "Continuity at {} Hz (tolerance {} ms)",
        segmenter.sampling_rate(),
        tolerance_ms
    );
    println!("=================================");

    let reports = segmenter.check_continuity(tolerance_ms);
    let continuous = reports.iter().filter(|(_, r)| r.is_continuous()).count();
    for (group, (key, report)) in segmenter.groups().iter().zip(&reports) {
        let mark = if report.is_continuous() { "✓" } else { "✗" };
        let span = group
            .time_span()
            .map(|(first, last)| format!(" [{first}..{last} ms]"))
            .unwrap_or_default();
        println!("{mark} {key}{span}: {}", report.describe());
    }

    println!();
    println!("{continuous}/{} groups continuous", reports.len());
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    if init {
        let path = Config::config_path();
        if path.exists() {
            bail!("configuration already exists at {path:?}");
        }
        Config::default()
            .save()
            .with_context(|| format!("writing {path:?}"))?;
        println!("Wrote default configuration to {path:?}");
        return Ok(());
    }

    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("serializing configuration")?
    );
    Ok(())
}

fn cmd_status(reset: bool) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    if reset {
        let totals = PipelineStats::with_persistence(stats_path(&config));
        totals.reset();
        totals.save()?;
        println!("Cumulative statistics cleared.");
        return Ok(());
    }

    println!("Wearable Segmenter Status");
    println!("=========================");
    println!();

    let path = stats_path(&config);
    if !path.exists() {
        println!("No previous run data found.");
        return Ok(());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {path:?}"))?;
    let stats: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {path:?}"))?;

    println!("Cumulative Statistics:");
    for (label, field) in [
        ("Records loaded", "records_loaded"),
        ("Invalid timestamps", "invalid_timestamps"),
        ("Records after resampling", "records_resampled"),
        ("Windows emitted", "windows_emitted"),
        ("Tail slices dropped", "windows_dropped"),
        ("Last updated", "last_updated"),
    ] {
        if let Some(value) = stats.get(field) {
            println!("  {label}: {value}");
        }
    }
    Ok(())
}

fn write_export(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
    }
    std::fs::write(path, content).with_context(|| format!("writing {path:?}"))?;
    tracing::debug!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {e}");
    }
}
