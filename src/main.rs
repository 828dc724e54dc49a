//! Telemetry Viewport CLI
//!
//! Live sliding-window statistics for multi-axis sensor feeds.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_viewport::{
    activity::{ActivityLog, ActivityRecord},
    collector::{create_source, CsvReplaySource},
    config::{Config, SourceKind},
    scheduler::{RefreshEvent, RefreshScheduler, SchedulerConfig},
    summary_table, Dashboard, RenderPayload, ViewportPolicy, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "telemetry-viewport")]
#[command(version = VERSION)]
#[command(about = "Live sliding-window statistics for multi-axis sensor feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh periodically from a source and print every frame
    Watch {
        /// Sample source (simulated or csv)
        #[arg(long)]
        source: Option<String>,

        /// CSV file to replay (implies --source csv)
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Number of samples in view
        #[arg(long)]
        window_size: Option<usize>,

        /// Seconds between refresh ticks
        #[arg(long)]
        interval: Option<f64>,

        /// Maximum retained samples (oldest evicted first)
        #[arg(long)]
        capacity: Option<usize>,

        /// Viewport policy on new data (preserve, follow-latest, follow-unless-paging)
        #[arg(long)]
        policy: Option<String>,

        /// Print each frame as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Load a CSV file once and summarize one viewport of it
    Summarize {
        /// CSV file with timestamp,x,y,z columns
        #[arg(long, short)]
        file: PathBuf,

        /// First sample in view
        #[arg(long, default_value = "0")]
        offset: i64,

        /// Number of samples in view
        #[arg(long)]
        size: Option<i64>,

        /// Print the payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cumulative activity statistics
    Status,

    /// Show configuration
    Config,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch {
            source,
            file,
            window_size,
            interval,
            capacity,
            policy,
            json,
            ticks,
        } => {
            let overrides = WatchOverrides {
                source,
                file,
                window_size,
                interval,
                capacity,
                policy,
            };
            cmd_watch(overrides, json, ticks)
        }
        Commands::Summarize {
            file,
            offset,
            size,
            json,
        } => cmd_summarize(file, offset, size, json),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Command-line values that override the config file.
struct WatchOverrides {
    source: Option<String>,
    file: Option<PathBuf>,
    window_size: Option<usize>,
    interval: Option<f64>,
    capacity: Option<usize>,
    policy: Option<String>,
}

impl WatchOverrides {
    fn apply(self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(source) = self.source {
            config.source.kind =
                SourceKind::parse(&source).ok_or_else(|| anyhow!("unknown source '{source}'"))?;
        }
        if let Some(file) = self.file {
            config.source.kind = SourceKind::Csv;
            config.source.csv_path = Some(file);
        }
        if let Some(size) = self.window_size {
            config.window_size = size;
        }
        if let Some(secs) = self.interval {
            config.refresh_interval = Duration::try_from_secs_f64(secs)
                .map_err(|e| anyhow!("invalid interval {secs}: {e}"))?;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = Some(capacity);
        }
        if let Some(policy) = self.policy {
            config.viewport_policy = ViewportPolicy::parse(&policy)
                .ok_or_else(|| anyhow!("unknown viewport policy '{policy}'"))?;
        }
        Ok(())
    }
}

fn cmd_watch(overrides: WatchOverrides, json: bool, max_ticks: Option<u64>) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    overrides.apply(&mut config)?;
    // Startup configuration errors are fatal.
    config.validate().context("invalid configuration")?;

    println!("Telemetry Viewport v{VERSION}");
    println!();
    println!("  Source: {:?}", config.source.kind);
    println!("  Window size: {}", config.window_size);
    println!("  Refresh interval: {:.1}s", config.refresh_interval.as_secs_f64());
    match config.capacity {
        Some(cap) => println!("  Capacity: {cap} samples"),
        None => println!("  Capacity: unbounded"),
    }
    println!("  Viewport policy: {:?}", config.viewport_policy);
    println!("  Std dev: {:?}", config.stddev);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let dashboard = Arc::new(Dashboard::new(&config)?);
    let source = create_source(&config.source).context("creating sample source")?;
    let activity = Arc::new(ActivityLog::persistent(config.activity_path()));

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let _guard = runtime.enter();

    let mut scheduler = RefreshScheduler::new(
        SchedulerConfig::from(&config),
        dashboard.clone(),
        source,
        activity.clone(),
    );
    let events = scheduler.subscribe();

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    scheduler.start()?;

    let mut seen_ticks = 0u64;
    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(RefreshEvent::DataArrived {
                count,
                last_timestamp,
            }) => {
                seen_ticks += 1;
                let payload = dashboard.render_payload();
                if json {
                    println!("{}", serde_json::to_string(&payload)?);
                } else {
                    let stamp = last_timestamp
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("[{stamp}] +{count} samples");
                    print_payload(&payload);
                }

                if max_ticks.is_some_and(|max| seen_ticks >= max) {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Refresh scheduler disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping refresh...");
    runtime.block_on(scheduler.join());

    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity log: {e}");
    }

    println!();
    println!("{}", activity.summary());
    Ok(())
}

fn cmd_summarize(file: PathBuf, offset: i64, size: Option<i64>, json: bool) -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    let mut source = CsvReplaySource::open(&file, usize::MAX)
        .with_context(|| format!("reading {}", file.display()))?;

    let rejected = source.rejected_rows().len();
    let dashboard = Dashboard::new(&config)?;
    let report = dashboard.ingest(source.drain_all());

    if let Some(size) = size {
        dashboard.set_size(size)?;
    }
    dashboard.advance(offset)?;

    let payload = dashboard.render_payload();
    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "Loaded {} samples from {:?} ({} unparseable rows, {} out of order)",
        report.accepted,
        file,
        rejected,
        report.rejected_count()
    );
    print_payload(&payload);
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Telemetry Viewport Status");
    println!("=========================");
    println!();

    let path = config.activity_path();
    if !path.exists() {
        println!("No previous session data found.");
        return Ok(());
    }

    let record =
        ActivityRecord::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let totals = record.totals;
    println!("Cumulative Statistics ({} sessions):", record.sessions);
    println!("  Refresh ticks: {}", totals.ticks);
    println!("  Samples accepted: {}", totals.samples_accepted);
    println!("  Samples rejected: {}", totals.samples_rejected);
    println!("  Samples evicted: {}", totals.samples_evicted);
    println!("  Failed fetches: {}", totals.fetch_failures);
    println!("  Last updated: {}", record.last_updated.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;
    if let Err(e) = config.validate() {
        bail!("configuration at {:?} is invalid: {e}", Config::config_path());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn print_payload(payload: &RenderPayload) {
    let viewport = payload.viewport;
    println!(
        "  Viewport: samples {}..{} of {} (size {})",
        viewport.offset,
        viewport.offset + payload.slice.len(),
        payload.total_samples,
        viewport.size
    );
    for line in summary_table(&payload.summary).lines() {
        println!("    {line}");
    }
    println!();
}
