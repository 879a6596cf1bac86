use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use calibration_panel::analysis::{
    format_event_message, EventLogEntry, KeypointStatus, RegionStatus, Severity, SystemMetrics,
    TimelineSummary,
};
use calibration_panel::protocol::ClassificationKind;
use calibration_panel::telemetry::{FrameCounters, MetricEvent};
use calibration_panel::{init_logging, AppConfig, Dashboard};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;

/// Newest events included in the replay summary
const SUMMARY_EVENT_LIMIT: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "tap_monitor",
    about = "Live and offline monitor for person-detection / tracker tap streams"
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// JSON configuration file; missing or invalid files fall back to defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a live stream and print periodic status lines
    Watch {
        /// Full ws:// or wss:// URL, overriding the configured endpoint
        #[arg(long, env = "TAP_MONITOR_URL")]
        url: Option<String>,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
        /// Write a calibration log export here on exit
        #[arg(long)]
        export_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        status_every_secs: u64,
    },
    /// Feed a JSON-lines capture through the pipeline and print a summary
    Replay {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Show how an event tag is labelled in the event log
    Classify {
        #[arg(long)]
        tag: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Watch {
            url,
            duration_secs,
            export_dir,
            status_every_secs,
        } => run_watch(
            config,
            url,
            duration_secs.map(Duration::from_secs),
            export_dir,
            Duration::from_secs(status_every_secs.max(1)),
        ),
        Commands::Replay { input, export_dir } => run_replay(config, &input, export_dir),
        Commands::Classify { tag } => run_classify(&tag),
    }
}

fn load_config(path: Option<&Path>) -> AppConfig {
    match path {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    }
}

fn run_watch(
    mut config: AppConfig,
    url: Option<String>,
    duration: Option<Duration>,
    export_dir: Option<PathBuf>,
    status_every: Duration,
) -> Result<ExitCode> {
    if url.is_some() {
        config.connection.url = url;
    }
    let dashboard = Dashboard::new(config).context("resolving stream endpoint")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let exhausted = runtime.block_on(async {
        dashboard.start().context("starting connection manager")?;

        let mut telemetry = dashboard.telemetry().stream();
        let mut status = tokio::time::interval(status_every);
        let ctrl_c = tokio::signal::ctrl_c();
        let deadline = async {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(ctrl_c, deadline);

        let mut exhausted = false;
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = &mut deadline => break,
                _ = status.tick() => println!("{}", dashboard.status()),
                Some(event) = telemetry.next() => {
                    if let MetricEvent::ReconnectExhausted { attempts } = event {
                        eprintln!("Connection failed after {attempts} reconnect attempts");
                        exhausted = true;
                        break;
                    }
                }
            }
        }

        dashboard
            .shutdown()
            .await
            .context("stopping connection manager")?;
        Ok::<_, anyhow::Error>(exhausted)
    })?;

    println!("{}", dashboard.status());
    if let Some(dir) = export_dir {
        let path = dashboard
            .export(Some(&dir))
            .with_context(|| format!("exporting to {}", dir.display()))?;
        println!("Exported {}", path.display());
    }
    let snapshot = dashboard.telemetry().snapshot();
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&snapshot.frames).context("serializing telemetry")?
    );

    Ok(if exhausted {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    })
}

fn run_replay(config: AppConfig, input: &Path, export_dir: Option<PathBuf>) -> Result<ExitCode> {
    let capture =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let dashboard = Dashboard::offline(config);

    let mut lines = 0usize;
    for line in capture.lines().map(str::trim).filter(|line| !line.is_empty()) {
        lines += 1;
        if dashboard.replay_line(line) != ClassificationKind::Decoded {
            log::debug!("[Replay] Line {} dropped", lines);
        }
    }

    let export = export_dir
        .map(|dir| {
            dashboard
                .export(Some(&dir))
                .with_context(|| format!("exporting to {}", dir.display()))
        })
        .transpose()?;

    let status = dashboard.status();
    let events = dashboard.view().events.snapshot();
    let summary = ReplaySummary {
        lines,
        frames: dashboard.telemetry().frame_counters(),
        metrics: status.metrics,
        keypoint_status: status.keypoint_status,
        region_status: status.region_status,
        timeline: status.timeline,
        event_count: events.len(),
        newest_events: events.entries().take(SUMMARY_EVENT_LIMIT).cloned().collect(),
        export,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::from(0))
}

fn run_classify(tag: &str) -> Result<ExitCode> {
    let payload = ClassifyPayload {
        tag,
        severity: Severity::classify(tag),
        message: format_event_message(tag),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct ReplaySummary {
    lines: usize,
    frames: FrameCounters,
    metrics: SystemMetrics,
    keypoint_status: KeypointStatus,
    region_status: RegionStatus,
    timeline: TimelineSummary,
    event_count: usize,
    newest_events: Vec<EventLogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<PathBuf>,
}

#[derive(Serialize)]
struct ClassifyPayload<'a> {
    tag: &'a str,
    severity: Severity,
    message: String,
}
