//! Session Replay - Main entry point
//!
//! This binary periodically captures a UI hierarchy described in a JSON file and
//! prints every sealed segment as one JSON line on stdout.

use chrono::Utc;
use serde::Deserialize;
use session_replay::{
    Base64ImageDataProvider, CaptureOutcome, ChannelSegmentTransport, Config, ElementTree,
    NoopResourcePipeline, RecordingContext, RecordingCoordinator, Segment, Size, TracingTelemetry,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line options
struct Options {
    config_path: Option<PathBuf>,
    hierarchy_path: PathBuf,
    interval_ms: Option<u64>,
}

/// Contents of the hierarchy file
#[derive(Debug, Deserialize)]
struct HierarchyFile {
    viewport: Size,
    application_id: String,
    session_id: String,
    view_id: String,
    #[serde(default)]
    server_time_offset_ms: i64,
    root: ElementTree,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config_path: None,
        hierarchy_path: PathBuf::from("hierarchy.json"),
        interval_ms: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("Session Replay v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    options.config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--interval" => {
                i += 1;
                if i < args.len() {
                    if let Ok(interval) = args[i].parse() {
                        options.interval_ms = Some(interval);
                    }
                }
            }
            path if !path.starts_with('-') => {
                options.hierarchy_path = PathBuf::from(path);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Use --help for usage information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    options
}

fn print_help() {
    println!(
        r#"Session Replay - view tree snapshot recorder

USAGE:
    session-replay [OPTIONS] [HIERARCHY]

ARGS:
    <HIERARCHY>             JSON hierarchy file, re-read on every capture (default: hierarchy.json)

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version
    -c, --config <PATH>     Path to configuration file
    --interval <MS>         Capture interval in milliseconds (default from config)
"#
    );
}

async fn load_hierarchy(path: &Path) -> Result<HierarchyFile, Box<dyn std::error::Error>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

fn recording_context(config: &Config, hierarchy: &HierarchyFile) -> RecordingContext {
    RecordingContext {
        text_and_input_privacy: config.privacy.text_and_input,
        image_privacy: config.privacy.image,
        touch_privacy: config.privacy.touch,
        application_id: hierarchy.application_id.clone(),
        session_id: hierarchy.session_id.clone(),
        view_id: hierarchy.view_id.clone(),
        server_time_offset_ms: hierarchy.server_time_offset_ms,
        date: Utc::now(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args();

    // Load configuration
    let config = match &options.config_path {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };

    // Initialize logging
    let filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Session Replay");

    if !config.general.enabled {
        info!("Recording is disabled in configuration, exiting");
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    // Create segment channel
    let (segment_tx, mut segment_rx) = mpsc::channel::<Segment>(100);

    // Spawn segment printer
    let printer = tokio::spawn(async move {
        while let Some(segment) = segment_rx.recv().await {
            match serde_json::to_string(&segment) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to encode segment: {}", e),
            }
        }
    });

    let mut coordinator = RecordingCoordinator::new(
        &config,
        Arc::new(ChannelSegmentTransport::new(segment_tx)),
        Arc::new(NoopResourcePipeline),
        Arc::new(Base64ImageDataProvider),
        Arc::new(TracingTelemetry),
    );

    let interval = Duration::from_millis(options.interval_ms.unwrap_or(config.capture.interval_ms).max(1));
    info!(
        "Capturing {:?} every {}ms",
        options.hierarchy_path,
        interval.as_millis()
    );

    // Main loop
    let mut tick_interval = tokio::time::interval(interval);
    while running.load(Ordering::SeqCst) {
        tick_interval.tick().await;

        let hierarchy = match load_hierarchy(&options.hierarchy_path).await {
            Ok(hierarchy) => hierarchy,
            Err(e) => {
                warn!("Failed to load hierarchy {:?}: {}", options.hierarchy_path, e);
                continue;
            }
        };

        let context = recording_context(&config, &hierarchy);
        match coordinator.capture(&hierarchy.root, hierarchy.viewport, &context) {
            CaptureOutcome::Captured => debug!("Captured view {}", context.view_id),
            CaptureOutcome::Skipped => debug!("Capture skipped"),
            CaptureOutcome::Disabled => break,
        }
    }

    info!("Shutting down");
    coordinator.stop().await;
    drop(coordinator);
    if let Err(e) = printer.await {
        error!("Segment printer failed: {}", e);
    }

    Ok(())
}
