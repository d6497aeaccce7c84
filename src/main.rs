//! Ocular Sensor CLI
//!
//! Real-time operator eye monitoring from recorded landmark streams.

use clap::{Parser, Subcommand};
use ocular_sensor_agent::{
    capture::{CollectorConfig, FrameCollector, ReplaySource},
    config::Config,
    core::{run_session, MonitoringSession, OcularEvent, SessionEnd, SessionSummary, SessionStep},
    sink::{read_records, EventSink, FanoutSink, JsonlFileSink},
    transparency::create_shared_log_with_persistence,
    MONITORING_NOTICE, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "gateway")]
use ocular_sensor_agent::{sink::BackgroundSink, GatewayConfig, HttpSink};

/// Records buffered for the gateway writer thread.
#[cfg(feature = "gateway")]
const GATEWAY_QUEUE: usize = 1024;

#[derive(Parser)]
#[command(name = "ocular-sensor")]
#[command(version = VERSION)]
#[command(about = "Real-time operator eye monitoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor a recorded landmark stream
    Start {
        /// Replay file (JSON Lines, one frame per line)
        #[arg(long, short)]
        input: PathBuf,

        /// Operator name stamped on every record (defaults to the configured name)
        #[arg(long)]
        operator: Option<String>,

        /// Output file for session records (defaults to the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pace the replay at its recorded frame offsets
        #[arg(long)]
        realtime: bool,

        /// Serve the live API on this port (requires server feature)
        #[arg(long)]
        serve_port: Option<u16>,

        /// Forward records to a readings gateway at host:port (requires gateway feature)
        #[arg(long)]
        gateway_url: Option<String>,

        /// Bearer token for the gateway
        #[arg(long)]
        gateway_token: Option<String>,
    },

    /// Summarize an exported session file
    Summary {
        /// Session records (.jsonl)
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cumulative monitoring statistics
    Status,

    /// Display the monitoring notice
    Notice,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            input,
            operator,
            output,
            realtime,
            serve_port,
            gateway_url,
            gateway_token,
        } => {
            cmd_start(StartArgs {
                input,
                operator,
                output,
                realtime,
                serve_port,
                gateway_url,
                gateway_token,
            });
        }
        Commands::Summary { file, json } => {
            cmd_summary(&file, json);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Notice => {
            println!("{MONITORING_NOTICE}");
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

struct StartArgs {
    input: PathBuf,
    operator: Option<String>,
    output: Option<PathBuf>,
    realtime: bool,
    serve_port: Option<u16>,
    gateway_url: Option<String>,
    gateway_token: Option<String>,
}

fn cmd_start(args: StartArgs) {
    println!("Ocular Sensor Agent v{VERSION}");
    println!();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}. Using default configuration.");
            Config::default()
        }
    };
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let operator = args
        .operator
        .or_else(|| Some(config.operator_name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| "operator".to_string());

    let source = match ReplaySource::from_path(&args.input) {
        Ok(source) => source.realtime(args.realtime),
        Err(e) => {
            eprintln!("Error loading {:?}: {e}", args.input);
            std::process::exit(1);
        }
    };

    let output_path = args.output.unwrap_or_else(|| {
        config.export_path.join(format!(
            "session_{}.jsonl",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ))
    });
    let file_sink = match JsonlFileSink::create(&output_path) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error opening output: {e}");
            std::process::exit(1);
        }
    };

    println!("Starting monitoring...");
    println!("  Operator: {operator}");
    println!("  Input: {:?} ({} frames)", args.input, source.len());
    println!("  Output: {output_path:?}");
    println!(
        "  EAR threshold: {} | blink debounce: {} frames | alarm after: {:.1}s",
        config.engine.ear_threshold,
        config.engine.min_consec_frames,
        config.engine.alarm_duration.as_secs_f64()
    );

    #[allow(unused_mut)]
    let mut sinks = FanoutSink::new().with(file_sink);

    #[cfg(feature = "server")]
    let live_server = match args.serve_port {
        Some(port) => match start_live_server(port, config.history_limit) {
            Ok((server, store)) => {
                sinks = sinks.with(store);
                Some(server)
            }
            Err(e) => {
                eprintln!("Warning: Live API failed to start: {e}");
                None
            }
        },
        None => None,
    };
    #[cfg(not(feature = "server"))]
    if args.serve_port.is_some() {
        eprintln!("Warning: --serve-port ignored (server feature not enabled at compile time)");
    }

    #[cfg(feature = "gateway")]
    if let Some(ref url) = args.gateway_url {
        match create_gateway_sink(url, args.gateway_token.clone().unwrap_or_default()) {
            Ok(sink) => sinks = sinks.with(sink),
            Err(e) => {
                eprintln!("Warning: Gateway initialization failed: {e}");
                eprintln!("Continuing without gateway forwarding.");
            }
        }
    }
    #[cfg(not(feature = "gateway"))]
    if args.gateway_url.is_some() || args.gateway_token.is_some() {
        eprintln!("Warning: --gateway-url ignored (gateway feature not enabled at compile time)");
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let monitoring_log =
        create_shared_log_with_persistence(config.data_path.join("monitoring_stats.json"));

    let sink: Arc<dyn EventSink> = Arc::new(sinks);
    let mut session = MonitoringSession::new(operator, &config, sink).with_log(monitoring_log.clone());
    println!("Session ID: {}", session.session_id());

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut collector = match FrameCollector::start(source, CollectorConfig::default()) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("Error starting capture: {e}");
            std::process::exit(1);
        }
    };

    let origin = Instant::now();
    let end = run_session(
        collector.receiver(),
        &mut session,
        origin,
        &running,
        print_step,
    );

    println!();
    match end {
        SessionEnd::StreamEnded => println!("End of input reached."),
        SessionEnd::Stopped => println!("Stopping monitoring..."),
        SessionEnd::SourceLost(e) => eprintln!("Input ended early: {e}"),
    }
    collector.stop();

    let summary = session.finish();

    #[cfg(feature = "server")]
    if let Some((runtime, shutdown_tx)) = live_server {
        let _ = shutdown_tx.send(());
        runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    }

    if let Err(e) = monitoring_log.save() {
        eprintln!("Warning: Could not save monitoring log: {e}");
    }

    println!();
    println!("{summary}");
    println!("Records written to {output_path:?}");
    println!();
    println!("{}", monitoring_log.summary());
}

fn print_step(step: &SessionStep) {
    let (Some(record), Some(event)) = (&step.record, step.outcome.event()) else {
        return;
    };
    let at = record.timestamp.format("%H:%M:%S%.3f");
    match event {
        OcularEvent::BlinkCompleted { total } => {
            println!("[{at}] Blink #{total} | state: {}", record.state);
        }
        OcularEvent::AlarmRaised => {
            println!("[{at}] ALARM: prolonged eye closure detected");
        }
    }
}

fn cmd_summary(file: &Path, json: bool) {
    let records = match read_records(file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error reading {file:?}: {e}");
            std::process::exit(1);
        }
    };

    if records.is_empty() {
        println!("No records found in {file:?}");
        return;
    }

    let summary = SessionSummary::from_records(&records);
    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error serializing summary: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("{summary}");
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Ocular Sensor Agent Status");
    println!("==========================");
    println!();

    println!("Configuration:");
    println!(
        "  Operator: {}",
        if config.operator_name.is_empty() {
            "(not set)"
        } else {
            config.operator_name.as_str()
        }
    );
    println!("  EAR threshold: {}", config.engine.ear_threshold);
    println!(
        "  Alarm duration: {:.1}s",
        config.engine.alarm_duration.as_secs_f64()
    );
    println!("  Export directory: {:?}", config.export_path);
    println!();

    let sessions = std::fs::read_dir(&config.export_path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
                .count()
        })
        .unwrap_or(0);
    println!("Exported sessions: {sessions}");
    println!();

    let stats_path = config.data_path.join("monitoring_stats.json");
    if stats_path.exists() {
        let log = create_shared_log_with_persistence(stats_path);
        println!("Cumulative Statistics:");
        println!("{}", log.summary());
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}

#[cfg(feature = "server")]
type LiveServer = (
    tokio::runtime::Runtime,
    tokio::sync::oneshot::Sender<()>,
);

/// Start the live API on its own runtime.
#[cfg(feature = "server")]
fn start_live_server(
    port: u16,
    history_limit: usize,
) -> anyhow::Result<(LiveServer, Arc<ocular_sensor_agent::server::LiveStore>)> {
    use ocular_sensor_agent::server::{run, LiveStore, ServerConfig};

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let store = Arc::new(LiveStore::new(history_limit));
    let (addr, shutdown_tx) = runtime.block_on(run(ServerConfig::new(port), store.clone()))?;
    println!("  Live API: http://{addr}");

    Ok(((runtime, shutdown_tx), store))
}

/// Create the gateway sink, writing on a background thread.
#[cfg(feature = "gateway")]
fn create_gateway_sink(
    url: &str,
    token: String,
) -> Result<BackgroundSink, ocular_sensor_agent::GatewayError> {
    let config = GatewayConfig::from_address(url, token)?;
    let sink = HttpSink::new(config)?;
    println!("  Gateway: {url}");
    println!("  Device ID: {}", sink.device_id());

    match sink.test_connection() {
        Ok(true) => println!("  Gateway connection: OK"),
        Ok(false) => eprintln!("Warning: Gateway health check failed"),
        Err(e) => eprintln!("Warning: Could not connect to gateway: {e}"),
    }

    BackgroundSink::spawn(sink, GATEWAY_QUEUE)
        .map_err(|e| ocular_sensor_agent::GatewayError::Config(e.to_string()))
}
