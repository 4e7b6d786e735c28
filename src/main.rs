use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};
use serde_json::{json, Map, Value};
use sigmundr_core::{
    global_registry, read_session, write_session, BoxedRowSink, NullSink, SharedSession,
    TelemetrySession,
};
use sigmundr_telemetry::config::AppConfig;
use sigmundr_telemetry::core::{
    find_link_device, spawn_frame_reader, spawn_line_reader, CsvLogSink, IngestionWorker,
    PathProbe,
};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::thread::JoinHandle;

/// sigmundr-telemetry - decode a Sigmundr telemetry stream into per-sensor rows
#[derive(Parser, Debug, Clone)]
#[command(name = "sigmundr-telemetry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: the user config directory)
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Directory receiving the CSV data log
    #[arg(long = "data-dir", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Do not write the CSV data log
    #[arg(long = "no-log")]
    no_log: bool,

    /// Composite frame layout id
    #[arg(long = "layout", value_name = "ID")]
    layout: Option<String>,

    /// File of concatenated composite binary frames
    #[arg(long = "frames", value_name = "FILE")]
    frames: Option<PathBuf>,

    /// Candidate receiver port; repeat to probe several. The first one
    /// sending the identification line is read, unless LINES_FILE is given
    #[arg(long = "port", value_name = "PATH")]
    ports: Vec<String>,

    /// List registered frame layouts and exit
    #[arg(long = "list-layouts")]
    list_layouts: bool,

    /// File of tagged ASCII lines (default: stdin, unless --frames or --port is given)
    #[arg(value_name = "LINES_FILE")]
    lines_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting sigmundr-telemetry v{}", env!("CARGO_PKG_VERSION"));

    sigmundr_sources::register_all();

    if let Err(e) = run(cli) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.list_layouts {
        for layout in global_registry().list_layouts() {
            println!("{}\t{}", layout.id, layout.display_name);
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {e:#}");
            AppConfig::default()
        }),
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if let Some(layout) = cli.layout {
        config.layout = layout;
    }
    if cli.no_log {
        config.storage.enabled = false;
    }

    let lines_path = match &cli.lines_file {
        Some(path) => Some(path.clone()),
        None if !cli.ports.is_empty() => {
            let mut probe = PathProbe::new(cli.ports.iter().cloned());
            Some(PathBuf::from(find_link_device(&mut probe, &config.link)?))
        }
        None => None,
    };

    let layout = global_registry().create_layout(&config.layout)?;
    let sink: BoxedRowSink = if config.storage.enabled {
        let sink = CsvLogSink::create(&config.storage.data_dir, Local::now().naive_local())
            .context("Failed to create the data log")?;
        Box::new(sink)
    } else {
        Box::new(NullSink)
    };

    let session = TelemetrySession::new(layout, sink)?.into_shared();
    let worker = IngestionWorker::start(session.clone(), config.link.read_timeout());
    let sender = worker
        .sender()
        .ok_or_else(|| anyhow!("Ingestion worker has no input channel"))?;

    let mut readers: Vec<(&str, JoinHandle<io::Result<u64>>)> = Vec::new();
    if let Some(path) = &cli.frames {
        let file = File::open(path)
            .with_context(|| format!("Failed to open frames file {}", path.display()))?;
        let frame_len = read_session(&session).decoder().frame_len();
        readers.push((
            "frames",
            spawn_frame_reader(file, frame_len, sender.clone(), worker.stop_flag()),
        ));
    }
    match &lines_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let port = path.display().to_string();
            set_port_label(&session, port);
            readers.push((
                "lines",
                spawn_line_reader(BufReader::new(file), sender.clone(), worker.stop_flag()),
            ));
        }
        None if cli.frames.is_none() => {
            set_port_label(&session, "stdin".to_string());
            readers.push((
                "lines",
                spawn_line_reader(
                    BufReader::new(io::stdin()),
                    sender.clone(),
                    worker.stop_flag(),
                ),
            ));
        }
        None => {}
    }
    drop(sender);

    for (name, reader) in readers {
        match reader.join() {
            Ok(Ok(count)) => info!("{name} reader finished after {count} input(s)"),
            Ok(Err(e)) => warn!("{name} reader failed: {e}"),
            Err(_) => warn!("{name} reader panicked"),
        }
    }
    worker.finish();

    println!("{}", serde_json::to_string_pretty(&summary(&session)?)?);
    Ok(())
}

/// Name the input the session reads from, shown as its port
fn set_port_label(session: &SharedSession, port: String) {
    write_session(session).set_port(Some(port));
}

/// Session snapshot plus the latest values of every data source
fn summary(session: &SharedSession) -> Result<Value> {
    let snapshot = serde_json::to_value(read_session(session).snapshot())?;

    let mut sources = Map::new();
    for mut source in sigmundr_sources::sources_for(session)? {
        source.update()?;
        let values: Map<String, Value> = source.get_values().into_iter().collect();
        sources.insert(source.metadata().id.clone(), Value::Object(values));
    }

    Ok(json!({
        "session": snapshot,
        "sources": sources,
    }))
}
