use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use streamwatch::report;
use streamwatch::{
    ChannelProvider, ConnectionState, Monitor, MonitorConfig, MonitorView, ReplayProvider,
    StreamProvider,
};

#[derive(Parser, Debug)]
#[command(name = "streamwatch")]
#[command(about = "Live QoE/QoS telemetry monitor for streaming delivery metrics")]
struct Args {
    /// Path to a TOML config file
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Connect to a TCP endpoint for live samples (host:port)
    #[arg(short, long, conflicts_with = "replay")]
    connect: Option<String>,

    /// Replay a newline-delimited JSON recording instead of connecting
    #[arg(short, long, conflicts_with = "connect")]
    replay: Option<PathBuf>,

    /// Samples kept per family for trend calculations
    #[arg(long)]
    history: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Export the last connected state to a JSON file on exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if let Some(endpoint) = args.connect {
        config.endpoint = endpoint;
    }
    if let Some(history) = args.history {
        config.history_capacity = history;
    }
    if let Some(level) = args.log_level {
        config.log.level = level;
    }
    config.validate()?;

    init_logging(&config.log.level);

    let rt = tokio::runtime::Runtime::new()?;
    match args.replay {
        Some(path) => {
            let provider = ReplayProvider::from_file(&path)?.close_when_done();
            rt.block_on(run(provider, &config, args.export.as_deref()))
        }
        None => {
            let provider = StreamProvider::new(&config.endpoint);
            rt.block_on(run(provider, &config, args.export.as_deref()))
        }
    }
}

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Connect, print a report on every change, stop on Ctrl-C or when the channel ends.
async fn run<P: ChannelProvider>(
    provider: P,
    config: &MonitorConfig,
    export: Option<&Path>,
) -> Result<()> {
    let monitor = Monitor::new(provider, config.history_capacity);
    let mut updates = monitor.subscribe();

    if monitor.connect().is_none() {
        bail!("monitor refused to start a connection");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let view = updates.borrow_and_update().clone();

                match view.state.clone() {
                    ConnectionState::Errored(reason) => {
                        println!("{}", report::render_text(&view));
                        break Err(anyhow!(reason));
                    }
                    ConnectionState::Disconnected => {
                        // Short sessions can end before any connected view is observed.
                        if let Some(session) = monitor.last_session() {
                            println!("{}", report::render_text(&session));
                        }
                        println!("{}", report::render_text(&view));
                        break Ok(());
                    }
                    _ => println!("{}", report::render_text(&view)),
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break Ok(());
            }
        }
    };

    if let Some(path) = export {
        match final_view(&monitor) {
            Some(view) => {
                report::export_to_file(&view, path)?;
                println!("Exported monitor state to: {}", path.display());
            }
            None => warn!(path = %path.display(), "nothing to export, never connected"),
        }
    }

    result
}

/// The view worth exporting: the live one while connected, else the last session.
fn final_view<P: ChannelProvider>(monitor: &Monitor<P>) -> Option<MonitorView> {
    match monitor.state() {
        ConnectionState::Connected => Some(monitor.view()),
        _ => monitor.last_session(),
    }
}
