//! framepace: replay a hex capture over a serial link with per-class pacing.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use framepace::{
    ConsoleObserver, ReplayConfig, ReplayController, SerialTransport, SimulatedTransport, SourceMode,
    Transport,
};

#[derive(Debug, Parser)]
#[command(
    name = "framepace",
    version,
    about = "Replay captured frames over a serial link with per-class pacing"
)]
struct Cli {
    /// Capture file: blank-line separated blocks of hex text
    hex_file: PathBuf,

    /// Serial device path
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long = "baudrate")]
    baudrate: Option<u32>,

    /// Send the capture once instead of looping
    #[arg(short, long)]
    single: bool,

    /// Re-read the file each cycle instead of holding it in memory
    #[arg(short, long)]
    memory_efficient: bool,

    /// Run without hardware; every send succeeds
    #[arg(short, long)]
    test: bool,

    /// YAML config file, overridden by the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            if let Some(replay) = e.downcast_ref::<framepace::ReplayError>() {
                for suggestion in replay.recovery_suggestions() {
                    eprintln!("  - {suggestion}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "framepace=debug" } else { "framepace=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    check_capture(&cli.hex_file)?;
    let config = build_config(&cli).await?;

    let transport: Arc<dyn Transport> = if cli.test {
        Arc::new(SimulatedTransport::new(config.serial.clone()))
    } else {
        Arc::new(SerialTransport::new(config.serial.clone()))
    };

    let console = Arc::new(ConsoleObserver::new());
    transport.connect().await.with_context(|| format!("failed to connect to {}", config.serial.port))?;
    console.connection(&transport.port_info());

    let result = replay(&cli.hex_file, &config, Arc::clone(&transport), Arc::clone(&console)).await;

    transport.disconnect().await;
    tracing::info!("Disconnected from {}", config.serial.port);

    let total_sent = result?;
    console.summary(total_sent);
    Ok(())
}

/// Load the capture and run it; returns the number of frames sent
async fn replay(
    path: &Path,
    config: &ReplayConfig,
    transport: Arc<dyn Transport>,
    console: Arc<ConsoleObserver>,
) -> Result<u64> {
    let controller = ReplayController::load(path, config.mode, transport, console.clone())
        .await
        .with_context(|| format!("failed to load {}", path.display()))?;
    console.file_info(path, controller.status().total_frames, config.mode);
    console.start();

    if config.continuous {
        controller.start(true).await.context("failed to start replay")?;
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, stopping");
        controller.stop();
        controller.wait().await;
    } else {
        let single = controller.start(false);
        tokio::pin!(single);
        tokio::select! {
            result = &mut single => result.context("replay failed")?,
            _ = shutdown_signal() => {
                tracing::info!("Shutdown signal received, stopping");
                controller.stop();
                single.await.context("replay failed")?;
            }
        }
    }

    Ok(controller.status().total_sent)
}

fn check_capture(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("capture file {} does not exist", path.display());
    }
    if !path.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    Ok(())
}

async fn build_config(cli: &Cli) -> Result<ReplayConfig> {
    let mut config = match &cli.config {
        Some(path) => ReplayConfig::load(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ReplayConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud_rate) = cli.baudrate {
        config.serial.baud_rate = baud_rate;
    }
    if cli.single {
        config.continuous = false;
    }
    if cli.memory_efficient {
        config.mode = SourceMode::Streaming;
    }

    config.validate()?;
    tracing::debug!("Effective config: {:?}", config);
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
