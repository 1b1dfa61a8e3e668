use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tm_cli::{build_manager_config, exit_code, install_tracing, load_config_file};
use tm_manager::{Manager, ManagerError};
use tracing::{error, info};

/// Headless telemetry ingestion and dispatch session.
#[derive(Parser, Debug)]
#[command(name = "tm-cli", version, about)]
struct Args {
    /// Path to a JSON config file: bus type, per-bus config, framing config
    /// and operating mode.
    #[arg(long)]
    config: PathBuf,

    /// Directory to mirror accepted frames into as CSV.
    #[arg(long = "dump-csv-dir")]
    dump_csv_dir: Option<PathBuf>,

    /// Unix socket path (or, on non-Unix targets, a loopback TCP port) to
    /// broadcast accepted frames on for external plugins.
    #[arg(long)]
    plugin_socket: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    install_tracing();

    let file = match load_config_file(&args.config) {
        Ok(file) => file,
        Err(e) => {
            error!(error = %e, "couldn't load config");
            std::process::exit(exit_code::CONFIG_ERROR);
        }
    };

    let config = match build_manager_config(file, args.dump_csv_dir, args.plugin_socket) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "couldn't load project descriptor");
            std::process::exit(exit_code::PROJECT_LOAD_FAILURE);
        }
    };

    let mut manager = Manager::new(config);

    if let Err(e) = manager.connect() {
        error!(error = %e, "transport open failed after retry cap");
        std::process::exit(match e {
            ManagerError::Config(_) => exit_code::CONFIG_ERROR,
            _ => exit_code::TRANSPORT_OPEN_FAILURE,
        });
    }
    info!(state = ?manager.state(), "session running");

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    }) {
        error!(error = %e, "couldn't install ctrl-c handler");
    }

    while !interrupted.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    info!("shutting down");
    if let Err(e) = manager.disconnect() {
        error!(error = %e, "error during shutdown");
    }

    let metrics = manager.metrics();
    info!(
        frames_emitted = tm_manager::Metrics::relaxed(&metrics.frames_emitted),
        checksum_failures = tm_manager::Metrics::relaxed(&metrics.checksum_failures),
        "session summary"
    );
    std::process::exit(exit_code::NORMAL);
}
