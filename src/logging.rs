/// Logging setup
///
/// Logs are written to a daily rotated file and mirrored to stderr, so
/// command output on stdout stays clean.
///
/// Default log directory:
/// - macOS: ~/Library/Application Support/SecureWatch/logs/
/// - Windows: %APPDATA%/SecureWatch/logs/
/// - Linux: ~/.config/SecureWatch/logs/
///
/// Files are named secure-watch.log.YYYY-MM-DD. `RUST_LOG` overrides the
/// level chosen on the command line.
use std::path::{Path, PathBuf};
use sysinfo::System;

const LOG_TARGET_STARTUP: &str = "secure_watch::startup";

pub fn default_log_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("SecureWatch").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize tracing with file rotation
pub fn init(debug: bool, log_dir: &Path) {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(log_dir, "secure-watch.log");

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Log directory: {}", log_dir.display());
}

pub fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());
    let host = System::host_name().unwrap_or_else(|| "unknown".to_string());
    let architecture = std::env::consts::ARCH;

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting secure-watch v{} on {} ({})", version, host, architecture);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);

    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    tracing::debug!(target: LOG_TARGET_STARTUP, "Available parallelism: {}", cpus);
}
