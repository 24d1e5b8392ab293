//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem
///
/// Full logs are written to `~/.local/share/pebble-sdk/logs/`; their level is
/// controlled by the `PBSDK_LOG` environment variable. Warnings and errors are
/// also echoed to stderr, or everything down to `debug` when `verbose` is set.
///
/// # Examples
/// ```bash
/// PBSDK_LOG=debug pb-sdk emu start
/// pb-sdk --debug emu status
/// ```
pub fn init(verbose: bool) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "pb-sdk.log");

    // Default to info, allow override via PBSDK_LOG
    let file_filter = EnvFilter::try_from_env("PBSDK_LOG").unwrap_or_else(|_| {
        EnvFilter::new("pebble_sdk_shell=info,pbsdk_app=info,pbsdk_emulator=info,warn")
    });

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                ))
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .compact()
                .with_filter(console_level),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("pb-sdk starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("pebble-sdk").join("logs"))
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> Result<PathBuf> {
    let dir = get_log_directory()?;
    Ok(dir.join("pb-sdk.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lives_under_pebble_sdk_logs() {
        let file = get_current_log_file().unwrap();
        assert!(file.ends_with("pebble-sdk/logs/pb-sdk.log"));
    }
}
