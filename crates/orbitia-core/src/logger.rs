use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOG_LEVEL_ENV: &str = "ORBITIA_LOG";

/// Log level from `ORBITIA_LOG`, defaulting to `info`.
pub fn level_from_env() -> log::LevelFilter {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|value| parse_level(&value))
        .unwrap_or(log::LevelFilter::Info)
}

fn parse_level(value: &str) -> Option<log::LevelFilter> {
    value.trim().parse().ok()
}

/// Strips the workspace prefix from source paths.
fn simplify_file_path(file_path: &str) -> &str {
    match file_path.rfind("/src/") {
        Some(pos) if file_path.contains("orbitia") => &file_path[(pos + 1)..],
        _ => file_path,
    }
}

fn get_level(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "E",
        log::Level::Warn => "W",
        log::Level::Info => "I",
        log::Level::Debug => "D",
        log::Level::Trace => "T",
    }
}

/// Compact `HH:MM:SS.mmm [L] message` lines for the terminal.
pub fn console_log_formatter(
    out: fern::FormatCallback,
    message: &std::fmt::Arguments,
    record: &log::Record,
) {
    out.finish(format_args!(
        "{} [{}] {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        get_level(record.level()),
        message,
    ))
}

/// Full date, level and source location for the log file.
pub fn file_log_formatter(
    out: fern::FormatCallback,
    message: &std::fmt::Arguments,
    record: &log::Record,
) {
    out.finish(format_args!(
        "{} [{}] {}:{} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        get_level(record.level()),
        simplify_file_path(record.file().unwrap_or("")),
        record.line().unwrap_or(0),
        message
    ))
}

/// Default location of the interactive shell's log file.
pub fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("orbitia").join("orbitia.log"))
}

/// Log to a file. The terminal UI owns stdout, so it must not be a sink.
pub fn setup_file_logger(path: &Path, level: log::LevelFilter) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fern::Dispatch::new()
        .level(level)
        .filter(|record| record.target().starts_with("orbitia") || record.level() <= log::Level::Warn)
        .format(file_log_formatter)
        .chain(fern::log_file(path)?)
        .apply()?;

    log::debug!("Logger initialized, log file path: {:?}", path);
    Ok(())
}

/// Log to stderr, for the non-interactive subcommands.
pub fn setup_stderr_logger(level: log::LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .level(level)
        .filter(|record| record.target().starts_with("orbitia") || record.level() <= log::Level::Warn)
        .format(console_log_formatter)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
