// src/logging.rs - env_logger setup for drivers and tests

use colored::Colorize;
use log::{Level, LevelFilter};
use std::io::Write;

fn level_tag(level: Level) -> colored::ColoredString {
    let tag = format!("{:5}", level);
    match level {
        Level::Error => tag.red().bold(),
        Level::Warn => tag.yellow(),
        Level::Info => tag.green(),
        Level::Debug => tag.blue(),
        Level::Trace => tag.dimmed(),
    }
}

/// Resolve the level: explicit argument, then `RUST_LOG`, then `info`
pub fn resolve_level(level: Option<&str>) -> LevelFilter {
    level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(LevelFilter::Info)
}

/// Install the logger. Safe to call more than once; later calls are ignored.
pub fn init_logging(level: Option<&str>) {
    let log_level = resolve_level(level);
    let installed = env_logger::Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(buf, "[{} {}] {}", level_tag(record.level()), record.target(), record.args())
        })
        .try_init();
    if installed.is_ok() {
        log::debug!("logger initialized (level: {})", log_level);
    }
}
