use chrono::prelude::*;
use log::{LevelFilter, Metadata, Record, SetLoggerError};

const CRATE_TARGET: &str = "musicd_library";

/// Writes this crate's log records to stderr, prefixed with a timestamp.
pub struct Logger;

static LOGGER: Logger = Logger;

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

fn short_target(target: &str) -> &str {
    match target.strip_prefix(CRATE_TARGET) {
        Some("") => "main",
        Some(rest) => rest.trim_start_matches("::"),
        None => target,
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(CRATE_TARGET)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        eprintln!(
            "{} {:5} [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}
