use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use env_logger::Builder;
use log::Level;

use crate::config::subsystems::LoggingConfig;
use crate::error::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn format_plain(ts: DateTime<Utc>, level: Level, msg: &str) -> String {
    format!("{} {}: {}", ts.format(TIMESTAMP_FORMAT), level, msg)
}

pub fn format_json(ts: DateTime<Utc>, level: Level, target: &str, msg: &str) -> String {
    serde_json::json!({
        "ts": ts.format(TIMESTAMP_FORMAT).to_string(),
        "level": level.as_str(),
        "target": target,
        "msg": msg,
    })
    .to_string()
}

/// `<dir>/reconcile_<month>_<day>_<hour>_<minute>.log`
pub fn log_file_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    dir.join(format!("reconcile_{}.log", now.format("%m_%d_%H_%M")))
}

/// Install the process logger. Returns the log file path when logging to a file.
/// Call once, before anything logs.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let level = config.level_filter()?;
    let json = config.json;

    let mut builder = Builder::new();
    builder
        .filter(None, level)
        .format(move |buf, record| {
            let line = if json {
                format_json(Utc::now(), record.level(), record.target(), &record.args().to_string())
            } else {
                format_plain(Utc::now(), record.level(), &record.args().to_string())
            };
            writeln!(buf, "{}", line)
        });

    let log_path = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| Error::from(e).with_path(dir))?;
            let path = log_file_path(dir, Utc::now());
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::from(e).with_path(&path))?;
            builder.target(env_logger::Target::Pipe(Box::new(log_file)));
            Some(path)
        }
        None => {
            builder.target(env_logger::Target::Stderr);
            None
        }
    };

    builder
        .try_init()
        .map_err(|e| Error::config(format!("logger already initialised: {}", e)))?;
    Ok(log_path)
}
