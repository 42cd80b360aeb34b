// src/config/subsystems/logging.rs

use std::path::PathBuf;
use serde::{Serialize, Deserialize};
use log::LevelFilter;
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    // One JSON object per line instead of plain text
    pub json: bool,
    // Log to a timestamped file here instead of stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
        }
    }
}

impl FromIni for LoggingConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "logging" {
            return None;
        }

        match key {
            "level" => {
                self.level = value.trim_matches('"').to_lowercase();
                Some(Ok(()))
            },
            "json" => {
                match value.parse() {
                    Ok(json) => {
                        self.json = json;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid json (expected true or false): {}", value)
                    ))),
                }
            },
            "log_dir" => {
                let dir = value.trim_matches('"');
                self.log_dir = if dir.is_empty() { None } else { Some(PathBuf::from(dir)) };
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        match self.level.to_lowercase().as_str() {
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            "off" | "none" => Ok(LevelFilter::Off),
            other => Err(Error::Config(format!("Invalid log level: {}", other))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.level_filter().map(|_| ())
    }
}
