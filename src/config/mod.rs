pub mod file;
pub mod subsystems;

use serde::{Serialize, Deserialize};
use std::path::Path;
use std::fs;
use crate::error::Result;
use log::{warn, trace};

pub trait FromIni {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>>;
}

/// Everything a run needs. Built once at startup and passed down by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    // File paths
    pub files: file::FileConfig,

    // Subsystem configs
    pub worker: subsystems::WorkerConfig,
    pub matcher: subsystems::MatcherConfig,
    pub logging: subsystems::LoggingConfig,
}

impl TallyConfig {
    pub fn validate(&self) -> Result<()> {
        self.files.validate()?;
        self.worker.validate()?;
        self.matcher.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Load and validate an INI file.
    pub fn from_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::load_ini(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an INI file over the defaults without validating, so callers can
    /// layer overrides on top first.
    pub fn load_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        let absolute_path = std::fs::canonicalize(&path)
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        trace!("Loading configuration from: {:?}", absolute_path);

        let content = fs::read_to_string(&path)?;
        Ok(Self::parse_ini(&content))
    }

    pub fn parse_ini(content: &str) -> Self {
        let mut config = Self::default();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len()-1].trim().to_string();
                trace!("  Line {}: Found section: [{}]", line_num + 1, current_section);
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // Delegate to appropriate subsystem config
                if let Some(result) = match current_section.as_str() {
                    "file" => config.files.from_ini_section(&current_section, key, value),
                    "worker" => config.worker.from_ini_section(&current_section, key, value),
                    "matcher" => config.matcher.from_ini_section(&current_section, key, value),
                    "logging" => config.logging.from_ini_section(&current_section, key, value),
                    _ => None,
                } {
                    if let Err(e) = result {
                        warn!("Error processing config key {}={}: {}", key, value, e);
                    }
                } else {
                    warn!("Unrecognized config key: {}={} in section [{}]", key, value, current_section);
                }
            }
        }

        config
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
