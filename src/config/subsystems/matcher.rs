// src/config/subsystems/matcher.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    // Inclusive bounds on differing payload positions for a closest candidate
    pub min_changed: usize,
    pub max_changed: usize,
    // Joins the positions of one candidate in the missing report
    pub index_delimiter: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_changed: 1,
            max_changed: 5,
            index_delimiter: ":".to_string(),
        }
    }
}

impl FromIni for MatcherConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "matcher" {
            return None;
        }

        match key {
            "min_changed" => {
                match value.parse() {
                    Ok(changed) => {
                        self.min_changed = changed;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid min_changed: {}", value)
                    ))),
                }
            },
            "max_changed" => {
                match value.parse() {
                    Ok(changed) => {
                        self.max_changed = changed;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid max_changed: {}", value)
                    ))),
                }
            },
            "index_delimiter" => {
                self.index_delimiter = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_changed == 0 {
            return Err(Error::Config(
                "min_changed must be greater than 0".to_string()
            ));
        }

        if self.min_changed > self.max_changed {
            return Err(Error::Config(format!(
                "min_changed ({}) must not exceed max_changed ({})",
                self.min_changed, self.max_changed
            )));
        }

        if self.index_delimiter.is_empty() {
            return Err(Error::Config(
                "index_delimiter must not be empty".to_string()
            ));
        }

        Ok(())
    }
}
