// src/config/file.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::Result;
use super::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub target_dir: PathBuf,
    pub source_dir: PathBuf,
    pub result_dir: PathBuf,
    pub summary_file: Option<PathBuf>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("data/target"),
            source_dir: PathBuf::from("data/source"),
            result_dir: PathBuf::from("data/result"),
            summary_file: None,
        }
    }
}

impl FromIni for FileConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        match key {
            "target_dir" => {
                self.target_dir = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "source_dir" => {
                self.source_dir = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "result_dir" => {
                self.result_dir = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "summary_file" => {
                let path = value.trim_matches('"');
                self.summary_file = if path.is_empty() { None } else { Some(PathBuf::from(path)) };
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_dir.is_dir() {
            return Err(crate::error::Error::Config(
                format!("Target directory does not exist: {:?}", self.target_dir)
            ));
        }
        if !self.source_dir.is_dir() {
            return Err(crate::error::Error::Config(
                format!("Source directory does not exist: {:?}", self.source_dir)
            ));
        }

        // Create the result directory if it doesn't exist
        std::fs::create_dir_all(&self.result_dir)?;

        if let Some(parent) = self.summary_file.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(())
    }
}
