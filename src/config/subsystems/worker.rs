// src/config/subsystems/worker.rs

use serde::{Serialize, Deserialize};
use log::info;
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    // Pool size; 0 means one worker per CPU
    pub workers: usize,
    // Lines between progress heartbeats
    pub progress_interval: usize,
    // Log and drop short lines instead of failing the job
    pub skip_malformed: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            progress_interval: 5000,
            skip_malformed: false,
        }
    }
}

impl FromIni for WorkerConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "worker" {
            return None;
        }

        match key {
            "workers" => {
                match value.parse() {
                    Ok(workers) => {
                        self.workers = workers;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid workers: {}", value)
                    ))),
                }
            },
            "progress_interval" => {
                match value.parse() {
                    Ok(interval) if interval > 0 => {
                        self.progress_interval = interval;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid progress_interval (must be greater than 0): {}", value)
                    ))),
                }
            },
            "skip_malformed" => {
                match value.parse() {
                    Ok(skip) => {
                        self.skip_malformed = skip;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid skip_malformed (expected true or false): {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

impl WorkerConfig {
    /// Pool size to start, with `0` resolved to the CPU count.
    pub fn pool_size(&self) -> usize {
        if self.workers == 0 {
            let cores = num_cpus::get();
            info!("Auto-detected {} CPU cores, using {} workers", cores, cores);
            cores
        } else {
            self.workers
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_interval == 0 {
            return Err(Error::Config(
                "progress_interval must be greater than 0".to_string()
            ));
        }
        Ok(())
    }
}
