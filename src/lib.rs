//! tally reconciles fixed-layout record files. Each target file is paired with
//! the source files sharing its type code, lines are matched as a counted
//! multiset, and per-pair CSV reports list what is missing and what is left over.

// Module declarations
pub mod error;
pub mod parser;
pub mod matcher;
pub mod report;
pub mod utils;
pub mod config;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use matcher::{ClosestMatcher, DiffEngine, RunSummary, TargetMultiset};
pub use utils::{
    job_tracker::{JobOutcome, JobPairing},
    processing::WorkerPool,
};

// Re-export the config from config module
pub use config::TallyConfig;
