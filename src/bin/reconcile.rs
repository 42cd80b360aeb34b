use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::Parser;
use log::{info, debug, warn, error};

use tally::{
    TallyConfig,
    JobPairing,
    WorkerPool,
    utils::init_logging,
};

const DEFAULT_CONFIG: &str = "default.ini";

/// Reconcile target record files against source record files of the same type.
#[derive(Parser, Debug)]
#[command(name = "reconcile", version, about)]
struct Cli {
    /// INI configuration file (default.ini is used when present)
    config: Option<PathBuf>,

    /// Directory holding target files
    #[arg(long)]
    target: Option<PathBuf>,

    /// Directory holding source files
    #[arg(long)]
    source: Option<PathBuf>,

    /// Directory the per-job reports are written to
    #[arg(long)]
    result: Option<PathBuf>,

    /// Worker threads (0 = one per CPU)
    #[arg(long)]
    workers: Option<usize>,

    /// Write a per-job run summary CSV here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,

    /// One JSON object per log line
    #[arg(long)]
    json_logs: bool,

    /// Log to a timestamped file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log and drop lines too short to parse instead of failing the job
    #[arg(long)]
    skip_malformed: bool,
}

impl Cli {
    fn load_config(&self) -> tally::Result<TallyConfig> {
        let mut config = match &self.config {
            Some(path) => TallyConfig::load_ini(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => TallyConfig::load_ini(DEFAULT_CONFIG)?,
            None => TallyConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut TallyConfig) {
        if let Some(dir) = &self.target {
            config.files.target_dir = dir.clone();
        }
        if let Some(dir) = &self.source {
            config.files.source_dir = dir.clone();
        }
        if let Some(dir) = &self.result {
            config.files.result_dir = dir.clone();
        }
        if let Some(path) = &self.summary {
            config.files.summary_file = Some(path.clone());
        }
        if let Some(workers) = self.workers {
            config.worker.workers = workers;
        }
        if self.skip_malformed {
            config.worker.skip_malformed = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.to_lowercase();
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if let Some(dir) = &self.log_dir {
            config.logging.log_dir = Some(dir.clone());
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {}", error);
            eprintln!("Use --help to see available options.");
            return Err(error.into());
        }
    };

    let log_path = init_logging(&config.logging)?;
    let start = Instant::now();
    info!("Starting reconcile {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &log_path {
        eprintln!("Logging to {}", path.display());
    }
    debug!("Effective configuration: {}", config.to_json()?);

    let pairing = match JobPairing::discover(&config.files) {
        Ok(pairing) => pairing,
        Err(error) => {
            error!("Could not pair input files: {}", error);
            return Err(error.into());
        }
    };
    if pairing.is_empty() {
        warn!("No target and source files share a type code; nothing to do");
    }

    let summary = WorkerPool::new(&config)
        .with_progress_bar(log_path.is_some())
        .run(pairing)?;

    if let Some(path) = &config.files.summary_file {
        summary.export_csv(path)?;
    }

    if summary.failed() > 0 {
        warn!("{} of {} jobs failed", summary.failed(), summary.total());
    }
    info!("Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}
