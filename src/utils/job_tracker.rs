// src/utils/job_tracker.rs
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crossbeam_channel::Sender;
use log::{debug, info, warn};

use crate::config::file::FileConfig;
use crate::error::{Error, Result};
use crate::types::Job;

/// Status of a finished job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Per-job pipeline stages, run strictly in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStage {
    BuildTargetBuffer,
    ScanSource,
    FindClosest,
    EmitMissingReport,
    EmitRawReport,
    EmitUnmatchedReport,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::BuildTargetBuffer => "build_target_buffer",
            JobStage::ScanSource => "scan_source",
            JobStage::FindClosest => "find_closest",
            JobStage::EmitMissingReport => "emit_missing_report",
            JobStage::EmitRawReport => "emit_raw_report",
            JobStage::EmitUnmatchedReport => "emit_unmatched_report",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts gathered while a job runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub target_lines: usize,
    pub source_lines: usize,
    pub consumed: usize,
    pub not_found: usize,
    pub candidates: usize,
    pub leftovers: usize,
    pub skipped_lines: usize,
    pub elapsed: Duration,
}

/// Result of one job, sent once on the completion channel.
#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        job: Job,
        summary: JobSummary,
    },
    Failed {
        job: Job,
        stage: JobStage,
        error: Error,
    },
}

impl JobOutcome {
    pub fn job(&self) -> &Job {
        match self {
            JobOutcome::Completed { job, .. } => job,
            JobOutcome::Failed { job, .. } => job,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == JobStatus::Completed
    }
}

/// Type code of a file name: its second dot-separated segment.
pub fn type_code(file_name: &str) -> Result<&str> {
    file_name.split('.').nth(1).ok_or_else(|| Error::pairing(format!(
        "file name {:?} has no type code (expected <name>.<type>[.<ext>])", file_name
    )))
}

/// Regular files in `dir`, sorted by name. Hidden files are ignored.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::from(e).with_path(dir))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            debug!("Ignoring hidden file {:?}", entry.path());
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Cross join of target and source names, keeping pairs with equal type codes.
///
/// Every combination is kept: two sources sharing a type with one target give two jobs.
pub fn pair_jobs(
    target_dir: &Path,
    target_names: &[String],
    source_dir: &Path,
    source_names: &[String],
) -> Result<Vec<Job>> {
    // Reject bad names up front instead of mis-pairing them
    let source_types = source_names
        .iter()
        .map(|name| type_code(name))
        .collect::<Result<Vec<_>>>()?;

    let mut jobs = Vec::new();
    for target_name in target_names {
        let target_type = type_code(target_name)?;
        for (source_name, source_type) in source_names.iter().zip(&source_types) {
            if target_type == *source_type {
                jobs.push(Job {
                    sequence: jobs.len() + 1,
                    target: target_dir.join(target_name),
                    source: source_dir.join(source_name),
                    target_name: target_name.clone(),
                    source_name: source_name.clone(),
                });
            }
        }
    }

    Ok(jobs)
}

/// The full list of jobs for a run, discovered before any worker starts.
#[derive(Debug, Clone)]
pub struct JobPairing {
    jobs: Vec<Job>,
}

impl JobPairing {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    /// List both directories and pair their files. Any failure here is fatal.
    pub fn discover(files: &FileConfig) -> Result<Self> {
        let target_names = list_file_names(&files.target_dir)?;
        let source_names = list_file_names(&files.source_dir)?;
        info!("Discovered {} target and {} source files", target_names.len(), source_names.len());

        let jobs = pair_jobs(&files.target_dir, &target_names, &files.source_dir, &source_names)?;
        info!("Created {} comparison jobs", jobs.len());

        let unpaired = target_names
            .iter()
            .filter(|name| !jobs.iter().any(|job| &job.target_name == *name))
            .count();
        if unpaired > 0 {
            warn!("{} target files have no source file with the same type code", unpaired);
        }

        Ok(Self { jobs })
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Push jobs one at a time. Blocks while no worker is ready to take one.
    /// Returns how many jobs were handed over.
    pub fn generate(self, queue: Sender<Job>) -> usize {
        let total = self.jobs.len();
        let mut sent = 0;
        for job in self.jobs {
            let sequence = job.sequence;
            if queue.send(job).is_err() {
                warn!("Job queue closed after {} of {} jobs; job {} not started", sent, total, sequence);
                break;
            }
            sent += 1;
        }
        debug!("Job producer finished, {} jobs queued", sent);
        sent
    }
}

/// Write one row per job outcome.
pub fn export_summary_csv(outcomes: &[JobOutcome], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::from(e).with_path(path))?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    csv_writer.write_record([
        "job",
        "target",
        "source",
        "status",
        "target_lines",
        "source_lines",
        "consumed",
        "not_found",
        "candidates",
        "leftovers",
        "skipped_lines",
        "elapsed_seconds",
        "error",
    ])?;

    for outcome in outcomes {
        let job = outcome.job();
        let (summary, error) = match outcome {
            JobOutcome::Completed { summary, .. } => (Some(summary), String::new()),
            JobOutcome::Failed { stage, error, .. } => (None, format!("{}: {}", stage, error)),
        };
        let count = |f: fn(&JobSummary) -> usize| summary.map_or(String::new(), |s| f(s).to_string());

        csv_writer.write_record([
            job.sequence.to_string(),
            job.target_name.clone(),
            job.source_name.clone(),
            outcome.status().as_str().to_string(),
            count(|s| s.target_lines),
            count(|s| s.source_lines),
            count(|s| s.consumed),
            count(|s| s.not_found),
            count(|s| s.candidates),
            count(|s| s.leftovers),
            count(|s| s.skipped_lines),
            summary.map_or(String::new(), |s| format!("{:.3}", s.elapsed.as_secs_f64())),
            error,
        ])?;
    }

    csv_writer.flush()?;
    info!("Saved summary of {} jobs to {}", outcomes.len(), path.display());
    Ok(())
}

/// Output paths for the three per-job reports.
pub fn report_paths(result_dir: &Path, source_name: &str) -> [PathBuf; 3] {
    [
        result_dir.join(format!("{}-missing.csv", source_name)),
        result_dir.join(format!("{}-raw.csv", source_name)),
        result_dir.join(format!("{}-unmatched.csv", source_name)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pairs_by_type_code() {
        let jobs = pair_jobs(
            Path::new("t"),
            &names(&["a.100.csv", "b.200.csv"]),
            Path::new("s"),
            &names(&["c.100.csv", "d.100.csv"]),
        ).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!((jobs[0].target_name.as_str(), jobs[0].source_name.as_str()), ("a.100.csv", "c.100.csv"));
        assert_eq!((jobs[1].target_name.as_str(), jobs[1].source_name.as_str()), ("a.100.csv", "d.100.csv"));
        assert_eq!(jobs[0].target, PathBuf::from("t/a.100.csv"));
        assert_eq!(jobs[1].source, PathBuf::from("s/d.100.csv"));
        assert_eq!(jobs[1].sequence, 2);
    }

    #[test]
    fn cross_join_keeps_every_combination() {
        let jobs = pair_jobs(
            Path::new("t"),
            &names(&["a.7.txt", "b.7.txt"]),
            Path::new("s"),
            &names(&["c.7.txt", "d.7.txt", "e.8.txt"]),
        ).unwrap();
        assert_eq!(jobs.len(), 4);
    }

    #[test]
    fn type_code_must_match_exactly() {
        let jobs = pair_jobs(
            Path::new("t"),
            &names(&["a.100.csv"]),
            Path::new("s"),
            &names(&["c.1000.csv", "d.10.csv"]),
        ).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn names_without_type_code_are_rejected() {
        let err = pair_jobs(Path::new("t"), &names(&["README"]), Path::new("s"), &names(&["c.1.csv"]))
            .unwrap_err();
        assert!(matches!(err, Error::Pairing(_)));

        let err = pair_jobs(Path::new("t"), &names(&["a.1.csv"]), Path::new("s"), &names(&["nodots"]))
            .unwrap_err();
        assert!(err.to_string().contains("nodots"));
    }

    #[test]
    fn listing_is_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.1.csv"), "").unwrap();
        fs::write(dir.path().join("a.1.csv"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::create_dir(dir.path().join("sub.1.d")).unwrap();

        assert_eq!(list_file_names(dir.path()).unwrap(), names(&["a.1.csv", "b.1.csv"]));
        assert!(list_file_names(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn generate_hands_over_every_job() {
        let jobs = pair_jobs(
            Path::new("t"),
            &names(&["a.1.x", "b.1.x"]),
            Path::new("s"),
            &names(&["c.1.x"]),
        ).unwrap();
        let pairing = JobPairing::new(jobs);
        let (tx, rx) = crossbeam_channel::bounded(0);

        let consumer = std::thread::spawn(move || rx.iter().map(|job: Job| job.sequence).collect::<Vec<_>>());
        assert_eq!(pairing.generate(tx), 2);
        assert_eq!(consumer.join().unwrap(), vec![1, 2]);
    }

    #[test]
    fn generate_stops_when_queue_closes() {
        let jobs = pair_jobs(Path::new("t"), &names(&["a.1.x"]), Path::new("s"), &names(&["c.1.x"])).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(0);
        drop(rx);
        assert_eq!(JobPairing::new(jobs).generate(tx), 0);
    }

    #[test]
    fn summary_csv_has_a_row_per_outcome() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        let jobs = pair_jobs(Path::new("t"), &names(&["a.1.x"]), Path::new("s"), &names(&["c.1.x", "d.1.x"])).unwrap();
        let outcomes = vec![
            JobOutcome::Completed {
                job: jobs[0].clone(),
                summary: JobSummary { target_lines: 3, source_lines: 2, consumed: 2, leftovers: 1, ..JobSummary::default() },
            },
            JobOutcome::Failed {
                job: jobs[1].clone(),
                stage: JobStage::ScanSource,
                error: Error::pool("boom"),
            },
        ];

        export_summary_csv(&outcomes, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("job,target,source,status"));
        assert!(lines[1].starts_with("1,a.1.x,c.1.x,completed,3,2,2,0,0,1,0,"));
        assert!(lines[2].starts_with("2,a.1.x,d.1.x,failed,,,,,,,,,"));
        assert!(lines[2].contains("scan_source"));
    }
}
