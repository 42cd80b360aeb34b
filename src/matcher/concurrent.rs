// src/matcher/concurrent.rs
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::utils::job_tracker::{export_summary_csv, JobOutcome, JobStage};

/// Heartbeat from a worker, sent every N lines while reading a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub worker: usize,
    pub job: usize,
    pub stage: JobStage,
    pub line: usize,
    pub elapsed: Duration,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {} - job {} {} - did line {} took {:.3} seconds",
            self.worker,
            self.job,
            self.stage,
            self.line,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Drains heartbeats until every worker has dropped its sender.
pub struct ProgressReporter {
    receiver: Receiver<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(receiver: Receiver<ProgressEvent>) -> Self {
        Self { receiver }
    }

    /// Returns how many events were seen.
    pub fn run(self) -> usize {
        let mut seen = 0;
        for event in self.receiver.iter() {
            debug!("{}", event);
            seen += 1;
        }
        debug!("Progress reporter finished after {} events", seen);
        seen
    }
}

/// Outcome of a whole run, one entry per job in completion order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Sort outcomes back into job order.
    pub fn sort_by_job(&mut self) {
        self.outcomes.sort_by_key(|o| o.job().sequence);
    }

    pub fn export_csv(&self, path: &Path) -> Result<()> {
        export_summary_csv(&self.outcomes, path)
    }
}

/// Receives one outcome per job and keeps the progress bar current.
pub struct OutcomeCollector {
    receiver: Receiver<JobOutcome>,
    expected: usize,
    progress: ProgressBar,
    start_time: Instant,
}

impl OutcomeCollector {
    pub fn new(receiver: Receiver<JobOutcome>, expected: usize, show_progress: bool) -> Self {
        let progress = if show_progress {
            let bar = ProgressBar::new(expected as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} Jobs: [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .map(|s| s.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            receiver,
            expected,
            progress,
            start_time: Instant::now(),
        }
    }

    /// Block until every expected outcome arrives or all workers are gone.
    pub fn collect(self) -> RunSummary {
        let mut outcomes = Vec::with_capacity(self.expected);

        while outcomes.len() < self.expected {
            let outcome = match self.receiver.recv() {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "Completion channel closed after {} of {} jobs",
                        outcomes.len(),
                        self.expected
                    );
                    break;
                }
            };

            let job = outcome.job();
            match &outcome {
                JobOutcome::Completed { summary, .. } => {
                    info!(
                        "Job {} done: {} vs {} ({} consumed, {} not found, {} candidates, {} leftovers) in {:.3}s",
                        job.sequence,
                        job.target_name,
                        job.source_name,
                        summary.consumed,
                        summary.not_found,
                        summary.candidates,
                        summary.leftovers,
                        summary.elapsed.as_secs_f64()
                    );
                    self.progress.set_message(format!("OK: {}", job.source_name));
                }
                JobOutcome::Failed { stage, error: err, .. } => {
                    warn!(
                        "Job {} failed at {}: {} vs {}: {}",
                        job.sequence, stage, job.target_name, job.source_name, err
                    );
                    self.progress.set_message(format!("ERR: {}", job.source_name));
                }
            }

            self.progress.inc(1);
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            outcomes,
            elapsed: self.start_time.elapsed(),
        };
        self.progress.finish_with_message(format!(
            "{} jobs OK, {} failed",
            summary.completed(),
            summary.failed()
        ));
        summary
    }
}
