// src/utils/worker.rs
use std::time::Instant;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, error};

use crate::config::TallyConfig;
use crate::error::Error;
use crate::matcher::{ClosestMatcher, DiffEngine, ProgressEvent, TargetMultiset};
use crate::report;
use crate::types::Job;
use crate::utils::job_tracker::{report_paths, JobOutcome, JobStage, JobSummary};

type StageResult<T> = std::result::Result<T, (JobStage, Error)>;

fn at<T>(stage: JobStage, result: crate::error::Result<T>) -> StageResult<T> {
    result.map_err(|e| (stage, e))
}

/// One pool thread. Runs jobs to completion, one at a time.
pub struct Worker<'a> {
    id: usize,
    config: &'a TallyConfig,
    progress: Sender<ProgressEvent>,
}

impl<'a> Worker<'a> {
    pub fn new(id: usize, config: &'a TallyConfig, progress: Sender<ProgressEvent>) -> Self {
        Self { id, config, progress }
    }

    /// Take jobs until the queue closes. Every job taken yields exactly one outcome.
    /// Returns how many jobs this worker ran.
    pub fn run(&self, jobs: Receiver<Job>, outcomes: Sender<JobOutcome>) -> usize {
        debug!("Worker {} started", self.id);
        let mut handled = 0;

        for job in jobs.iter() {
            debug!("Worker {} picked up job {}: {} vs {}",
                   self.id, job.sequence, job.target_name, job.source_name);

            let outcome = match self.process(&job) {
                Ok(summary) => JobOutcome::Completed { job, summary },
                Err((stage, error)) => JobOutcome::Failed { job, stage, error },
            };
            handled += 1;

            if let Err(e) = outcomes.send(outcome) {
                error!("Worker {} could not report job {}: completion channel closed",
                       self.id, e.0.job().sequence);
                break;
            }
        }

        debug!("Worker {} finished after {} jobs", self.id, handled);
        handled
    }

    /// Run the stages of one job in order. The first failure stops the job.
    pub fn process(&self, job: &Job) -> StageResult<JobSummary> {
        let start = Instant::now();
        let skip_malformed = self.config.worker.skip_malformed;

        let mut multiset = at(
            JobStage::BuildTargetBuffer,
            TargetMultiset::build(&job.target, skip_malformed, |line| {
                self.heartbeat(job, JobStage::BuildTargetBuffer, line, start)
            }),
        )?;
        info!("Worker {} job {}: target buffer has {} distinct records from {} lines",
              self.id, job.sequence, multiset.len(), multiset.lines());

        let mut scan = at(
            JobStage::ScanSource,
            DiffEngine::new(skip_malformed).scan(&mut multiset, &job.source, |line| {
                self.heartbeat(job, JobStage::ScanSource, line, start)
            }),
        )?;
        let leftovers = multiset.total_count();
        debug!("Worker {} job {}: {} consumed, {} not found, {} leftover copies",
               self.id, job.sequence, scan.consumed, scan.not_found.len(), leftovers);

        let mut unmatched = multiset.leftovers();
        let candidates = at(
            JobStage::FindClosest,
            ClosestMatcher::new(&self.config.matcher).find_closest(&mut scan.not_found, &mut unmatched),
        )?;

        let [missing_path, raw_path, unmatched_path] =
            report_paths(&self.config.files.result_dir, &job.source_name);
        at(
            JobStage::EmitMissingReport,
            report::write_missing_report(&missing_path, &scan.not_found, &self.config.matcher.index_delimiter),
        )?;
        at(JobStage::EmitRawReport, report::write_raw_report(&raw_path, &scan.not_found))?;
        at(JobStage::EmitUnmatchedReport, report::write_unmatched_report(&unmatched_path, &unmatched))?;

        Ok(JobSummary {
            target_lines: multiset.lines(),
            source_lines: scan.lines(),
            consumed: scan.consumed,
            not_found: scan.not_found.len(),
            candidates,
            leftovers,
            skipped_lines: multiset.skipped() + scan.skipped,
            elapsed: start.elapsed(),
        })
    }

    fn heartbeat(&self, job: &Job, stage: JobStage, line: usize, start: Instant) {
        if line % self.config.worker.progress_interval != 0 {
            return;
        }
        let event = ProgressEvent {
            worker: self.id,
            job: job.sequence,
            stage,
            line,
            elapsed: start.elapsed(),
        };
        // Reporter gone means the run is shutting down
        let _ = self.progress.send(event);
    }
}
