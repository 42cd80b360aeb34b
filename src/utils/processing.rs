use crossbeam_channel::bounded;
use crossbeam_utils::sync::WaitGroup;
use crossbeam_utils::thread;
use log::{info, debug, error};

use crate::{
    TallyConfig,
    error::{Error, Result},
    matcher::{OutcomeCollector, ProgressEvent, ProgressReporter, RunSummary},
    types::Job,
    utils::job_tracker::{JobOutcome, JobPairing},
    utils::worker::Worker,
};

/// Fixed-size pool of scoped worker threads fed over rendezvous channels.
pub struct WorkerPool<'a> {
    config: &'a TallyConfig,
    workers: usize,
    show_progress: bool,
}

impl<'a> WorkerPool<'a> {
    pub fn new(config: &'a TallyConfig) -> Self {
        Self {
            config,
            workers: config.worker.pool_size().max(1),
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while jobs complete.
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job and block until each has reported an outcome.
    pub fn run(&self, pairing: JobPairing) -> Result<RunSummary> {
        let expected = pairing.len();
        info!("Starting {} workers for {} jobs", self.workers, expected);

        let (job_tx, job_rx) = bounded::<Job>(0);
        let (progress_tx, progress_rx) = bounded::<ProgressEvent>(0);
        let (outcome_tx, outcome_rx) = bounded::<JobOutcome>(0);
        let config = self.config;
        let show_progress = self.show_progress;
        let workers = self.workers;

        let scoped = thread::scope(|s| {
            s.spawn(move |_| pairing.generate(job_tx));
            s.spawn(move |_| ProgressReporter::new(progress_rx).run());

            let all_done = WaitGroup::new();
            for id in 1..=workers {
                let worker = Worker::new(id, config, progress_tx.clone());
                let jobs = job_rx.clone();
                let outcomes = outcome_tx.clone();
                let done = all_done.clone();
                s.spawn(move |_| {
                    worker.run(jobs, outcomes);
                    drop(done);
                });
            }
            drop(job_rx);
            drop(progress_tx);

            // Holds the last completion sender until every worker is through
            s.spawn(move |_| {
                all_done.wait();
                debug!("All {} workers finished, closing completion channel", workers);
                drop(outcome_tx);
            });

            OutcomeCollector::new(outcome_rx, expected, show_progress).collect()
        });

        let mut summary = scoped.map_err(|_| {
            error!("A worker pool thread panicked");
            Error::pool("a worker pool thread panicked")
        })?;

        if summary.total() != expected {
            return Err(Error::pool(format!(
                "expected {} job outcomes, received {}",
                expected,
                summary.total()
            )));
        }

        summary.sort_by_job();
        info!(
            "Processed {} jobs ({} completed, {} failed) in {:.2}s",
            summary.total(),
            summary.completed(),
            summary.failed(),
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use crate::utils::job_tracker::JobStage;

    fn config(dir: &TempDir, workers: usize) -> TallyConfig {
        let mut config = TallyConfig::default();
        config.files.target_dir = dir.path().join("target");
        config.files.source_dir = dir.path().join("source");
        config.files.result_dir = dir.path().join("result");
        config.worker.workers = workers;
        config.worker.progress_interval = 2;
        fs::create_dir_all(&config.files.target_dir).unwrap();
        fs::create_dir_all(&config.files.source_dir).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn empty_run_finishes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, 2);
        let summary = WorkerPool::new(&config).run(JobPairing::new(Vec::new())).unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn more_jobs_than_workers() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, 2);
        fs::write(config.files.target_dir.join("t.1.txt"), "AAAAAA0001XXXX\nAAAAAA0001YYYY\n").unwrap();
        for name in ["a.1.txt", "b.1.txt", "c.1.txt", "d.1.txt", "e.1.txt"] {
            fs::write(config.files.source_dir.join(name), "AAAAAA0001XXXX\n").unwrap();
        }

        let pairing = JobPairing::discover(&config.files).unwrap();
        assert_eq!(pairing.len(), 5);

        let pool = WorkerPool::new(&config);
        assert_eq!(pool.workers(), 2);
        let summary = pool.run(pairing).unwrap();

        assert_eq!(summary.completed(), 5);
        let sequences: Vec<usize> = summary.outcomes.iter().map(|o| o.job().sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        for name in ["a.1.txt", "e.1.txt"] {
            let unmatched = fs::read_to_string(config.files.result_dir.join(format!("{}-unmatched.csv", name))).unwrap();
            assert_eq!(unmatched, "Id,Type,Raw\nAAAAAA,0001,AAAAAA0001YYYY\n");
        }
    }

    fn setup_with_summary(workers: usize) -> (TempDir, TallyConfig) {
        let dir = TempDir::new().unwrap();
        let mut config = TallyConfig::default();
        config.files.target_dir = dir.path().join("target");
        config.files.source_dir = dir.path().join("source");
        config.files.result_dir = dir.path().join("result");
        config.files.summary_file = Some(dir.path().join("result/summary.csv"));
        config.worker.workers = workers;
        config.worker.progress_interval = 1;
        fs::create_dir_all(&config.files.target_dir).unwrap();
        fs::create_dir_all(&config.files.source_dir).unwrap();
        config.validate().unwrap();
        (dir, config)
    }

    fn write(dir: &Path, name: &str, lines: &[&str]) {
        let mut body = lines.join("\n");
        body.push('\n');
        fs::write(dir.join(name), body).unwrap();
    }

    fn report(config: &TallyConfig, name: &str) -> String {
        fs::read_to_string(config.files.result_dir.join(name)).unwrap()
    }

    #[test]
    fn reconciles_every_pair_end_to_end() {
        let (_dir, config) = setup_with_summary(3);
        write(&config.files.target_dir, "a.100.csv", &[
            "AAAAAA0100XXXX",
            "AAAAAA0100XXXX",
            "AAAAAA0100AAAA",
            "AAAAAA0200QQQQ",
        ]);
        write(&config.files.target_dir, "b.200.csv", &["ZZZZZZ0200ZZZZ"]);
        write(&config.files.source_dir, "c.100.csv", &["CCCCCC0100XXXX", "BBBBBB0100AAAB"]);
        write(&config.files.source_dir, "d.100.csv", &["DDDDDD0100XXXX", "DDDDDD0100XXXX", "DDDDDD0100XXXX"]);

        let pairing = JobPairing::discover(&config.files).unwrap();
        let pairs: Vec<(String, String)> = pairing
            .jobs()
            .iter()
            .map(|j| (j.target_name.clone(), j.source_name.clone()))
            .collect();
        assert_eq!(pairs, vec![
            ("a.100.csv".to_string(), "c.100.csv".to_string()),
            ("a.100.csv".to_string(), "d.100.csv".to_string()),
        ]);

        let summary = WorkerPool::new(&config).run(pairing).unwrap();
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.completed(), 2);

        // a vs c: one XXXX consumed, AAAB is missing and close to AAAA only
        assert_eq!(
            report(&config, "c.100.csv-missing.csv"),
            "source row,source type,target row,changed indices\n\
             BBBBBB,0100,AAAAAA-0100 | AAAAAA-0100,13|10:11:12:13\n"
        );
        assert_eq!(
            report(&config, "c.100.csv-raw.csv"),
            "row,raw\nBBBBBB,BBBBBB0100AAAB\nAAAAAA,AAAAAA0100AAAA\n\n"
        );
        assert_eq!(
            report(&config, "c.100.csv-unmatched.csv"),
            "Id,Type,Raw\nAAAAAA,0200,AAAAAA0200QQQQ\n"
        );

        // a vs d: two XXXX copies consumed, the third is missing
        assert_eq!(
            report(&config, "d.100.csv-missing.csv"),
            "source row,source type,target row,changed indices\n\
             DDDDDD,0100,AAAAAA-0100,10:11:12:13\n"
        );
        assert_eq!(
            report(&config, "d.100.csv-unmatched.csv"),
            "Id,Type,Raw\nAAAAAA,0200,AAAAAA0200QQQQ\n"
        );

        let summary_path = config.files.summary_file.clone().unwrap();
        summary.export_csv(&summary_path).unwrap();
        let rows = fs::read_to_string(&summary_path).unwrap();
        assert_eq!(rows.lines().count(), 3);
        assert!(rows.lines().nth(1).unwrap().starts_with("1,a.100.csv,c.100.csv,completed,4,2,1,1,2,3,0,"));
        assert!(rows.lines().nth(2).unwrap().starts_with("2,a.100.csv,d.100.csv,completed,4,3,2,1,1,2,0,"));
    }

    #[test]
    fn missing_target_fails_only_its_job() {
        let (_dir, config) = setup_with_summary(2);
        write(&config.files.target_dir, "a.1.txt", &["AAAAAA0001XXXX"]);
        write(&config.files.target_dir, "b.1.txt", &["AAAAAA0001XXXX"]);
        write(&config.files.source_dir, "c.1.txt", &["AAAAAA0001XXXX"]);

        let pairing = JobPairing::discover(&config.files).unwrap();
        assert_eq!(pairing.len(), 2);
        fs::remove_file(config.files.target_dir.join("b.1.txt")).unwrap();

        let summary = WorkerPool::new(&config).run(pairing).unwrap();
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.failed(), 1);

        match &summary.outcomes[1] {
            JobOutcome::Failed { job, stage, .. } => {
                assert_eq!(job.target_name, "b.1.txt");
                assert_eq!(*stage, JobStage::BuildTargetBuffer);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn malformed_lines_follow_the_skip_setting() {
        let (_dir, mut config) = setup_with_summary(1);
        write(&config.files.target_dir, "a.1.txt", &["AAAAAA0001XXXX", "tiny"]);
        write(&config.files.source_dir, "c.1.txt", &["AAAAAA0001XXXX"]);

        let summary = WorkerPool::new(&config)
            .run(JobPairing::discover(&config.files).unwrap())
            .unwrap();
        assert_eq!(summary.failed(), 1);

        config.worker.skip_malformed = true;
        let summary = WorkerPool::new(&config)
            .run(JobPairing::discover(&config.files).unwrap())
            .unwrap();
        assert_eq!(summary.completed(), 1);
        assert_eq!(report(&config, "c.1.txt-unmatched.csv"), "Id,Type,Raw\n");
    }

    #[test]
    fn bad_file_names_stop_discovery() {
        let (_dir, config) = setup_with_summary(1);
        write(&config.files.target_dir, "a.1.txt", &["AAAAAA0001XXXX"]);
        write(&config.files.source_dir, "README", &["AAAAAA0001XXXX"]);

        assert!(JobPairing::discover(&config.files).is_err());
    }
}
