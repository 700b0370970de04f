//! Bounded-concurrency job dispatch.
//!
//! The dispatch loop takes a semaphore permit before spawning each job, so at
//! most `concurrency` jobs run at once and dispatch blocks while the pool is
//! full. The permit travels with the task and is released when the task ends,
//! including by panic. A failing or panicking job is recorded and its siblings
//! keep running; success is only decided after every job has finished.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, instrument, warn};

use crate::error::{BuildError, Result};
use crate::job::{BuildJob, BuildResult, JobExecutor};

/// Results of one scheduler run, ordered by job name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub results: Vec<BuildResult>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BuildResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// `Err(JobsFailed)` if any job failed.
    pub fn ensure_success(&self) -> Result<()> {
        match self.failed_count() {
            0 => Ok(()),
            failed => Err(BuildError::JobsFailed {
                failed,
                total: self.total(),
            }),
        }
    }
}

/// Dispatches build jobs with at most `concurrency` in flight.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[instrument(skip_all, fields(jobs = jobs.len(), concurrency = self.concurrency))]
    pub async fn run(&self, executor: Arc<dyn JobExecutor>, jobs: Vec<BuildJob>) -> RunReport {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let results: Arc<Mutex<Vec<BuildResult>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::with_capacity(jobs.len());

        for job in jobs {
            let permit = Arc::clone(&sem).acquire_owned().await.ok();
            let executor = Arc::clone(&executor);
            let results = Arc::clone(&results);
            let name = job.name.clone();
            let platform = job.platform.to_string();
            let dispatched = Instant::now();

            let task = tokio::spawn(async move {
                let _permit = permit;
                let start = Instant::now();
                info!(job = %job.name, platform = %job.platform, "build started");

                let outcome = executor.execute(&job).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                let error = match outcome {
                    Ok(()) => {
                        info!(job = %job.name, elapsed_ms = duration_ms, "build finished");
                        None
                    }
                    Err(e) => {
                        warn!(job = %job.name, elapsed_ms = duration_ms, error = %e, "build failed");
                        Some(e.to_string())
                    }
                };

                results.lock().await.push(BuildResult {
                    job_name: job.name,
                    platform: job.platform.to_string(),
                    duration_ms,
                    error,
                });
            });

            tasks.push((name, platform, dispatched, task));
        }

        for (name, platform, dispatched, task) in tasks {
            if let Err(e) = task.await {
                let error = if e.is_panic() {
                    BuildError::JobPanicked { job: name.clone() }
                } else {
                    BuildError::Cancelled { job: name.clone() }
                };
                warn!(job = %name, error = %error, "build aborted");
                results.lock().await.push(BuildResult {
                    job_name: name,
                    platform,
                    duration_ms: dispatched.elapsed().as_millis() as u64,
                    error: Some(error.to_string()),
                });
            }
        }

        let mut results = std::mem::take(&mut *results.lock().await);
        results.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        RunReport { results }
    }
}
