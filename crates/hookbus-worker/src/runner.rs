//! Worker loop that executes queued action jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hookbus_engine::runner::HookRunner;

use crate::job::ActionJob;

/// How long shutdown waits for in-flight jobs.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs queued action jobs with bounded concurrency.
#[derive(Debug)]
pub struct ActionWorker {
    receiver: mpsc::Receiver<ActionJob>,
    runner: HookRunner,
    concurrency: usize,
    worker_id: String,
}

impl ActionWorker {
    /// Creates a worker reading from `receiver`.
    pub fn new(
        receiver: mpsc::Receiver<ActionJob>,
        runner: HookRunner,
        concurrency: usize,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            receiver,
            runner,
            concurrency: concurrency.max(1),
            worker_id: worker_id.into(),
        }
    }

    /// Spawns the worker on the current runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (cancel, cancel_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(cancel_rx));
        WorkerHandle { cancel, join }
    }

    /// Runs until cancelled or until every dispatcher is dropped.
    ///
    /// On cancel, jobs already in the channel still run before returning.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        info!(
            worker_id = %self.worker_id,
            concurrency = self.concurrency,
            "Action worker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut cancelled = false;

        loop {
            tokio::select! {
                changed = cancel.changed(), if !cancelled => {
                    if changed.is_err() || *cancel.borrow() {
                        info!(worker_id = %self.worker_id, "Action worker received shutdown signal");
                        cancelled = true;
                        self.receiver.close();
                    }
                }
                job = self.receiver.recv() => {
                    match job {
                        Some(job) => self.execute(job, &semaphore).await,
                        None => break,
                    }
                }
            }
        }

        debug!(worker_id = %self.worker_id, "Waiting for in-flight actions");
        let permits = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        if tokio::time::timeout(DRAIN_TIMEOUT, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            warn!(worker_id = %self.worker_id, "In-flight actions did not finish before shutdown");
        }

        info!(worker_id = %self.worker_id, "Action worker shut down");
    }

    async fn execute(&self, job: ActionJob, semaphore: &Arc<Semaphore>) {
        let Ok(permit) = Arc::clone(semaphore).acquire_owned().await else {
            error!(job_id = %job.id, "Worker semaphore closed, dropping action");
            return;
        };

        let runner = self.runner.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let queued_ms = (chrono::Utc::now() - job.enqueued_at).num_milliseconds();

            debug!(
                job_id = %job.id,
                hook = %job.hook,
                priority = job.registration.priority,
                queued_ms,
                "Running queued action"
            );

            if let Err(e) = runner.run_registration(&job.registration, &job.args).await {
                error!(
                    job_id = %job.id,
                    hook = %job.hook,
                    error = %e,
                    "Queued action failed"
                );
            }
        });
    }
}

/// Handle to a spawned [`ActionWorker`]. Dropping it also stops the worker.
#[derive(Debug)]
pub struct WorkerHandle {
    cancel: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signals shutdown and waits until queued and in-flight jobs finish.
    pub async fn shutdown(self) {
        let _ = self.cancel.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "Action worker task failed");
        }
    }
}
