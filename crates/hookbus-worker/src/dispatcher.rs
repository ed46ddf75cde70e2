//! Task-queue action dispatcher.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use hookbus_core::result::HookResult;
use hookbus_core::types::hook::HookRegistration;
use hookbus_engine::dispatch::{ActionDispatcher, SyncDispatcher};
use hookbus_engine::runner::HookRunner;

use crate::job::ActionJob;

/// Queues action registrations for an [`ActionWorker`](crate::ActionWorker).
///
/// `dispatch` never waits for the job to run. When the channel is full or
/// no worker is listening anymore, the registration runs inline instead,
/// and its error is returned like the synchronous dispatcher would.
#[derive(Debug, Clone)]
pub struct TaskQueueDispatcher {
    sender: mpsc::Sender<ActionJob>,
    fallback: SyncDispatcher,
}

impl TaskQueueDispatcher {
    /// Creates a dispatcher and the receiving end for its worker.
    pub fn channel(capacity: usize, runner: HookRunner) -> (Self, mpsc::Receiver<ActionJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let dispatcher = Self {
            sender,
            fallback: SyncDispatcher::new(runner),
        };
        (dispatcher, receiver)
    }

    /// Number of free slots in the channel.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }
}

#[async_trait]
impl ActionDispatcher for TaskQueueDispatcher {
    fn mode(&self) -> &'static str {
        "queue"
    }

    async fn dispatch(
        &self,
        hook: &str,
        registration: HookRegistration,
        args: &[Value],
    ) -> HookResult<()> {
        let job = ActionJob::new(hook, registration, args.to_vec());
        let job_id = job.id;

        match self.sender.try_send(job) {
            Ok(()) => {
                debug!(hook, job_id = %job_id, "Action queued");
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                warn!(hook, job_id = %job_id, "Action queue full, running inline");
                self.fallback.dispatch(hook, job.registration, &job.args).await
            }
            Err(TrySendError::Closed(job)) => {
                warn!(hook, job_id = %job_id, "Action queue closed, running inline");
                self.fallback.dispatch(hook, job.registration, &job.args).await
            }
        }
    }
}
