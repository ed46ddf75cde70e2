//! Queued action job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use hookbus_core::types::hook::HookRegistration;

/// One action registration waiting for a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionJob {
    /// Job identifier, used in logs.
    pub id: Uuid,
    /// Hook name the action was fired on.
    pub hook: String,
    /// Registration to run.
    pub registration: HookRegistration,
    /// Arguments passed to `do_action`.
    pub args: Vec<Value>,
    /// When the job was queued.
    pub enqueued_at: DateTime<Utc>,
}

impl ActionJob {
    /// Creates a job stamped with a fresh id and the current time.
    pub fn new(hook: impl Into<String>, registration: HookRegistration, args: Vec<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hook: hook.into(),
            registration,
            args,
            enqueued_at: Utc::now(),
        }
    }
}
