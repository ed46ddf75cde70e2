//! Background action dispatch for hookbus.
//!
//! This crate provides:
//! - A task-queue dispatcher that hands action registrations to a bounded channel
//! - A worker that drains the channel and runs each job through the hook runner
//! - The queued job record

pub mod dispatcher;
pub mod job;
pub mod runner;

pub use dispatcher::TaskQueueDispatcher;
pub use job::ActionJob;
pub use runner::{ActionWorker, WorkerHandle};
