//! Batch extraction.
//!
//! A run walks every (source directory × RAW type) pair in order. Each pass
//! discovers its files and feeds them through the [`Scheduler`], which keeps
//! at most `budget` decodes in flight and waits for every one of them before
//! moving on. Rotations requested by finished decodes run alongside and are
//! waited for, up to a deadline, before the run reports its [`RunSummary`].

mod aggregate;
mod discovery;
pub mod error;
mod rotate;
mod scheduler;

pub use crate::aggregate::RunSummary;
pub use crate::discovery::{SourceFile, discover};
pub use crate::rotate::{RotationDispatcher, RotationRequest, RotationSummary, RotationTracker, Rotator};
pub use crate::scheduler::Scheduler;
