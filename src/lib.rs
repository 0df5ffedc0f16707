//! Output commit coordinator: a driver-resident authority that decides
//! which attempt of a `(stage, task)` pair may commit its output to a
//! shared durable store.
//!
//! Under speculative execution or task retry, more than one attempt of the
//! same logical task can be running at once, and more than one of them can
//! reach the "ready to commit" point. Letting every ready attempt write to
//! the durable store unconditionally risks double writes or, worse, one
//! attempt's output silently clobbering another's. This crate is the
//! single arbiter each attempt must ask before writing: exactly one
//! attempt per `(stage, task)` is ever granted permission, and that grant
//! holds until its outcome (or the stage ending) releases it.
//!
//! This crate owns only that decision. It does not run tasks, does not
//! talk to the durable store, and does not provide a network transport —
//! see [`transport::AskTransport`] for the seam a hosting driver fills in
//! to carry requests from a remote task back to this coordinator.
//!
//! # Usage
//!
//! ```no_run
//! # async fn example() -> tasker_occ::OccResult<()> {
//! use tasker_occ::{OccConfig, OutputCommitCoordinator, TaskEndReason};
//!
//! let coordinator = OutputCommitCoordinator::start(OccConfig::default());
//!
//! coordinator.stage_start(0);
//! if coordinator.can_commit(0, 3, 100).await? {
//!     // write output, then report the outcome.
//!     coordinator.task_completed(0, 3, 100, TaskEndReason::Success);
//! }
//! coordinator.stage_end(0);
//! coordinator.stop().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;
mod error;
mod facade;
mod kernel;
mod messages;
mod table;
mod transport;
mod types;

pub use config::OccConfig;
pub use error::{OccError, OccResult};
pub use facade::OutputCommitCoordinator;
pub use messages::OccMessage;
pub use transport::{ask_with_retry, AskTransport};
pub use types::{AttemptId, StageId, TaskEndReason, TaskId};
