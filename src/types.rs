//! Primitive identifiers and the task-end reason taxonomy shared by every
//! layer of the coordinator.

use serde::{Deserialize, Serialize};

/// Identifier of a stage. Stages are numbered by the scheduler; the
/// coordinator treats the value as opaque.
pub type StageId = i64;

/// Index of a logical task within its stage.
pub type TaskId = i64;

/// Identifier of one physical attempt of a `(stage, task)`, unique within
/// that pair. Multiple attempts of the same task may be in flight at once
/// (speculation, retries).
pub type AttemptId = i64;

/// Why a task attempt ended, as reported by the scheduler via
/// [`TaskCompleted`](crate::messages::OccMessage::TaskCompleted).
///
/// The coordinator inspects only the tag, never any payload carried by
/// `Other` — it has no business understanding *why* an attempt failed,
/// only whether the failure should release a held lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEndReason {
    /// The attempt finished normally. Does not release the slot: the slot
    /// stays held until the stage ends, so a late duplicate attempt can
    /// never sneak in behind a committed result.
    Success,
    /// This coordinator denied the attempt's commit request. A denial must
    /// never release the lock actually held by the attempt that won it.
    CommitDenied {
        job: i64,
        split: i64,
        attempt: AttemptId,
    },
    /// Anything else: executor lost, uncaught exception, task killed, etc.
    /// Releases the slot if (and only if) this attempt was the one holding
    /// it.
    Other { descriptor: String },
}

impl TaskEndReason {
    /// A catch-all constructor for the "anything else" branch, for callers
    /// that don't need a specific descriptor.
    pub fn other(descriptor: impl Into<String>) -> Self {
        TaskEndReason::Other {
            descriptor: descriptor.into(),
        }
    }

    /// Whether handling this reason should attempt to clear a held slot
    /// (subject to the holder matching the reporting attempt). `Success`
    /// and `CommitDenied` are both inert; only the catch-all branch frees
    /// the lock.
    pub(crate) fn releases_lock(&self) -> bool {
        matches!(self, TaskEndReason::Other { .. })
    }
}
