//! The decision kernel: pure protocol logic over [`CommittersByStage`].
//!
//! Every function here is a synchronous read-modify-write against the
//! table and nothing else — no I/O, no channels, no locking. The
//! [`dispatcher`](crate::dispatcher) is the only caller, which is what
//! makes these "pure" in practice: there is never a second writer racing
//! a handler while it runs.

use tracing::{debug, info};

use crate::table::CommittersByStage;
use crate::types::{AttemptId, StageId, TaskEndReason, TaskId};

/// `StageStarted(stage)`. Idempotent: replaces any existing subtable with
/// an empty one, since a repeated announcement means the driver considers
/// the prior attempt at this stage abandoned.
pub fn handle_stage_start(table: &mut CommittersByStage, stage: StageId) {
    info!(stage, "stage started, commit slots reset");
    table.start_stage(stage);
}

/// `StageEnded(stage)`. Idempotent on a stage that was never live or has
/// already ended.
pub fn handle_stage_end(table: &mut CommittersByStage, stage: StageId) {
    info!(stage, "stage ended, commit slots discarded");
    table.end_stage(stage);
}

/// `AskPermissionToCommit(stage, task, attempt) -> bool`.
///
/// The first attempt to ask for an empty slot wins it; every subsequent
/// ask for that slot is denied regardless of which attempt is asking,
/// including a retry of the very attempt that already holds it — a grant
/// is not renewed by re-asking.
pub fn handle_ask_permission_to_commit(
    table: &mut CommittersByStage,
    stage: StageId,
    task: TaskId,
    attempt: AttemptId,
) -> bool {
    if !table.is_live(stage) {
        debug!(stage, task, attempt, "ask denied: stage not live");
        return false;
    }

    let granted = table.try_grant(stage, task, attempt);
    if granted {
        debug!(stage, task, attempt, "ask granted");
    } else {
        debug!(
            stage,
            task,
            attempt,
            holder = ?table.holder(stage, task),
            "ask denied: slot already held"
        );
    }
    granted
}

/// `TaskCompleted(stage, task, attempt, reason)`.
///
/// A no-op on a stage that isn't live (late completion after `StageEnded`,
/// or a scheduler-contract violation where completion precedes the
/// stage's start — both are tolerated, not errors). `Success` and
/// `CommitDenied` never mutate the table; only an unrelated-failure reason
/// releases the slot, and only if the reporting attempt is the one that
/// actually holds it.
pub fn handle_task_completion(
    table: &mut CommittersByStage,
    stage: StageId,
    task: TaskId,
    attempt: AttemptId,
    reason: &TaskEndReason,
) {
    if !table.is_live(stage) {
        debug!(
            stage,
            task, attempt, "task completion ignored: stage not live"
        );
        return;
    }

    if !reason.releases_lock() {
        debug!(stage, task, attempt, ?reason, "task completion is inert");
        return;
    }

    let holder = table.holder(stage, task);
    table.release_if_held_by(stage, task, attempt);
    if holder == Some(attempt) {
        debug!(stage, task, attempt, "slot released after attempt failure");
    } else {
        debug!(
            stage,
            task,
            attempt,
            holder = ?holder,
            "failure reported by an attempt that never held the slot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskEndReason;

    fn reason_other() -> TaskEndReason {
        TaskEndReason::other("executor lost")
    }

    fn reason_denied(attempt: AttemptId) -> TaskEndReason {
        TaskEndReason::CommitDenied {
            job: 1,
            split: 1,
            attempt,
        }
    }

    /// Scenario 1 in the spec: speculation race.
    #[test]
    fn speculation_race() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        assert!(handle_ask_permission_to_commit(&mut table, 5, 9, 100));
        assert!(!handle_ask_permission_to_commit(&mut table, 5, 9, 101));
        handle_task_completion(&mut table, 5, 9, 100, &TaskEndReason::Success);
        assert!(!handle_ask_permission_to_commit(&mut table, 5, 9, 102));
    }

    /// Scenario 2: failed committer frees the slot for a later attempt.
    #[test]
    fn failed_committer_frees_slot() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        assert!(handle_ask_permission_to_commit(&mut table, 5, 9, 100));
        handle_task_completion(&mut table, 5, 9, 100, &reason_other());
        assert!(handle_ask_permission_to_commit(&mut table, 5, 9, 101));
        handle_task_completion(&mut table, 5, 9, 101, &TaskEndReason::Success);
    }

    /// Scenario 3: a completion for an attempt that never held the slot
    /// leaves it untouched.
    #[test]
    fn stale_completion_is_inert() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        assert!(handle_ask_permission_to_commit(&mut table, 5, 9, 100));
        handle_task_completion(&mut table, 5, 9, 77, &reason_other());
        assert!(!handle_ask_permission_to_commit(&mut table, 5, 9, 101));
    }

    /// Scenario 4: stage gating before start and after end.
    #[test]
    fn stage_gating() {
        let mut table = CommittersByStage::new();
        assert!(!handle_ask_permission_to_commit(&mut table, 7, 0, 1));
        handle_stage_start(&mut table, 7);
        assert!(handle_ask_permission_to_commit(&mut table, 7, 0, 1));
        handle_stage_end(&mut table, 7);
        assert!(!handle_ask_permission_to_commit(&mut table, 7, 0, 2));
    }

    /// Scenario 5: denial is inert and does not release a real lock.
    #[test]
    fn denial_is_inert() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        assert!(handle_ask_permission_to_commit(&mut table, 5, 9, 100));
        handle_task_completion(&mut table, 5, 9, 101, &reason_denied(101));
        assert!(!handle_ask_permission_to_commit(&mut table, 5, 9, 102));
    }

    /// P6: replaying an ask twice is idempotent.
    #[test]
    fn idempotent_retry() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        let first = handle_ask_permission_to_commit(&mut table, 5, 9, 100);
        let second = handle_ask_permission_to_commit(&mut table, 5, 9, 100);
        assert!(first);
        assert!(!second);
        assert_eq!(table.holder(5, 9), Some(100));
    }

    /// P7: an unrelated attempt's failure cannot release someone else's
    /// lock.
    #[test]
    fn unrelated_attempt_cannot_release_lock() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        handle_ask_permission_to_commit(&mut table, 5, 9, 100);
        handle_task_completion(&mut table, 5, 9, 101, &reason_other());
        assert_eq!(table.holder(5, 9), Some(100));
    }

    /// Restarting a live stage is a hard reset, not a merge.
    #[test]
    fn repeated_stage_start_resets_subtable() {
        let mut table = CommittersByStage::new();
        handle_stage_start(&mut table, 5);
        handle_ask_permission_to_commit(&mut table, 5, 9, 100);
        handle_stage_start(&mut table, 5);
        assert!(handle_ask_permission_to_commit(&mut table, 5, 9, 200));
    }
}
