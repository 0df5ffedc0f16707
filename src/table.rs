//! The committers table: `stage -> (task -> authorized attempt)`.
//!
//! This module owns no synchronization of its own. It is safe as a plain
//! `HashMap`-of-`HashMap` because exactly one caller ever touches it: the
//! [`dispatcher`](crate::dispatcher) loop. Nothing outside this crate's
//! dispatcher should hold a reference into it across an `.await` point.

use std::collections::HashMap;

use crate::types::{AttemptId, StageId, TaskId};

/// The authorized committer for each task of one live stage.
#[derive(Debug, Default, Clone)]
pub struct StageCommitSet {
    holders: HashMap<TaskId, AttemptId>,
}

impl StageCommitSet {
    fn new() -> Self {
        Self::default()
    }

    /// Current holder of `task`'s slot, if any.
    pub fn holder(&self, task: TaskId) -> Option<AttemptId> {
        self.holders.get(&task).copied()
    }

    /// Grants `attempt` the slot for `task` if nobody holds it yet.
    /// Returns `true` iff the grant happened.
    fn try_grant(&mut self, task: TaskId, attempt: AttemptId) -> bool {
        if self.holders.contains_key(&task) {
            return false;
        }
        self.holders.insert(task, attempt);
        true
    }

    /// Releases `task`'s slot iff it is currently held by exactly
    /// `attempt`. A mismatched holder is left untouched.
    fn release_if_held_by(&mut self, task: TaskId, attempt: AttemptId) {
        if self.holders.get(&task) == Some(&attempt) {
            self.holders.remove(&task);
        }
    }

    /// Number of tasks currently holding a slot in this stage.
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

/// Process-wide coordinator state: every stage the driver currently
/// considers live.
#[derive(Debug, Default)]
pub struct CommittersByStage {
    stages: HashMap<StageId, StageCommitSet>,
}

impl CommittersByStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absence of an entry means "stage not live" — callers must deny any
    /// permission request against such a stage.
    pub fn is_live(&self, stage: StageId) -> bool {
        self.stages.contains_key(&stage)
    }

    pub fn stage(&self, stage: StageId) -> Option<&StageCommitSet> {
        self.stages.get(&stage)
    }

    /// (Re-)creates an empty slot table for `stage`, discarding whatever
    /// was there before. Repeated `StageStarted` for a live stage is
    /// intentional here, not a bug: the driver only re-announces a stage
    /// it considers the prior incarnation of abandoned.
    pub fn start_stage(&mut self, stage: StageId) {
        self.stages.insert(stage, StageCommitSet::new());
    }

    /// Discards a stage's slot table entirely. A no-op if the stage was
    /// already gone.
    pub fn end_stage(&mut self, stage: StageId) {
        self.stages.remove(&stage);
    }

    /// Attempts to grant `attempt` the commit slot for `(stage, task)`.
    /// Returns `false` for a stage that isn't live, in addition to the
    /// usual "already held" denial.
    pub fn try_grant(&mut self, stage: StageId, task: TaskId, attempt: AttemptId) -> bool {
        match self.stages.get_mut(&stage) {
            Some(set) => set.try_grant(task, attempt),
            None => false,
        }
    }

    /// Releases `(stage, task)`'s slot iff it is held by `attempt` and the
    /// stage is still live. A no-op otherwise.
    pub fn release_if_held_by(&mut self, stage: StageId, task: TaskId, attempt: AttemptId) {
        if let Some(set) = self.stages.get_mut(&stage) {
            set.release_if_held_by(task, attempt);
        }
    }

    /// Current holder of `(stage, task)`'s slot, if the stage is live and
    /// the slot is held.
    pub fn holder(&self, stage: StageId, task: TaskId) -> Option<AttemptId> {
        self.stages.get(&stage).and_then(|set| set.holder(task))
    }

    /// How many stages this coordinator currently tracks as live.
    pub fn live_stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Discards all state. Called once, from `stop()`.
    pub fn clear(&mut self) {
        self.stages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_stage_denies_grant() {
        let mut table = CommittersByStage::new();
        assert!(!table.try_grant(1, 1, 100));
    }

    #[test]
    fn first_grant_wins_second_is_denied() {
        let mut table = CommittersByStage::new();
        table.start_stage(5);
        assert!(table.try_grant(5, 9, 100));
        assert!(!table.try_grant(5, 9, 101));
        assert_eq!(table.holder(5, 9), Some(100));
    }

    #[test]
    fn release_only_clears_matching_holder() {
        let mut table = CommittersByStage::new();
        table.start_stage(5);
        table.try_grant(5, 9, 100);
        table.release_if_held_by(5, 9, 999);
        assert_eq!(table.holder(5, 9), Some(100));
        table.release_if_held_by(5, 9, 100);
        assert_eq!(table.holder(5, 9), None);
    }

    #[test]
    fn restarting_a_stage_discards_old_holders() {
        let mut table = CommittersByStage::new();
        table.start_stage(5);
        table.try_grant(5, 9, 100);
        table.start_stage(5);
        assert_eq!(table.holder(5, 9), None);
        assert!(table.try_grant(5, 9, 200));
    }

    #[test]
    fn ending_a_stage_discards_its_table() {
        let mut table = CommittersByStage::new();
        table.start_stage(5);
        table.try_grant(5, 9, 100);
        table.end_stage(5);
        assert!(!table.is_live(5));
        assert!(!table.try_grant(5, 9, 101));
    }
}
