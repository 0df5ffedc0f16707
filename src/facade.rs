//! The client facade: what the scheduler calls in-process to announce
//! stage lifecycle and task outcomes, and what a task calls (indirectly,
//! via a transport) to ask for commit permission.

use std::sync::Arc;
use std::sync::RwLock;

use crate::config::OccConfig;
use crate::dispatcher::{self, DispatcherHandle};
use crate::error::OccResult;
use crate::transport::{ask_with_retry, AskTransport, LocalTransport};
use crate::types::{AttemptId, StageId, TaskEndReason, TaskId};

/// The output commit coordinator.
///
/// Construct one with [`OutputCommitCoordinator::start`] on a running
/// `tokio` runtime. Every notification method is fire-and-forget;
/// [`can_commit`](Self::can_commit) is the only call that blocks (on the
/// transport's reply, subject to retry and timeout).
#[derive(Debug, Clone)]
pub struct OutputCommitCoordinator {
    // `None` once `stop()` has completed, or before the coordinator has
    // been attached to a live dispatcher. A request against a detached
    // coordinator is always denied, never an error — a denial is safe at
    // any time.
    dispatcher: Arc<RwLock<Option<DispatcherHandle>>>,
    config: OccConfig,
}

impl OutputCommitCoordinator {
    /// Spawns the dispatcher actor on the current `tokio` runtime and
    /// returns a coordinator attached to it.
    pub fn start(config: OccConfig) -> Self {
        Self {
            dispatcher: Arc::new(RwLock::new(Some(dispatcher::spawn()))),
            config,
        }
    }

    /// A coordinator with no dispatcher attached. `can_commit` against it
    /// always denies; every notification is a no-op. Useful for the
    /// window before a driver has finished bringing up its coordinator, or
    /// in tests that don't need a live dispatcher.
    pub fn detached(config: OccConfig) -> Self {
        Self {
            dispatcher: Arc::new(RwLock::new(None)),
            config,
        }
    }

    fn handle(&self) -> Option<DispatcherHandle> {
        self.dispatcher
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// `StageStarted(stage)`: eventually (re-)creates the commit slot
    /// table for `stage`.
    pub fn stage_start(&self, stage: StageId) {
        if let Some(handle) = self.handle() {
            handle.stage_started(stage);
        }
    }

    /// `StageEnded(stage)`: eventually destroys `stage`'s commit slot
    /// table.
    pub fn stage_end(&self, stage: StageId) {
        if let Some(handle) = self.handle() {
            handle.stage_ended(stage);
        }
    }

    /// `TaskCompleted(stage, task, attempt, reason)`.
    pub fn task_completed(
        &self,
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
        reason: TaskEndReason,
    ) {
        if let Some(handle) = self.handle() {
            handle.task_completed(stage, task, attempt, reason);
        }
    }

    /// `AskPermissionToCommit(stage, task, attempt) -> bool`, retried
    /// per [`OccConfig`] over the in-process transport.
    ///
    /// Returns `Ok(false)` immediately, without touching the transport,
    /// if no dispatcher is attached. Returns
    /// [`OccError::CoordinatorUnreachable`](crate::error::OccError::CoordinatorUnreachable)
    /// if every retry over an attached dispatcher fails to produce a
    /// reply — callers must treat that the same as a denial.
    pub async fn can_commit(
        &self,
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
    ) -> OccResult<bool> {
        self.can_commit_via(LocalTransport::new_boxed, stage, task, attempt)
            .await
    }

    /// Test seam: run `can_commit`'s retry policy over an arbitrary
    /// transport instead of the in-process default. Not part of the
    /// public API — production callers use [`can_commit`](Self::can_commit).
    pub(crate) async fn can_commit_via<F>(
        &self,
        make_transport: F,
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
    ) -> OccResult<bool>
    where
        F: FnOnce(DispatcherHandle) -> Box<dyn AskTransport>,
    {
        let Some(handle) = self.handle() else {
            return Ok(false);
        };
        let transport = make_transport(handle);
        ask_with_retry(
            transport.as_ref(),
            stage,
            task,
            attempt,
            self.config.ask_timeout,
            self.config.max_send_attempts,
            self.config.retry_interval,
        )
        .await
    }

    /// Read-only diagnostic: the attempt currently authorized to commit
    /// `(stage, task)`, if any.
    pub async fn authorized_committer(&self, stage: StageId, task: TaskId) -> Option<AttemptId> {
        match self.handle() {
            Some(handle) => handle.authorized_committer(stage, task).await,
            None => None,
        }
    }

    /// Read-only diagnostic: how many stages are currently tracked as
    /// live.
    pub async fn live_stage_count(&self) -> usize {
        match self.handle() {
            Some(handle) => handle.live_stage_count().await,
            None => 0,
        }
    }

    /// Drains state and detaches the dispatcher. After this returns, every
    /// method on this coordinator (and any clone of it) behaves as if
    /// [`detached`](Self::detached) had been used instead.
    pub async fn stop(&self) {
        let handle = {
            let mut guard = self
                .dispatcher
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.take()
        };
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}

impl LocalTransport {
    fn new_boxed(dispatcher: DispatcherHandle) -> Box<dyn AskTransport> {
        Box::new(LocalTransport::new(dispatcher))
    }
}
