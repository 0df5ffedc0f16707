//! The message dispatcher: a single-consumer mailbox that owns the
//! committers table and is the only thing ever allowed to mutate it.
//!
//! Everything that looks like concurrency control in this crate collapses
//! to one guarantee: there is exactly one `tokio` task running
//! [`run`], and every event — from the scheduler or from any number of
//! remote tasks — passes through its mailbox before touching the table.
//! That single-writer discipline is what lets [`kernel`](crate::kernel)
//! stay free of locks.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::kernel;
use crate::messages::{Envelope, MailboxItem, OccMessage, Query};
use crate::table::CommittersByStage;
use crate::types::{AttemptId, StageId, TaskEndReason, TaskId};

const MAILBOX_CAPACITY: usize = 1024;

/// A cloneable, cheap-to-hold reference to a running dispatcher's mailbox.
/// Once the dispatcher has processed `StopCoordinator` it drops its
/// receiver, and every method here degrades to a silent no-op / `None` —
/// matching the design's "subsequent sends are dropped silently" rule.
#[derive(Debug, Clone)]
pub(crate) struct DispatcherHandle {
    sender: mpsc::Sender<MailboxItem>,
}

impl DispatcherHandle {
    fn send_notification(&self, message: OccMessage) {
        // A full mailbox or a stopped dispatcher both mean "best effort
        // delivery failed"; neither is something a fire-and-forget caller
        // can act on.
        if self
            .sender
            .try_send(MailboxItem::Envelope(Envelope::notification(
                message.clone(),
            )))
            .is_err()
        {
            debug!(?message, "notification dropped: dispatcher unavailable");
        }
    }

    pub(crate) fn stage_started(&self, stage: StageId) {
        self.send_notification(OccMessage::StageStarted { stage });
    }

    pub(crate) fn stage_ended(&self, stage: StageId) {
        self.send_notification(OccMessage::StageEnded { stage });
    }

    pub(crate) fn task_completed(
        &self,
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
        reason: TaskEndReason,
    ) {
        self.send_notification(OccMessage::TaskCompleted {
            stage,
            task,
            attempt,
            reason,
        });
    }

    /// Enqueues an `AskPermissionToCommit` and returns the receiving half
    /// of its reply channel, or `None` if the dispatcher is not (or no
    /// longer) accepting messages. The transport shim owns retrying and
    /// timing this out; this method never blocks beyond the send itself.
    pub(crate) async fn ask_permission_to_commit(
        &self,
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
    ) -> Option<oneshot::Receiver<bool>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = OccMessage::AskPermissionToCommit {
            stage,
            task,
            attempt,
        };
        self.sender
            .send(MailboxItem::Envelope(Envelope::request(message, reply_tx)))
            .await
            .ok()?;
        Some(reply_rx)
    }

    /// Requests shutdown and waits for the dispatcher's acknowledgment.
    /// Returns `false` if the dispatcher was already gone.
    pub(crate) async fn stop(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(MailboxItem::Envelope(Envelope::request(
                OccMessage::StopCoordinator,
                reply_tx,
            )))
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Diagnostic: who (if anyone) currently holds `(stage, task)`'s slot.
    pub(crate) async fn authorized_committer(
        &self,
        stage: StageId,
        task: TaskId,
    ) -> Option<AttemptId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(MailboxItem::Query(Query::AuthorizedCommitter {
                stage,
                task,
                reply: reply_tx,
            }))
            .await
            .ok()?;
        reply_rx.await.ok().flatten()
    }

    /// Diagnostic: how many stages the coordinator currently tracks as
    /// live.
    pub(crate) async fn live_stage_count(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(MailboxItem::Query(Query::LiveStageCount { reply: reply_tx }))
            .await
            .is_err()
        {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }
}

/// Spawns the dispatcher loop on the current `tokio` runtime and returns a
/// handle to its mailbox.
pub(crate) fn spawn() -> DispatcherHandle {
    let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
    tokio::spawn(run(receiver));
    DispatcherHandle { sender }
}

/// The mailbox loop. Processes one [`MailboxItem`] at a time to completion
/// before pulling the next — this serialization is the entirety of the
/// coordinator's concurrency story.
async fn run(mut receiver: mpsc::Receiver<MailboxItem>) {
    let mut table = CommittersByStage::new();
    let mut stopped = false;

    while let Some(item) = receiver.recv().await {
        match item {
            MailboxItem::Query(query) => handle_query(&table, query),
            MailboxItem::Envelope(Envelope { message, reply }) => match message {
                OccMessage::StageStarted { stage } => {
                    kernel::handle_stage_start(&mut table, stage);
                }
                OccMessage::StageEnded { stage } => {
                    kernel::handle_stage_end(&mut table, stage);
                }
                OccMessage::AskPermissionToCommit {
                    stage,
                    task,
                    attempt,
                } => {
                    let granted =
                        kernel::handle_ask_permission_to_commit(&mut table, stage, task, attempt);
                    reply_with(reply, granted);
                }
                OccMessage::TaskCompleted {
                    stage,
                    task,
                    attempt,
                    reason,
                } => {
                    kernel::handle_task_completion(&mut table, stage, task, attempt, &reason);
                }
                OccMessage::StopCoordinator => {
                    info!(
                        live_stages = table.live_stage_count(),
                        "coordinator stopping, discarding all commit state"
                    );
                    table.clear();
                    reply_with(reply, true);
                    stopped = true;
                }
            },
        }
        if stopped {
            break;
        }
    }

    receiver.close();
    // Drain and drop anything still queued so every waiting caller
    // observes a closed channel rather than hanging indefinitely.
    while let Some(item) = receiver.recv().await {
        match item {
            MailboxItem::Envelope(Envelope { reply: Some(reply), .. }) => {
                let _ = reply.send(false);
            }
            MailboxItem::Envelope(_) => {}
            MailboxItem::Query(Query::AuthorizedCommitter { reply, .. }) => {
                let _ = reply.send(None);
            }
            MailboxItem::Query(Query::LiveStageCount { reply }) => {
                let _ = reply.send(0);
            }
        }
    }
}

fn handle_query(table: &CommittersByStage, query: Query) {
    match query {
        Query::AuthorizedCommitter { stage, task, reply } => {
            let _ = reply.send(table.holder(stage, task));
        }
        Query::LiveStageCount { reply } => {
            let _ = reply.send(table.live_stage_count());
        }
    }
}

fn reply_with(reply: Option<oneshot::Sender<bool>>, value: bool) {
    if let Some(reply) = reply {
        // The requester may have already timed out and dropped its
        // receiver; a discarded reply is harmless because the mutation it
        // reports is idempotent under retry.
        let _ = reply.send(value);
    } else {
        warn!("reply channel missing for a request-kind message");
    }
}
