//! The transport shim: a narrow interface for sending an
//! `AskPermissionToCommit` and awaiting a boolean reply, wrapped in bounded
//! retries and an overall per-attempt timeout.
//!
//! Carrying the request/response envelope across an actual network is
//! explicitly out of scope for this crate (that's the hosting driver's
//! transport layer); what lives here is the retry/timeout policy and the
//! narrow trait a real transport would implement, plus an in-process
//! implementation used whenever the asking task lives in the same
//! process as the coordinator.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

use crate::dispatcher::DispatcherHandle;
use crate::error::{OccError, OccResult};
use crate::types::{AttemptId, StageId, TaskId};

/// What a transport must provide: send one `AskPermissionToCommit` and
/// wait for its reply. A single call here is one "send attempt" in the
/// retry policy below; `None` means this attempt did not produce a reply
/// (the asker times out or retries, never interprets a missing reply as a
/// denial on its own).
#[async_trait]
pub trait AskTransport: Send + Sync {
    async fn ask(&self, stage: StageId, task: TaskId, attempt: AttemptId) -> Option<bool>;
}

/// The transport used when the coordinator and its caller share a
/// process: the ask is handed directly to the dispatcher's mailbox with
/// no serialization step.
#[derive(Debug, Clone)]
pub(crate) struct LocalTransport {
    dispatcher: DispatcherHandle,
}

impl LocalTransport {
    pub(crate) fn new(dispatcher: DispatcherHandle) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl AskTransport for LocalTransport {
    async fn ask(&self, stage: StageId, task: TaskId, attempt: AttemptId) -> Option<bool> {
        let receiver = self
            .dispatcher
            .ask_permission_to_commit(stage, task, attempt)
            .await?;
        receiver.await.ok()
    }
}

/// Drives `transport.ask` up to `max_send_attempts` times, spaced by
/// `retry_interval`, each individually bounded by `ask_timeout`. Returns
/// the first reply received verbatim; on exhaustion, fails with
/// [`OccError::CoordinatorUnreachable`].
///
/// Exposed publicly so a driver that implements [`AskTransport`] over a
/// real network can reuse this retry policy instead of reimplementing it.
pub async fn ask_with_retry(
    transport: &dyn AskTransport,
    stage: StageId,
    task: TaskId,
    attempt: AttemptId,
    ask_timeout: Duration,
    max_send_attempts: u32,
    retry_interval: Duration,
) -> OccResult<bool> {
    let max_send_attempts = max_send_attempts.max(1);
    let mut attempts_made = 0;

    loop {
        attempts_made += 1;
        let outcome = timeout(ask_timeout, transport.ask(stage, task, attempt)).await;

        match outcome {
            Ok(Some(granted)) => return Ok(granted),
            Ok(None) => debug!(stage, task, attempt, attempts_made, "ask produced no reply"),
            Err(_) => debug!(stage, task, attempt, attempts_made, "ask timed out"),
        }

        if attempts_made >= max_send_attempts {
            return Err(OccError::CoordinatorUnreachable {
                attempts: attempts_made,
            });
        }
        tokio::time::sleep(retry_interval).await;
    }
}
