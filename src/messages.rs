//! The wire protocol: the five message variants a driver and its tasks
//! exchange with the coordinator, plus the dispatcher-internal envelope
//! that pairs a message with its reply channel (when it has one).

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::types::{AttemptId, StageId, TaskEndReason, TaskId};

/// The serializable request/notification shapes carried by a transport.
/// Matched exhaustively by the dispatcher; an unrecognized tag at the
/// serde boundary is a deserialization error for the transport to handle,
/// not something this enum itself needs to represent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OccMessage {
    StageStarted { stage: StageId },
    StageEnded { stage: StageId },
    AskPermissionToCommit {
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
    },
    TaskCompleted {
        stage: StageId,
        task: TaskId,
        attempt: AttemptId,
        reason: TaskEndReason,
    },
    StopCoordinator,
}

/// A mailbox entry: the message plus the reply sender for request-kind
/// messages. Notifications carry `None` and the dispatcher does not try
/// to reply to them.
pub(crate) struct Envelope {
    pub message: OccMessage,
    pub reply: Option<oneshot::Sender<bool>>,
}

impl Envelope {
    pub(crate) fn notification(message: OccMessage) -> Self {
        Self {
            message,
            reply: None,
        }
    }

    pub(crate) fn request(message: OccMessage, reply: oneshot::Sender<bool>) -> Self {
        Self {
            message,
            reply: Some(reply),
        }
    }
}

/// Read-only diagnostics that never touch the wire protocol — they exist
/// purely for the embedding driver's own observability, not for any
/// scheduler/task contract, so they are modeled separately from
/// [`OccMessage`] rather than smuggled into the protocol enum.
pub(crate) enum Query {
    AuthorizedCommitter {
        stage: StageId,
        task: TaskId,
        reply: oneshot::Sender<Option<AttemptId>>,
    },
    LiveStageCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Everything the dispatcher's single mailbox can receive: a protocol
/// envelope or a diagnostic query. Both are served by the same
/// single-consumer loop so diagnostics never race a concurrent mutation.
pub(crate) enum MailboxItem {
    Envelope(Envelope),
    Query(Query),
}
