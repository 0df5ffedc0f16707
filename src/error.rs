//! Error taxonomy.
//!
//! Only one outcome in the coordinator's contract is actually exceptional
//! enough to be an `Err`: the transport giving up. Everything else named
//! in the design (`CoordinatorStopped`, `MalformedMessage`,
//! `SchedulerContractViolation`) is either a safe `Ok(false)` at the
//! facade or a log line inside the dispatcher — never a value a caller
//! has to match on, because a denial is always a safe outcome and an
//! unexpected message should never be load-bearing for correctness.

use thiserror::Error;

/// Failure modes surfaced to a `can_commit` caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OccError {
    /// The transport exhausted every retry without receiving a reply.
    /// Callers MUST treat this the same as an explicit denial and must
    /// not commit.
    #[error("coordinator unreachable after {attempts} attempt(s)")]
    CoordinatorUnreachable { attempts: u32 },
}

pub type OccResult<T> = Result<T, OccError>;
