//! Configuration consumed from the hosting driver: the three parameters
//! that govern how `can_commit` retries over the transport. The
//! coordinator itself reads no environment variables and exposes no CLI —
//! a hosting binary is responsible for sourcing this struct (e.g. from its
//! own config file) and handing it to the coordinator at construction
//! time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry/timeout policy for `can_commit`'s `AskPermissionToCommit` RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccConfig {
    /// Upper bound on how long a single send attempt may take before it
    /// counts as failed and the next retry (if any) is scheduled.
    #[serde(with = "duration_millis")]
    pub ask_timeout: Duration,
    /// How many times `can_commit` will try to reach the coordinator
    /// before giving up with [`crate::error::OccError::CoordinatorUnreachable`].
    /// Must be at least 1.
    pub max_send_attempts: u32,
    /// Delay between successive send attempts.
    #[serde(with = "duration_millis")]
    pub retry_interval: Duration,
}

impl Default for OccConfig {
    fn default() -> Self {
        Self {
            ask_timeout: Duration::from_secs(10),
            max_send_attempts: 3,
            retry_interval: Duration::from_millis(500),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
