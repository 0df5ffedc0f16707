//! Coverage for configuration behavior that only makes sense exercised
//! end-to-end: a tighter retry budget actually bounds wall-clock time.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tasker_occ::{ask_with_retry, AskTransport, AttemptId, OccError, StageId, TaskId};

struct AlwaysSilent;

#[async_trait]
impl AskTransport for AlwaysSilent {
    async fn ask(&self, _stage: StageId, _task: TaskId, _attempt: AttemptId) -> Option<bool> {
        None
    }
}

#[tokio::test]
async fn retry_budget_bounds_total_wait_time() {
    let started = Instant::now();
    let result = ask_with_retry(
        &AlwaysSilent,
        1,
        1,
        1,
        Duration::from_millis(10),
        4,
        Duration::from_millis(10),
    )
    .await;

    assert_eq!(result, Err(OccError::CoordinatorUnreachable { attempts: 4 }));
    // 4 timeouts at 10ms plus 3 retry delays at 10ms: comfortably under a
    // second even accounting for scheduler jitter, well over the minimum.
    assert!(started.elapsed() < Duration::from_secs(1));
}
