use async_trait::async_trait;
use common::ExecutionResult;
use log::debug;
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Anything that can report the current status of an execution.
#[async_trait]
pub trait ExecutionStatusSource: Send + Sync {
    async fn execution_status(&self, execution_id: u64) -> Result<ExecutionResult, ClientError>;
}

/// Polls an execution until it succeeds or fails, giving up after a fixed
/// number of attempts. The pause before attempt `i + 1` is `i * backoff_step`.
#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    attempts: u32,
    backoff_step: Duration,
}

impl StatusPoller {
    pub fn new(attempts: u32) -> Self {
        Self { attempts, backoff_step: DEFAULT_BACKOFF_STEP }
    }

    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    pub async fn poll<S>(&self, source: &S, execution_id: u64) -> Result<ExecutionResult, ClientError>
    where
        S: ExecutionStatusSource + ?Sized,
    {
        for attempt in 0..self.attempts {
            let result = source.execution_status(execution_id).await?;
            if result.is_terminal() {
                debug!("Execution {} reached {} after {} attempt(s)", execution_id, result.status, attempt + 1);
                return Ok(result);
            }

            if attempt + 1 == self.attempts {
                break;
            }

            debug!("Execution {} is {:?}, polling again", execution_id, result.status);
            tokio::time::sleep(self.backoff_step * attempt).await;
        }

        Err(ClientError::Exhausted { execution_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<ExecutionResult, ClientError>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<ExecutionResult, ClientError>>) -> Self {
            Self { responses: Mutex::new(responses.into()), calls: AtomicU32::new(0) }
        }

        fn with_statuses(statuses: &[&str]) -> Self {
            Self::new(statuses.iter().map(|s| Ok(status(s))).collect())
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExecutionStatusSource for ScriptedSource {
        async fn execution_status(&self, execution_id: u64) -> Result<ExecutionResult, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| panic!("unexpected extra status call for {execution_id}"))
        }
    }

    fn status(s: &str) -> ExecutionResult {
        ExecutionResult { execution_id: 42, status: s.to_string(), ..Default::default() }
    }

    fn poller(attempts: u32) -> StatusPoller {
        StatusPoller::new(attempts).with_backoff_step(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn exhausts_after_exactly_n_calls() {
        let source = ScriptedSource::with_statuses(&["waiting", "waiting", "waiting"]);
        let err = poller(3).poll(&source, 42).await.unwrap_err();
        assert!(matches!(err, ClientError::Exhausted { execution_id: 42 }));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn stops_at_first_terminal_status() {
        let source = ScriptedSource::with_statuses(&["waiting", "succeeded", "failed"]);
        let result = poller(5).poll(&source, 42).await.unwrap();
        assert!(result.succeeded());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_is_terminal_too() {
        let source = ScriptedSource::with_statuses(&["RUNNING", "FAILED"]);
        let result = poller(5).poll(&source, 42).await.unwrap();
        assert!(result.failed());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn error_on_second_call_is_returned_immediately() {
        let source = ScriptedSource::new(vec![
            Ok(status("waiting")),
            Err(ClientError::Network { timeout: true, message: "timed out".into() }),
            Ok(status("succeeded")),
        ]);
        let err = poller(5).poll(&source, 42).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn zero_budget_never_calls_the_daemon() {
        let source = ScriptedSource::with_statuses(&[]);
        let err = poller(0).poll(&source, 42).await.unwrap_err();
        assert!(matches!(err, ClientError::Exhausted { .. }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn backoff_grows_linearly_with_attempt() {
        let source = ScriptedSource::with_statuses(&["waiting", "waiting", "waiting", "succeeded"]);
        let started = std::time::Instant::now();
        StatusPoller::new(4)
            .with_backoff_step(Duration::from_millis(20))
            .poll(&source, 42)
            .await
            .unwrap();
        // 0 + 20 + 40 ms of sleeping before the fourth call
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
