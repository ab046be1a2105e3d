use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::sleep;

/// Retry budget for claim reservations that hit a busy or locked database.
///
/// The wait before the n-th retry is `n * pause` plus up to half a pause of
/// random jitter, so contending claims drift apart instead of waking in step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub pause: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, pause: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pause,
        }
    }

    fn pause_before(&self, retry: u32) -> Duration {
        let half_ms = (self.pause.as_millis() / 2) as u64;
        let jitter = if half_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=half_ms)
        };
        self.pause.saturating_mul(retry) + Duration::from_millis(jitter)
    }

    /// Calls `op` until it succeeds, fails with an error `retryable` rejects,
    /// or `max_attempts` calls have been made. Returns the last error as is.
    pub async fn run<T, E, F, Fut, R>(&self, mut op: F, retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let mut calls = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if calls >= self.max_attempts || !retryable(&err) {
                return Err(err);
            }
            sleep(self.pause_before(calls as u32)).await;
            calls += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(25))
    }
}
