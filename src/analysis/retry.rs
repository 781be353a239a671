use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use super::AnalysisError;

/// How long to wait after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * attempt`
    Linear,
    /// `min(base * 2^attempt, cap)`
    ExponentialCapped { cap: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::ExponentialCapped {
            cap: Duration::from_secs(10),
        }
    }
}

/// Bounded retry for calls to the analysis webhooks. No jitter, no circuit breaking.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::ExponentialCapped { cap } => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor).min(cap)
            }
        }
    }

    /// Runs `f` until it succeeds or `max_retries` attempts have failed; the last error wins.
    pub async fn retry_async<F, Fut, T, E>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max = self.max_retries.max(1);
        let mut attempt = 1u32;
        loop {
            match f(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) if attempt >= max => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, max, delay_ms = (delay.as_millis() as u64), error = %e, "attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Sends the request produced by `build` (rebuilt on every attempt) and returns the
    /// first response with a success status.
    pub async fn send<F>(&self, build: F) -> Result<Response, AnalysisError>
    where
        F: Fn() -> RequestBuilder,
    {
        self.retry_async(|attempt| {
            let req = build();
            async move {
                let res = req.send().await.map_err(|e| AnalysisError::Transport {
                    attempts: attempt,
                    source: e,
                })?;
                let status = res.status();
                if status.is_success() {
                    debug!(attempt, %status, "analysis call succeeded");
                    Ok(res)
                } else {
                    Err(AnalysisError::Status {
                        status: status.as_u16(),
                        attempts: attempt,
                    })
                }
            }
        })
        .await
    }
}
