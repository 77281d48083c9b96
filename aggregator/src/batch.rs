//! Adaptive batching with backoff.
//!
//! Inputs are processed in consecutive windows. A window that fails is
//! retried from the same offset with a smaller size and a longer pause, the
//! same way a congestion window backs off. The shrunk window then carries
//! over to the remaining input.

use futures::future::join_all;
use log::{debug, error, warn};
use providers::RpcError;
use serde::Deserialize;
use std::{future::Future, time::Duration};
use thiserror::Error;
use tokio::time::{sleep, timeout};

const EARLY_ATTEMPTS: u32 = 2;
const EARLY_SHRINK: f64 = 0.75;
const EARLY_FLOOR: usize = 15;
const LATE_SHRINK: f64 = 0.6;
const LATE_FLOOR: usize = 10;
const DELAY_GROWTH: f64 = 1.8;

pub const RATE_LIMIT_MESSAGE: &str =
    "The RPC provider is rate limiting requests, please try again in a few minutes";
pub const TIMEOUT_MESSAGE: &str = "The RPC provider did not answer in time, please try again";
pub const UNKNOWN_MESSAGE: &str = "Unknown error while querying balances";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchConfig {
    pub batch_size: usize,
    pub delay_ms: u64,
    pub max_retries: u32,
    pub call_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            delay_ms: 30,
            max_retries: 10,
            call_timeout_ms: 30_000,
        }
    }
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    /// A window kept failing until the retry budget ran out. Results of
    /// earlier windows are dropped; `completed` says how many there were.
    #[error("{message}")]
    Exhausted {
        offset: usize,
        attempts: u32,
        completed: usize,
        code: Option<i64>,
        message: String,
        #[source]
        source: RpcError,
    },
    #[error("Batch at offset {offset} produced {got} results for {expected} inputs")]
    Misaligned {
        offset: usize,
        expected: usize,
        got: usize,
    },
}

/// Picks what to tell the user once retries run out.
fn user_message(failure: &RpcError) -> &'static str {
    if failure.is_rate_limited() {
        RATE_LIMIT_MESSAGE
    } else if matches!(failure, RpcError::Timeout(_))
        || failure.to_string().to_ascii_lowercase().contains("timed out")
    {
        TIMEOUT_MESSAGE
    } else {
        UNKNOWN_MESSAGE
    }
}

/// The adaptive pair of batch size and inter-batch delay.
#[derive(Debug, Clone, Copy)]
struct Window {
    size: usize,
    delay: Duration,
}

impl Window {
    fn shrink(&mut self, attempts: u32) {
        let (factor, floor) = if attempts <= EARLY_ATTEMPTS {
            (EARLY_SHRINK, EARLY_FLOOR)
        } else {
            (LATE_SHRINK, LATE_FLOOR)
        };

        let shrunk = (self.size as f64 * factor).floor() as usize;
        self.size = shrunk.max(floor).min(self.size);
        self.delay = self.delay.mul_f64(DELAY_GROWTH);
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Runs `op` on every item, all items of a window concurrently.
    ///
    /// Results come back in input order. Any failing item fails its whole
    /// window, which is then retried.
    pub async fn run<'a, T, R, E, F, Fut>(&self, items: &'a [T], op: F) -> Result<Vec<R>, BatchError>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Into<RpcError>,
    {
        let op = &op;

        self.run_batches(items, move |batch: &'a [T]| async move {
            join_all(batch.iter().map(op))
                .await
                .into_iter()
                .collect::<Result<Vec<R>, E>>()
        })
        .await
    }

    /// Runs `op` on consecutive windows of `items`, for operations that
    /// natively take a whole batch such as a multicall read.
    ///
    /// `op` must return exactly one result per input of its window.
    pub async fn run_batches<'a, T, R, E, F, Fut>(
        &self,
        items: &'a [T],
        op: F,
    ) -> Result<Vec<R>, BatchError>
    where
        F: Fn(&'a [T]) -> Fut,
        Fut: Future<Output = Result<Vec<R>, E>>,
        E: Into<RpcError>,
    {
        let max_retries = self.config.max_retries.max(1);
        let call_timeout = self.config.call_timeout();

        let mut results = Vec::with_capacity(items.len());
        let mut window = Window {
            size: self.config.batch_size.max(1),
            delay: self.config.delay(),
        };
        let mut offset = 0;

        while offset < items.len() {
            let mut attempts = 0;

            loop {
                let end = (offset + window.size).min(items.len());
                let batch = &items[offset..end];

                debug!("Batch {offset}..{end} of {} (attempt {})", items.len(), attempts + 1);

                let outcome = match timeout(call_timeout, op(batch)).await {
                    Ok(Ok(values)) => Ok(values),
                    Ok(Err(e)) => Err(e.into()),
                    Err(_) => Err(RpcError::Timeout(call_timeout)),
                };

                match outcome {
                    Ok(values) => {
                        if values.len() != batch.len() {
                            return Err(BatchError::Misaligned {
                                offset,
                                expected: batch.len(),
                                got: values.len(),
                            });
                        }

                        results.extend(values);
                        offset = end;
                        break;
                    }
                    Err(failure) => {
                        attempts += 1;

                        warn!(
                            "Batch {offset}..{end} failed (attempt {attempts}/{max_retries}, code {:?}): {failure}",
                            failure.code()
                        );

                        if attempts >= max_retries {
                            error!("Giving up on batch {offset}..{end} after {attempts} attempts");

                            return Err(BatchError::Exhausted {
                                offset,
                                attempts,
                                completed: results.len(),
                                code: failure.code(),
                                message: user_message(&failure).to_string(),
                                source: failure,
                            });
                        }

                        window.shrink(attempts);
                        sleep(window.delay).await;
                    }
                }
            }

            if offset < items.len() {
                sleep(window.delay).await;
            }
        }

        Ok(results)
    }
}
