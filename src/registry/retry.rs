// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded exponential backoff for transient registry failures

use crate::constants::retry::{MAX_RETRIES, MAX_WAIT_MILLIS, MIN_WAIT_MILLIS};
use oci_distribution::errors::OciDistributionError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: MAX_RETRIES,
            min_wait: Duration::from_millis(MIN_WAIT_MILLIS),
            max_wait: Duration::from_millis(MAX_WAIT_MILLIS),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt` (0 based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.min_wait.saturating_mul(factor).min(self.max_wait)
    }

    /// Run `op` until it succeeds, fails permanently or the retry budget is spent.
    pub async fn run<T, E, F, Fut>(
        &self,
        what: &str,
        is_transient: fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "Transient error during {}: {}, retrying in {:?} ({}/{})",
                        what,
                        e,
                        wait,
                        attempt + 1,
                        self.max_retries
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Connection failures, throttling and server-side errors are worth retrying
pub fn is_transient(error: &OciDistributionError) -> bool {
    match error {
        OciDistributionError::RequestError(_) => true,
        OciDistributionError::ServerError { code, .. } => *code == 429 || *code >= 500,
        _ => false,
    }
}
