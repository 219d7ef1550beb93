//! Retry classification and backoff schedule for API requests.
//!
//! # Design
//! The policy only decides; the executor owns the loop. After every attempt
//! the executor asks [`RetryPolicy::check`] whether to go again and, if so,
//! waits [`RetryPolicy::backoff`] through the call's context.
//!
//! Classification, in order: a done context stops immediately with its
//! error; a transport error is retried; 429, 502 and 504 are retried;
//! everything else is final.

use std::time::Duration;

use crate::context::{Context, ContextError};
use crate::error::TransportError;
use crate::http::HttpResponse;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);

const RETRYABLE_STATUSES: [u16; 3] = [429, 502, 504];

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Decide whether the outcome of an attempt warrants another one.
    ///
    /// Returns the context error if the call has been cancelled, whatever the
    /// outcome was. The attempt cap is applied by the caller.
    pub fn check(
        &self,
        ctx: &Context,
        outcome: &Result<HttpResponse, TransportError>,
    ) -> Result<bool, ContextError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        Ok(match outcome {
            Err(_) => true,
            Ok(response) => is_retryable_status(response.status),
        })
    }

    /// Wait before attempt `attempt + 1`, where `attempt` is zero-based.
    ///
    /// A 429 carrying a `Retry-After` in seconds overrides the exponential
    /// schedule. Either way the result stays within `[min_wait, max_wait]`.
    pub fn backoff(&self, attempt: u32, response: Option<&HttpResponse>) -> Duration {
        if let Some(wait) = response.and_then(retry_after) {
            return wait.clamp(self.min_wait, self.max_wait.max(self.min_wait));
        }
        let factor = 2u32.saturating_pow(attempt);
        self.min_wait
            .saturating_mul(factor)
            .clamp(self.min_wait, self.max_wait.max(self.min_wait))
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

fn retry_after(response: &HttpResponse) -> Option<Duration> {
    if response.status != 429 {
        return None;
    }
    response
        .header("retry-after")?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
