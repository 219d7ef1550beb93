//! Cancellation and deadlines for blocking API calls.
//!
//! # Design
//! A `Context` is a cheap, cloneable handle shared between the caller and the
//! executor. Cancelling any clone cancels them all. The executor checks the
//! context before every attempt and waits out its backoff through
//! [`Context::sleep`], which wakes as soon as the context is cancelled or its
//! deadline passes, so a cancelled call never starts another attempt.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// A cancellation handle with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A child sharing this context's cancellation, with a deadline no later
    /// than `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            inner: Arc::clone(&self.inner),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every clone of it. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    /// `Some` once the context is cancelled or past its deadline.
    pub fn err(&self) -> Option<ContextError> {
        let cancelled = *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if cancelled {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Block for `duration`, returning early with an error if the context is
    /// cancelled or reaches its deadline first.
    pub fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        let wake_at = Instant::now() + duration;
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            if *cancelled {
                return Err(ContextError::Cancelled);
            }
            let now = Instant::now();
            if let Some(deadline) = self.deadline {
                if now >= deadline {
                    return Err(ContextError::DeadlineExceeded);
                }
            }
            if now >= wake_at {
                return Ok(());
            }
            let until = match self.deadline {
                Some(deadline) if deadline < wake_at => deadline,
                _ => wake_at,
            };
            cancelled = self
                .inner
                .wake
                .wait_timeout(cancelled, until - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }
}
