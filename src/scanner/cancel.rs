//! Supersession of in-flight analyses
//!
//! Starting a new analysis cancels the token of the one before it. The
//! scanner checks its token once the engine answers; a cancelled attempt's
//! result is dropped instead of being saved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A cooperative cancellation token.
///
/// Cancellation cannot interrupt an engine call already running; it only
/// marks the attempt so its result is discarded.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether both handles refer to the same attempt
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the token of the newest analysis attempt
#[derive(Debug, Default)]
pub(crate) struct AttemptSlot {
    current: Mutex<Option<CancellationToken>>,
}

impl AttemptSlot {
    /// Start a new attempt, cancelling whichever one was in flight
    pub(crate) fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Mark `token`'s attempt as done, if it is still the newest
    pub(crate) fn finish(&self, token: &CancellationToken) {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if current.as_ref().is_some_and(|t| t.same_as(token)) {
            *current = None;
        }
    }

    /// Cancel the in-flight attempt, if any
    pub(crate) fn cancel(&self) -> bool {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match current.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
