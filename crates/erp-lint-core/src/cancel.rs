//! Cooperative cancellation shared by model building and rule execution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raised when a cancellation request has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("analysis was cancelled")]
pub struct Cancelled;

/// Shared cancellation flag.
///
/// Cloning the token shares the underlying flag, so a caller can keep one
/// handle to request cancellation while workers poll another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Polls the token.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if cancellation has been requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
