//! Cancellation flag owned by one refresh cycle.

use crate::error::RefreshError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared cancellation flag of a single refresh cycle.
///
/// Cheap to clone. Once cancelled it stays cancelled.
#[derive(Clone, Default)]
pub struct CycleToken {
    inner: Arc<CycleTokenInner>,
}

#[derive(Default)]
struct CycleTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CycleToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the cycle has been abandoned.
    pub fn check(&self) -> Result<(), RefreshError> {
        if self.is_cancelled() {
            Err(RefreshError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the token is cancelled.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
