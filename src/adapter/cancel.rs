//! Cooperative cancellation for request lifecycles
//!
//! The consumer cancels a token when a newer fetch supersedes the one it
//! guards, or when the consumer itself shuts down. Work already committed
//! before the check is unaffected; cancellation only takes effect at the
//! next checkpoint.

use crate::error::{AdapterError, AdapterResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token.
///
/// Clones share state. The owning side calls [`cancel`](Self::cancel);
/// the guarded side checks between await points.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Checkpoint: fail with a `Network` cancellation error once cancelled.
    ///
    /// A superseded or abandoned request reports this to its own caller;
    /// it is never written into shared state.
    pub fn ensure_live(&self, what: &str) -> AdapterResult<()> {
        if self.is_cancelled() {
            Err(AdapterError::network(format!("{what} was cancelled")))
        } else {
            Ok(())
        }
    }
}
