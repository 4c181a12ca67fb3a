//! Cooperative cancellation for export runs
//!
//! A [`CancelFlag`] is a cloneable handle around a shared atomic boolean.
//! The supervising caller sets it from any thread or task; the export worker
//! polls it at fixed checkpoints and inside every pause, which is split into
//! short slices so an abort is observed within roughly one slice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared cancellation signal
///
/// Clones observe the same flag. Only the canceller sets it, and only the
/// start of a new run clears it.
///
/// # Examples
///
/// ```
/// use deepseek_export::cancel::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let handle = flag.clone();
/// assert!(!flag.is_cancelled());
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a new, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag at the start of a new run
    pub(crate) fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Sleep for `total`, waking every `slice` to check for cancellation
    ///
    /// Returns `true` if cancellation was observed before the full delay
    /// elapsed. A zero `slice` is treated as one millisecond.
    pub async fn sleep(&self, total: Duration, slice: Duration) -> bool {
        let slice = slice.max(Duration::from_millis(1));
        let mut remaining = total;

        while !remaining.is_zero() {
            if self.is_cancelled() {
                return true;
            }
            let step = remaining.min(slice);
            tokio::time::sleep(step).await;
            remaining -= step;
        }

        self.is_cancelled()
    }
}
