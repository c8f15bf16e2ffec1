//! Progress reporting and cooperative cancellation for multi-day runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::error::{MapError, Result};

/// Receives integer progress (0–100) after each unit of work.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u8);
}

/// Discards progress updates.
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn report(&self, _percent: u8) {}
}

/// Logs progress through `tracing`.
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn report(&self, percent: u8) {
        info!(task = %self.label, percent, "Progress");
    }
}

impl<F: Fn(u8) + Send + Sync> ProgressReporter for F {
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Shared flag checked between iterations of a sequence.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with [`MapError::Cancelled`] once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MapError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Scales `done / total` into the `[from, to]` percentage band.
pub fn band(from: u8, to: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return to;
    }
    let span = usize::from(to.saturating_sub(from));
    from + (done.min(total) * span / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_band() {
        assert_eq!(band(5, 90, 0, 4), 5);
        assert_eq!(band(5, 90, 1, 4), 26);
        assert_eq!(band(5, 90, 4, 4), 90);
        assert_eq!(band(5, 90, 9, 4), 90);
        assert_eq!(band(10, 90, 0, 0), 90);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(MapError::Cancelled)));
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = |p: u8| seen.lock().unwrap().push(p);
        reporter.report(10);
        reporter.report(55);
        assert_eq!(*seen.lock().unwrap(), [10, 55]);
    }
}
