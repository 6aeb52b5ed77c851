// src/progress.rs

//! Progress reporting for the extraction pass
//!
//! The extractor reports one unit per record through a [`ProgressTracker`]
//! and never knows how that is displayed. Implementations here:
//! - `SilentProgress`: no-op, for tests and `--quiet`
//! - `LogProgress`: logs position to tracing at roughly 10% intervals
//!
//! The CLI layer adds an indicatif-backed implementation on top of the
//! same trait.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Core interface for progress tracking
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Advance progress by the given number of units
    fn increment(&self, amount: u64);

    /// Current position
    fn position(&self) -> u64;

    /// Finish successfully with a message
    fn finish_with_message(&self, message: &str);
}

/// Silent progress tracker (no-op)
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {}
}

/// Logging progress tracker
///
/// Useful for non-interactive environments where a progress bar would
/// just garble the output.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: u64,
    /// Only log every N increments to avoid spam
    log_interval: u64,
}

impl LogProgress {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length,
            log_interval: std::cmp::max(1, length / 10), // Log ~10 times
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        let new_pos = old_pos + amount;

        if self.length > 0 && new_pos / self.log_interval > old_pos / self.log_interval {
            let percent = (new_pos * 100) / self.length;
            info!("{}: {}% ({}/{})", self.name, percent, new_pos, self.length);
        }
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_progress() {
        let progress = SilentProgress::new();

        progress.set_message("test");
        progress.increment(10);
        assert_eq!(progress.position(), 10);

        progress.increment(5);
        assert_eq!(progress.position(), 15);

        progress.finish_with_message("done");
    }

    #[test]
    fn test_log_progress() {
        let progress = LogProgress::new("extract", 100);

        progress.increment(25);
        assert_eq!(progress.position(), 25);

        progress.increment(25);
        assert_eq!(progress.position(), 50);

        progress.finish_with_message("complete");
    }
}
