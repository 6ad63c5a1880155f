//! Progress reporting

use tracing::{debug, warn};

/// Receives one tick per processed entity
pub trait Progress {
    fn tick(&mut self, success: bool, label: &str, error: Option<&str>);
}

/// Reports progress through the log
#[derive(Debug, Default)]
pub struct LogProgress {
    pub processed: usize,
    pub failed: usize,
}

impl Progress for LogProgress {
    fn tick(&mut self, success: bool, label: &str, error: Option<&str>) {
        self.processed += 1;
        if success {
            debug!("✅ {}", label);
        } else {
            self.failed += 1;
            warn!("❌ {}: {}", label, error.unwrap_or("issues found"));
        }
    }
}

/// Discards progress
#[derive(Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self, _success: bool, _label: &str, _error: Option<&str>) {}
}
