//! Progress reporting: the orchestrator narrates phase and per-node progress
//! through this trait (spec §6) rather than printing directly, so a caller
//! embedding this crate can route it to its own UI.

use crate::error::AppError;
use crate::orchestrator::ExtractStats;

pub trait ProgressReporter: Send + Sync {
    fn on_start(&self, total: usize);
    fn on_progress(&self, current: usize, label: &str);
    fn on_warning(&self, msg: &str);
    fn on_error(&self, err: &AppError);
    fn on_complete(&self, stats: &ExtractStats);
}

/// Discards everything. Accepted wherever a reporter is required (spec §6).
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    fn on_start(&self, _total: usize) {}
    fn on_progress(&self, _current: usize, _label: &str) {}
    fn on_warning(&self, _msg: &str) {}
    fn on_error(&self, _err: &AppError) {}
    fn on_complete(&self, _stats: &ExtractStats) {}
}

/// Routes everything through the `log` facade, at the verbosity level a
/// reader of the console/file output would expect.
pub struct LoggingProgress;

impl ProgressReporter for LoggingProgress {
    fn on_start(&self, total: usize) {
        log::info!("extraction started: {} items discovered", total);
    }

    fn on_progress(&self, current: usize, label: &str) {
        log::debug!("[{}] {}", current, label);
    }

    fn on_warning(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn on_error(&self, err: &AppError) {
        log::error!("{}", err);
    }

    fn on_complete(&self, stats: &ExtractStats) {
        log::info!(
            "extraction finished: {} pages, {} databases, {} records, {} assets, {} errors in {:.2}s",
            stats.pages,
            stats.databases,
            stats.records,
            stats.assets,
            stats.errors,
            stats.duration_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_progress_never_panics() {
        let progress = NoOpProgress;
        progress.on_start(3);
        progress.on_progress(1, "Untitled");
        progress.on_warning("msg");
        progress.on_error(&AppError::Cancelled);
        progress.on_complete(&ExtractStats::default());
    }
}
