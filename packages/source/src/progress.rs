//! Progress reporting for the dashboard load.
//!
//! The loader reports each backend request as one step. Rendering is left
//! to the caller: the CLI draws a spinner, the server only logs.

/// Receives progress updates from [`crate::load_dashboard_data`].
pub trait LoadProgress: Send + Sync {
    /// Called once with the number of steps the load will take.
    fn begin(&self, steps: u64);

    /// Called as each step starts.
    fn step(&self, label: &str);

    /// Called once after the last step succeeded.
    fn finish(&self, msg: String);
}

/// Reports progress through `log::debug!`.
pub struct LogProgress;

impl LoadProgress for LogProgress {
    fn begin(&self, steps: u64) {
        log::debug!("Loading dashboard data in {steps} steps");
    }

    fn step(&self, label: &str) {
        log::debug!("{label}...");
    }

    fn finish(&self, msg: String) {
        log::debug!("{msg}");
    }
}
