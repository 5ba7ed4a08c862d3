#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the Tombo tools.
//!
//! Provides an `indicatif` spinner behind the [`LoadProgress`] trait, plus
//! [`init_logger`] which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while the spinner redraws.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tombo_source::progress::LoadProgress;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`LoadProgress`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `begin()` provides the step count.
    bar_style: ProgressStyle,
    started: AtomicBool,
}

impl IndicatifProgress {
    /// Creates a spinner that turns into a step bar once
    /// [`LoadProgress::begin()`] is called.
    #[must_use]
    pub fn load_spinner(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "{spinner:.cyan} {msg} {wide_bar:.cyan/dim} {pos}/{len} [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self::from_bar(bar, bar_style)
    }

    const fn from_bar(bar: ProgressBar, bar_style: ProgressStyle) -> Self {
        Self {
            bar,
            bar_style,
            started: AtomicBool::new(false),
        }
    }

    /// Stops the spinner where it is, leaving the last step visible.
    pub fn abandon(&self, msg: String) {
        self.bar.abandon_with_message(msg);
    }
}

impl LoadProgress for IndicatifProgress {
    fn begin(&self, steps: u64) {
        self.bar.set_length(steps);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn step(&self, label: &str) {
        // Position counts completed steps.
        if self.started.swap(true, Ordering::Relaxed) {
            self.bar.inc(1);
        }
        self.bar.set_message(label.to_string());
    }

    fn finish(&self, msg: String) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.finish_with_message(msg);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Already set when called twice, e.g. in tests

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden() -> IndicatifProgress {
        IndicatifProgress::from_bar(ProgressBar::hidden(), ProgressStyle::default_bar())
    }

    #[test]
    fn steps_count_completed_work() {
        let progress = hidden();
        progress.begin(4);
        progress.step("Fetching reports");
        assert_eq!(progress.bar.position(), 0);
        progress.step("Fetching recent reports");
        progress.step("Counting comments");
        assert_eq!(progress.bar.position(), 2);
        progress.finish("done".to_string());
        assert_eq!(progress.bar.position(), 4);
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn abandon_keeps_position() {
        let progress = hidden();
        progress.begin(4);
        progress.step("Fetching reports");
        progress.step("Fetching recent reports");
        progress.abandon("failed".to_string());
        assert_eq!(progress.bar.position(), 1);
        assert!(progress.bar.is_finished());
    }
}
