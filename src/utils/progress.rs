//! Progress indicators for long-running operations.
//!
//! Thin wrapper over `indicatif` with consistent styling. All indicators are
//! hidden when `GREATER_NO_PROGRESS` is set or after [`disable_progress`] (what
//! `--no-progress` calls), which keeps CI logs and test output clean.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV;

static PROGRESS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Hide every indicator created from now on.
pub fn disable_progress() {
    PROGRESS_DISABLED.store(true, Ordering::Relaxed);
}

fn is_progress_disabled() -> bool {
    PROGRESS_DISABLED.load(Ordering::Relaxed) || std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress bar or spinner that may be hidden.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a progress bar tracking `len` units of work.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a spinner for work of unknown length.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Sets the message displayed next to the indicator.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advances the bar by `delta` units.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Completes the indicator, leaving `msg` on screen.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Completes the indicator and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the indicator is suppressed.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// Start a spinner with an initial message.
pub fn spinner_with_message(msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(msg);
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_progress_hidden_when_disabled() {
        // SAFETY: serialized with every other env-mutating test
        unsafe { std::env::set_var(NO_PROGRESS_ENV, "1") };
        let bar = ProgressBar::new(10);
        let spinner = spinner_with_message("working");
        assert!(bar.is_hidden());
        assert!(spinner.is_hidden());
        bar.inc(5);
        bar.finish_and_clear();
        spinner.finish_with_message("done");
        unsafe { std::env::remove_var(NO_PROGRESS_ENV) };
    }
}
