//! Progress indicators for long-running steps.
//!
//! Wraps `indicatif` with the two shapes the pipeline needs: a spinner for
//! indeterminate work (downloads, installs) and a byte-sized bar for the
//! archive fetch. Indicators disable themselves in non-interactive
//! environments and when `ATRIUM_NO_PROGRESS` is set, so CI logs stay clean.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::time::Duration;

fn progress_enabled() -> bool {
    std::env::var_os("ATRIUM_NO_PROGRESS").is_none()
        && std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// A spinner with a message, ticking on a background thread.
#[must_use]
pub fn spinner(message: impl Into<String>) -> IndicatifBar {
    let bar = if progress_enabled() { IndicatifBar::new_spinner() } else { IndicatifBar::hidden() };
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// A byte-count progress bar for downloads of known size.
#[must_use]
pub fn download_bar(total_bytes: u64, message: impl Into<String>) -> IndicatifBar {
    let bar =
        if progress_enabled() { IndicatifBar::new(total_bytes) } else { IndicatifBar::hidden() };
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(message.into());
    bar
}
