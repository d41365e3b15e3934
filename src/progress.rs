//! Progress UI (spinner) for download runs.

use std::sync::Arc;
use std::time::Duration;

use chunkload_core::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};

/// Creates the spinner when requested; `None` leaves progress lines unshown.
pub(crate) fn spawn_spinner(use_spinner: bool) -> Option<ProgressBar> {
    if !use_spinner {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Routes the engine's progress lines into the spinner message.
pub(crate) fn spinner_sink(spinner: &ProgressBar) -> ProgressSink {
    let spinner = spinner.clone();
    Arc::new(move |line: &str| spinner.set_message(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_spinner_when_disabled_returns_none() {
        assert!(spawn_spinner(false).is_none());
    }

    #[test]
    fn spinner_sink_sets_message() {
        let spinner = ProgressBar::hidden();
        let sink = spinner_sink(&spinner);
        sink("Downloading part 7");
        assert_eq!(spinner.message(), "Downloading part 7");
    }
}
