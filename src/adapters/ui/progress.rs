//! Spinners for long-running steps (indicatif).

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Steady spinner with `message`. Call `finish_and_clear` when done.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
