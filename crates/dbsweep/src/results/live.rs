//! Live status line for the phase currently running.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Spinner shown while a benchmark phase runs.
///
/// Example output:
/// ```text
///   ⠋ run-1 (redis / 3 nodes / 50-50)  00:01:12
///   ✓ run-1  72.4 s
/// ```
pub struct PhaseSpinner {
    progress: ProgressBar,
    label: String,
    color: bool,
}

impl PhaseSpinner {
    /// Start a spinner. With `visible == false` nothing is drawn.
    pub fn start(label: &str, context: &str, visible: bool, color: bool) -> Self {
        let progress = if visible { ProgressBar::new_spinner() } else { ProgressBar::hidden() };

        let template = if color {
            "  {spinner:.cyan} {msg}  {elapsed_precise:.dim}"
        } else {
            "  {spinner} {msg}  {elapsed_precise}"
        };
        let style = ProgressStyle::default_spinner()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        progress.set_style(style);
        progress.set_message(format!("{label} ({context})"));
        if visible {
            progress.enable_steady_tick(Duration::from_millis(100));
        }

        Self { progress, label: label.to_string(), color }
    }

    /// Replace the spinner with a success line.
    pub fn finish_ok(self, elapsed: Duration) {
        let line = if self.color {
            format!("  {} {}  {:.1} s", "✓".green(), self.label, elapsed.as_secs_f64())
        } else {
            format!("  ok {}  {:.1} s", self.label, elapsed.as_secs_f64())
        };
        self.finish_with(line);
    }

    /// Replace the spinner with a failure line.
    pub fn finish_failed(self, message: &str) {
        let line = if self.color {
            format!("  {} {}  {}", "✗".red(), self.label, message.red())
        } else {
            format!("  FAILED {}  {}", self.label, message)
        };
        self.finish_with(line);
    }

    fn finish_with(self, line: String) {
        self.progress.finish_and_clear();
        if !self.progress.is_hidden() {
            eprintln!("{line}");
        }
    }
}
