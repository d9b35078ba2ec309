//! Console output control.

use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;

lazy_static! {
    static ref DEFAULT_PROGRESS_STYLE: ProgressStyle =
        ProgressStyle::with_template("Progress: {bar:40}  {percent}% | ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
}

/// How much non-critical status output to print.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Print nothing.
    #[default]
    Quiet,
    /// Print summaries and progress.
    Messages,
    /// Additionally print per-step tracing diagnostics.
    Diagnostics,
}

impl Verbosity {
    /// Whether summary messages should be printed.
    pub fn print_messages(&self) -> bool {
        *self >= Self::Messages
    }

    /// Whether detailed per-step diagnostics should be printed.
    pub fn print_diagnostics(&self) -> bool {
        *self >= Self::Diagnostics
    }

    /// Creates a progress bar for `length` work items, hidden unless
    /// messages are printed.
    pub fn create_progress_bar(&self, length: usize) -> ProgressBar {
        if self.print_messages() {
            ProgressBar::new(length as u64).with_style(DEFAULT_PROGRESS_STYLE.clone())
        } else {
            ProgressBar::hidden()
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn verbosity_levels_are_ordered() {
        assert!(!Verbosity::Quiet.print_messages());
        assert!(Verbosity::Messages.print_messages());
        assert!(!Verbosity::Messages.print_diagnostics());
        assert!(Verbosity::Diagnostics.print_messages());
        assert!(Verbosity::Diagnostics.print_diagnostics());
    }

    #[test]
    fn quiet_progress_bar_is_hidden() {
        assert!(Verbosity::Quiet.create_progress_bar(10).is_hidden());
    }
}
