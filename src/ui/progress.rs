use crate::ui::output::package_action;
use crate::ui::progress_message::{PackageAction, ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Renders sync progress from a channel on its own thread
pub struct ProgressManager {
    bar: ProgressBar,
    handle: thread::JoinHandle<()>,
}

impl ProgressManager {
    /// `verbose` also prints one line per package that was not left unchanged
    pub fn new(verbose: bool) -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let bar = if console::Term::stdout().is_term() {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::with_template("{prefix:>10} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started { phase, total } => {
                        bar_clone.reset();
                        bar_clone.set_length(total as u64);
                        bar_clone.set_prefix(phase_label(phase));
                    }
                    ProgressMessage::Progress {
                        current,
                        package,
                        action,
                        ..
                    } => {
                        bar_clone.set_position(current as u64);
                        bar_clone.set_message(package.clone());
                        if verbose && action != PackageAction::Unchanged {
                            bar_clone.suspend(|| package_action(&package, action));
                        }
                    }
                    ProgressMessage::Finished { .. } => {
                        bar_clone.set_message("");
                    }
                }
            }
        });

        (Self { bar, handle }, tx)
    }

    /// Wait for the sender side to close, then clear the bar.
    pub fn finish(self) {
        if self.handle.join().is_err() {
            tracing::warn!("progress thread panicked");
        }
        self.bar.finish_and_clear();
    }

    pub fn finish_with_summary(self, duration: Duration, refreshed: usize, functions: usize) {
        self.finish();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Synced in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}",
            Icons::PACKAGE.style(theme().info.clone()),
            refreshed,
            Icons::FUNCTION.style(theme().info.clone()),
            functions
        );
    }
}

fn phase_label(phase: ProgressPhase) -> &'static str {
    match phase {
        ProgressPhase::Refreshing => "Syncing",
        ProgressPhase::Deleting => "Deleting",
    }
}
