use crate::explain::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for the explanation pipeline, drawn on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  {spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("━━╸"),
            );
            bar.set_message("explaining");
            bar
        };
        Self { bar }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn advance(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_position() {
        let progress = BarProgress::new(true);
        progress.start(3);
        progress.advance();
        progress.advance();
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(3));
        progress.finish();
    }
}
