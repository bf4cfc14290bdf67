use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner} [{bar:40}] {pos}/{len} {wide_msg}";

/// Receives one human-readable line per completed sync action.
pub(crate) trait Progress {
    fn report(&self, line: &str);
}

impl Progress for ProgressBar {
    fn report(&self, line: &str) {
        self.println(line);
        self.inc(1);
    }
}

pub(crate) fn bar(actions: u64) -> ProgressBar {
    let style = ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(actions).with_style(style)
}
