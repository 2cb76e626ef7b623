//! Progress bars for the passes over sequence files, built on the `indicatif` crate.

use indicatif::{ProgressBar, ProgressStyle};

const COUNT_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {percent}% [{human_pos}/{human_len} {prefix}] [Remaining: {eta}]";

const FILE_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:20.cyan/blue} {percent}% [{human_pos}/{human_len} files] [{msg}]";

/// Progress bar over `len` items, labelled with their `unit` (e.g. "records").
pub fn progress_bar(len: u64, unit: &'static str) -> ProgressBar {
    let progress_bar = ProgressBar::new(len).with_prefix(unit);
    progress_bar.set_style(ProgressStyle::with_template(COUNT_TEMPLATE).expect("Invalid progress style."));

    progress_bar
}

/// Progress bar over input files, showing the file currently being read.
pub fn file_progress_bar(num_files: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(num_files);
    progress_bar.set_style(ProgressStyle::with_template(FILE_TEMPLATE).expect("Invalid progress style."));

    progress_bar
}
