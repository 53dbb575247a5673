//! Terminal progress bars for `run`.
//!
//! Bars draw on stderr. When stderr is not a terminal they stay hidden and
//! plain progress lines go to stdout instead.

use clipjoin::batch::BatchEvent;
use clipjoin::ingest::CopyProgress;
use clipjoin_common::format::format_file_size;
use indicatif::{ProgressBar, ProgressStyle};

const COPY_TEMPLATE: &str =
    "{prefix:.cyan} [{bar:40.cyan/blue}] {percent:>3}% {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta}) {msg}";
const JOIN_TEMPLATE: &str =
    "{prefix:.cyan} [{bar:40.cyan/blue}] {pos}/{len} group(s) ({elapsed}, ETA {eta}) {msg}";

fn styled_bar(len: u64, template: &str, prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix(prefix);
    bar
}

/// Byte progress of the staging copy.
pub struct CopyBar {
    bar: ProgressBar,
}

impl CopyBar {
    pub fn new(bytes_total: u64) -> Self {
        Self {
            bar: styled_bar(bytes_total, COPY_TEMPLATE, "Copying"),
        }
    }

    pub fn update(&self, progress: &CopyProgress<'_>) {
        if self.bar.is_hidden() {
            println!(
                "  [{}/{}] {} ({} / {})",
                progress.files_done,
                progress.files_total,
                progress.name,
                format_file_size(progress.bytes_done),
                format_file_size(progress.bytes_total)
            );
            return;
        }
        self.bar.set_length(progress.bytes_total);
        self.bar.set_position(progress.bytes_done);
        self.bar.set_message(progress.name.to_string());
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Group progress of the joins.
#[derive(Clone)]
pub struct JoinBar {
    bar: ProgressBar,
}

impl JoinBar {
    pub fn new(groups: usize) -> Self {
        Self {
            bar: styled_bar(groups as u64, JOIN_TEMPLATE, "Joining"),
        }
    }

    /// Restart the clock so ETA ignores time spent before the first join.
    pub fn start(&self) {
        self.bar.reset();
    }

    pub fn update(&self, event: &BatchEvent<'_>) {
        match event {
            BatchEvent::Started {
                index,
                total,
                group,
                destination,
            } => {
                if self.bar.is_hidden() {
                    println!(
                        "[{}/{}] Joining {} ({} fragment(s)) as {}",
                        index + 1,
                        total,
                        group.key(),
                        group.len(),
                        destination
                    );
                } else {
                    self.bar
                        .set_message(format!("{} ({} fragment(s))", group.key(), group.len()));
                }
            }
            BatchEvent::Finished { .. } => self.bar.inc(1),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
