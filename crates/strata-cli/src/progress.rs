use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use strata_core::pipeline::{JobStage, ProgressReporter};

/// Drives an indicatif bar from pipeline progress callbacks.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn begin_stage(&self, stage: JobStage, total_items: Option<usize>) {
        let bar = match total_items {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg} [{bar:40}] {pos}/{len}")
                        .expect("static template")
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                pb
            }
        };
        bar.set_message(stage.to_string());
        *self.bar.lock().expect("reporter mutex") = Some(bar);
    }

    fn advance(&self, items_done: usize) {
        if let Some(ref bar) = *self.bar.lock().expect("reporter mutex") {
            bar.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        if let Some(bar) = self.bar.lock().expect("reporter mutex").take() {
            bar.finish_and_clear();
        }
    }
}
