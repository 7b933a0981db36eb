//! Terminal rendering of the engine's progress events.

use std::collections::HashMap;
use std::sync::Mutex;

use archivist_engine::{OutcomeKind, ProgressEvent, ProgressSink, TaskId};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// One bar per in-flight track plus an overall album bar at the bottom.
///
/// The engine emits events from many tasks at once, so the per-task bar map
/// sits behind a mutex; indicatif handles the terminal side itself.
pub struct TerminalProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
}

impl TerminalProgress {
    pub fn new(track_count: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(make_overall_bar(track_count as u64));
        Self {
            multi,
            overall,
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Close out the overall bar once the batch is done.
    pub fn finish(&self) {
        self.overall.finish_and_clear();
    }

    fn start_task(&self, task_id: TaskId, label: &str, total_bytes: Option<u64>) {
        let bar = self
            .multi
            .insert_before(&self.overall, make_track_bar(label, total_bytes));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(task_id, bar);
        }
    }

    fn advance_task(&self, task_id: TaskId, bytes: u64) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(bar) = bars.get(&task_id) {
                bar.inc(bytes);
            }
        }
    }

    fn finish_task(&self, task_id: TaskId, label: &str, outcome: OutcomeKind) {
        let bar = match self.bars.lock() {
            Ok(mut bars) => bars.remove(&task_id),
            Err(_) => None,
        };
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        let status = match outcome {
            OutcomeKind::Completed => "done",
            OutcomeKind::Skipped => "skipped (already saved)",
            OutcomeKind::Failed => "FAILED",
        };
        let _ = self.multi.println(format!("  {label} - {status}"));
    }
}

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::TaskStarted {
                task_id,
                label,
                total_bytes,
            } => self.start_task(task_id, &label, total_bytes),
            ProgressEvent::TaskAdvanced { task_id, bytes } => self.advance_task(task_id, bytes),
            ProgressEvent::TaskFinished {
                task_id,
                label,
                outcome,
            } => self.finish_task(task_id, &label, outcome),
            ProgressEvent::OverallAdvanced => self.overall.inc(1),
        }
    }
}

fn make_track_bar(label: &str, total_bytes: Option<u64>) -> ProgressBar {
    let bar = match total_bytes {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} - {msg}",
                )
                .expect("progress template is valid")
                .progress_chars("━━╌"),
            );
            bar
        }
        None => {
            // Server gave no Content-Length; show a running byte count.
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {bytes} - {msg}")
                    .expect("progress template is valid"),
            );
            bar
        }
    };
    bar.set_message(label.to_string());
    bar
}

fn make_overall_bar(track_count: u64) -> ProgressBar {
    let bar = ProgressBar::new(track_count);
    bar.set_style(
        ProgressStyle::with_template("Album [{bar:40.green/white}] {pos}/{len} tracks")
            .expect("progress template is valid")
            .progress_chars("━━╌"),
    );
    bar
}
