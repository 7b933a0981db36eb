#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use archivist_engine::{ProgressEvent, ProgressSink};

/// Sink that records every event for later assertions. Clones share the
/// same buffer, so a test can hand one clone to the engine and keep one.
#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn overall_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ProgressEvent::OverallAdvanced))
            .count()
    }

    pub fn finished_labels(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::TaskFinished { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn init_logging() {
    engine_logging::initialize_for_tests();
}
