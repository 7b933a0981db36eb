use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadOutcome;
use crate::track::TrackRef;

pub type TaskId = u64;

/// Why a single track's job failed. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("invalid url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("request for {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("request for {url} timed out")]
    Timeout { url: String },
    #[error("{url} returned http status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("response from {url} exceeds {max_bytes} bytes")]
    TooLarge { url: String, max_bytes: u64 },
    #[error("could not decode page at {url}: {message}")]
    Decode { url: String, message: String },
    #[error("no audio source on track page {url}")]
    MissingAudioSource { url: String },
    #[error("write to {} failed: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("download job panicked")]
    JobPanicked,
}

/// Errors that abort the whole batch before any job runs.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("album directory {}: {message}", path.display())]
    AlbumDir { path: PathBuf, message: String },
    #[error("could not build http client: {message}")]
    HttpClient { message: String },
}

/// Terminal state of a settled job, without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Completed => write!(f, "completed"),
            OutcomeKind::Skipped => write!(f, "skipped"),
            OutcomeKind::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The download response headers are in; the body transfer starts now.
    /// `total_bytes` is absent when the server did not send a length.
    TaskStarted {
        task_id: TaskId,
        label: String,
        total_bytes: Option<u64>,
    },
    /// One chunk hit the disk.
    TaskAdvanced { task_id: TaskId, bytes: u64 },
    /// The job settled. Emitted exactly once per track, in settle order.
    TaskFinished {
        task_id: TaskId,
        label: String,
        outcome: OutcomeKind,
    },
    /// The batch-wide finished counter moved by one.
    OverallAdvanced,
}

/// Receives progress events from running jobs. Implementations must be
/// cheap and non-blocking; the engine calls them from worker tasks.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event. The engine behaves identically with it.
#[derive(Debug, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}

#[derive(Debug)]
pub struct TrackFailure {
    pub track: TrackRef,
    pub error: TrackError,
}

/// Aggregate result of one batch. Every submitted track is counted exactly
/// once: as completed, skipped or failed.
#[derive(Debug)]
pub struct BatchSummary {
    items_total: usize,
    completed: usize,
    skipped: usize,
    bytes_written: u64,
    failures: Vec<TrackFailure>,
}

impl BatchSummary {
    pub(crate) fn new(items_total: usize) -> Self {
        Self {
            items_total,
            completed: 0,
            skipped: 0,
            bytes_written: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, track: TrackRef, result: Result<DownloadOutcome, TrackError>) {
        match result {
            Ok(DownloadOutcome::Completed { bytes_written }) => {
                self.completed += 1;
                self.bytes_written += bytes_written;
            }
            Ok(DownloadOutcome::Skipped) => self.skipped += 1,
            Err(error) => self.failures.push(TrackFailure { track, error }),
        }
    }

    pub fn items_total(&self) -> usize {
        self.items_total
    }

    /// How many jobs have settled, regardless of outcome.
    pub fn items_finished(&self) -> usize {
        self.completed + self.skipped + self.failures.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Failures in the order the jobs settled.
    pub fn failures(&self) -> &[TrackFailure] {
        &self.failures
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}
