use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::{stream, StreamExt};

use crate::download::{DownloadOutcome, TrackDownloader};
use crate::filename;
use crate::persist;
use crate::resolve::StreamResolver;
use crate::track::TrackRef;
use crate::types::{
    BatchSummary, OutcomeKind, ProgressEvent, ProgressSink, SetupError, TaskId, TrackError,
};

pub const DEFAULT_WORKER_COUNT: usize = 4;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Upper bound on jobs in flight. Floored to 1.
    pub worker_count: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

/// Download every track into `album_dir` with bounded concurrency.
///
/// Jobs are isolated: one track's failure is recorded in the summary and
/// never stops its siblings. Jobs settle in whatever order the network
/// allows; this loop is the single consumer, so the finished counter and the
/// summary advance exactly once per track. The only fatal error is an
/// unusable album directory.
pub async fn run_batch(
    resolver: Arc<dyn StreamResolver>,
    downloader: Arc<dyn TrackDownloader>,
    tracks: Vec<TrackRef>,
    album_dir: &Path,
    options: &BatchOptions,
    sink: Arc<dyn ProgressSink>,
) -> Result<BatchSummary, SetupError> {
    persist::ensure_album_dir(album_dir).map_err(|err| SetupError::AlbumDir {
        path: album_dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let worker_count = options.worker_count.max(1);
    let mut summary = BatchSummary::new(tracks.len());
    engine_info!(
        "starting batch: {} tracks, {} workers, into {}",
        tracks.len(),
        worker_count,
        album_dir.display()
    );

    let album_dir = album_dir.to_path_buf();
    let mut settled = stream::iter(tracks.into_iter().enumerate().map(|(index, track)| {
        let task_id = index as TaskId + 1;
        let dest = filename::path_for(&album_dir, track.display_name());
        let resolver = Arc::clone(&resolver);
        let downloader = Arc::clone(&downloader);
        let job_sink = Arc::clone(&sink);
        let job_track = track.clone();
        async move {
            // Each job runs in its own task so a panic surfaces as a
            // JoinError for this track instead of tearing down the batch.
            let handle = tokio::spawn(async move {
                run_job(task_id, job_track, dest, resolver, downloader, job_sink).await
            });
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    engine_error!("job for {} panicked: {join_err}", track.display_name());
                    Err(TrackError::JobPanicked)
                }
            };
            (task_id, track, result)
        }
    }))
    .buffer_unordered(worker_count);

    while let Some((task_id, track, result)) = settled.next().await {
        if let Err(err) = &result {
            engine_warn!("{} failed: {err}", track.display_name());
        }
        sink.emit(ProgressEvent::TaskFinished {
            task_id,
            label: track.display_name().to_string(),
            outcome: outcome_kind(&result),
        });
        sink.emit(ProgressEvent::OverallAdvanced);
        summary.record(track, result);
    }

    engine_info!(
        "batch done: {} completed, {} skipped, {} failed, {} bytes",
        summary.completed(),
        summary.skipped(),
        summary.failed(),
        summary.bytes_written()
    );
    Ok(summary)
}

async fn run_job(
    task_id: TaskId,
    track: TrackRef,
    dest: PathBuf,
    resolver: Arc<dyn StreamResolver>,
    downloader: Arc<dyn TrackDownloader>,
    sink: Arc<dyn ProgressSink>,
) -> Result<DownloadOutcome, TrackError> {
    // Existing files skip before any network traffic; the downloader keeps
    // its own check for callers that reach it directly.
    if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
        engine_debug!("{} already saved, skipping", track.display_name());
        return Ok(DownloadOutcome::Skipped);
    }
    let link = resolver.resolve(track.source_url()).await?;
    downloader
        .download(
            task_id,
            track.display_name(),
            &link.stream_url,
            &dest,
            sink.as_ref(),
        )
        .await
}

fn outcome_kind(result: &Result<DownloadOutcome, TrackError>) -> OutcomeKind {
    match result {
        Ok(DownloadOutcome::Completed { .. }) => OutcomeKind::Completed,
        Ok(DownloadOutcome::Skipped) => OutcomeKind::Skipped,
        Err(_) => OutcomeKind::Failed,
    }
}
