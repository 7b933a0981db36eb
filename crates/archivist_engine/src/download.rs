use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::fetch::{default_user_agent, request_error};
use crate::types::{ProgressEvent, ProgressSink, SetupError, TaskId, TrackError};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub connect_timeout: Duration,
    pub redirect_limit: usize,
    pub user_agent: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        // No whole-request timeout here: a large track on a slow link may
        // legitimately take minutes.
        Self {
            connect_timeout: Duration::from_secs(10),
            redirect_limit: 5,
            user_agent: default_user_agent(),
        }
    }
}

/// How a job ended without failing. Failure is the `Err` arm of `download`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { bytes_written: u64 },
    /// The destination already existed; nothing was fetched or written.
    Skipped,
}

/// Streams one resolved track to disk.
#[async_trait]
pub trait TrackDownloader: Send + Sync {
    async fn download(
        &self,
        task_id: TaskId,
        label: &str,
        stream_url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, TrackError>;
}

/// Downloader that GETs the stream URL and writes `dest` through a `.part`
/// file, renamed into place only after the full body arrived.
pub struct HttpTrackDownloader {
    client: reqwest::Client,
}

impl HttpTrackDownloader {
    pub fn new(settings: &DownloadSettings) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|err| SetupError::HttpClient {
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TrackDownloader for HttpTrackDownloader {
    async fn download(
        &self,
        task_id: TaskId,
        label: &str,
        stream_url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, TrackError> {
        let exists = fs::try_exists(dest).await.map_err(|err| TrackError::Io {
            path: dest.to_path_buf(),
            source: err,
        })?;
        if exists {
            engine_debug!("{} already on disk, skipping", dest.display());
            return Ok(DownloadOutcome::Skipped);
        }

        let parsed = reqwest::Url::parse(stream_url).map_err(|err| TrackError::InvalidUrl {
            url: stream_url.to_string(),
            message: err.to_string(),
        })?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|err| request_error(stream_url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackError::HttpStatus {
                url: stream_url.to_string(),
                status: status.as_u16(),
            });
        }
        let total_bytes = response.content_length();

        sink.emit(ProgressEvent::TaskStarted {
            task_id,
            label: label.to_string(),
            total_bytes,
        });

        let partial = partial_path(dest);
        match write_stream(response, &partial, task_id, sink).await {
            Ok(bytes_written) => {
                if let Err(err) = fs::rename(&partial, dest).await {
                    remove_partial(&partial).await;
                    return Err(TrackError::Io {
                        path: dest.to_path_buf(),
                        source: err,
                    });
                }
                engine_debug!("{label}: {bytes_written} bytes written");
                Ok(DownloadOutcome::Completed { bytes_written })
            }
            Err(err) => {
                remove_partial(&partial).await;
                Err(err)
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_stream(
    response: reqwest::Response,
    partial: &Path,
    task_id: TaskId,
    sink: &dyn ProgressSink,
) -> Result<u64, TrackError> {
    let io_err = |err: std::io::Error| TrackError::Io {
        path: partial.to_path_buf(),
        source: err,
    };
    let url = response.url().to_string();
    let total_bytes = response.content_length();

    let mut file = fs::File::create(partial).await.map_err(io_err)?;
    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| request_error(&url, err))?;
        if chunk.is_empty() {
            continue;
        }
        file.write_all(&chunk).await.map_err(io_err)?;
        bytes_written += chunk.len() as u64;
        sink.emit(ProgressEvent::TaskAdvanced {
            task_id,
            bytes: chunk.len() as u64,
        });
    }
    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;

    // A body shorter than the announced length means the transfer broke.
    if let Some(total) = total_bytes {
        if bytes_written != total {
            return Err(TrackError::Network {
                url,
                message: format!("body ended after {bytes_written} of {total} bytes"),
            });
        }
    }
    Ok(bytes_written)
}

async fn remove_partial(partial: &Path) {
    if let Err(err) = fs::remove_file(partial).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            engine_warn!("could not remove partial file {}: {err}", partial.display());
        }
    }
}
