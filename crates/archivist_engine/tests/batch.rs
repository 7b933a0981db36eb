mod common;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use archivist_engine::{
    run_batch, AudioPageResolver, BatchOptions, DownloadOutcome, DownloadSettings, FetchSettings,
    HttpTrackDownloader, NoopProgressSink, PageFetcher, ProgressEvent, ProgressSink, ResolvedLink,
    SetupError, StreamResolver, TaskId, TrackDownloader, TrackError, TrackRef,
};
use async_trait::async_trait;
use common::{init_logging, RecordingSink};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tracks how many jobs sit inside instrumented calls right now, and the
/// highest that count ever got.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct FakeResolver {
    gauge: Arc<Gauge>,
    calls: Arc<AtomicUsize>,
    base_delay: Duration,
    slow: Option<(&'static str, Duration)>,
    fail: Option<&'static str>,
    panic: Option<&'static str>,
}

impl Default for FakeResolver {
    fn default() -> Self {
        Self {
            gauge: Arc::new(Gauge::default()),
            calls: Arc::new(AtomicUsize::new(0)),
            base_delay: Duration::ZERO,
            slow: None,
            fail: None,
            panic: None,
        }
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, track_url: &str) -> Result<ResolvedLink, TrackError> {
        self.gauge.enter();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut delay = self.base_delay;
        if let Some((marker, slow_delay)) = self.slow {
            if track_url.contains(marker) {
                delay = slow_delay;
            }
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.panic.is_some_and(|marker| track_url.contains(marker)) {
            self.gauge.exit();
            panic!("resolver exploded for {track_url}");
        }
        let result = if self.fail.is_some_and(|marker| track_url.contains(marker)) {
            Err(TrackError::MissingAudioSource {
                url: track_url.to_string(),
            })
        } else {
            Ok(ResolvedLink {
                stream_url: format!("{track_url}/stream"),
            })
        };
        self.gauge.exit();
        result
    }
}

struct FakeDownloader {
    gauge: Arc<Gauge>,
    delay: Duration,
    bytes: u64,
}

impl Default for FakeDownloader {
    fn default() -> Self {
        Self {
            gauge: Arc::new(Gauge::default()),
            delay: Duration::ZERO,
            bytes: 8,
        }
    }
}

#[async_trait]
impl TrackDownloader for FakeDownloader {
    async fn download(
        &self,
        task_id: TaskId,
        label: &str,
        _stream_url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, TrackError> {
        self.gauge.enter();
        if dest.exists() {
            self.gauge.exit();
            return Ok(DownloadOutcome::Skipped);
        }
        sink.emit(ProgressEvent::TaskStarted {
            task_id,
            label: label.to_string(),
            total_bytes: Some(self.bytes),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = match std::fs::write(dest, vec![7u8; self.bytes as usize]) {
            Ok(()) => {
                sink.emit(ProgressEvent::TaskAdvanced {
                    task_id,
                    bytes: self.bytes,
                });
                Ok(DownloadOutcome::Completed {
                    bytes_written: self.bytes,
                })
            }
            Err(err) => Err(TrackError::Io {
                path: dest.to_path_buf(),
                source: err,
            }),
        };
        self.gauge.exit();
        result
    }
}

fn track(n: usize, base: &str) -> TrackRef {
    TrackRef::new(format!("{n:02}. Track {n}.mp3"), format!("{base}/track/{n}")).unwrap()
}

fn fake_tracks(count: usize) -> Vec<TrackRef> {
    (1..=count).map(|n| track(n, "https://albums.test")).collect()
}

fn server_tracks(uri: &str, count: usize) -> Vec<TrackRef> {
    (1..=count).map(|n| track(n, uri)).collect()
}

async fn mount_track_page(server: &MockServer, n: usize, with_audio: bool) {
    let body = if with_audio {
        format!("<html><audio src=\"/stream/{n}.mp3\"></audio></html>")
    } else {
        "<html><p>no player on this page</p></html>".to_string()
    };
    Mock::given(method("GET"))
        .and(path(format!("/track/{n}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

async fn mount_stream(server: &MockServer, n: usize, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/stream/{n}.mp3")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), "audio/mpeg"))
        .mount(server)
        .await;
}

fn real_pipeline() -> (Arc<dyn StreamResolver>, Arc<dyn TrackDownloader>) {
    let fetcher = PageFetcher::new(&FetchSettings::default()).expect("client builds");
    (
        Arc::new(AudioPageResolver::new(fetcher)),
        Arc::new(HttpTrackDownloader::new(&DownloadSettings::default()).expect("client builds")),
    )
}

#[tokio::test]
async fn failing_middle_track_leaves_siblings_intact() {
    init_logging();
    let server = MockServer::start().await;
    mount_track_page(&server, 1, true).await;
    mount_track_page(&server, 2, false).await;
    mount_track_page(&server, 3, true).await;
    mount_stream(&server, 1, b"first track bytes").await;
    mount_stream(&server, 3, b"third track bytes").await;

    let dir = TempDir::new().unwrap();
    let (resolver, downloader) = real_pipeline();
    let sink = RecordingSink::new();

    let summary = run_batch(
        resolver,
        downloader,
        server_tracks(&server.uri(), 3),
        dir.path(),
        &BatchOptions { worker_count: 2 },
        Arc::new(sink.clone()),
    )
    .await
    .expect("batch runs");

    assert_eq!(summary.items_total(), 3);
    assert_eq!(summary.completed(), 2);
    assert_eq!(summary.skipped(), 0);
    assert_eq!(summary.failed(), 1);
    let failure = &summary.failures()[0];
    assert_eq!(failure.track.display_name(), "02. Track 2.mp3");
    assert!(matches!(
        failure.error,
        TrackError::MissingAudioSource { .. }
    ));

    assert_eq!(
        std::fs::read(dir.path().join("01. Track 1.mp3")).unwrap(),
        b"first track bytes"
    );
    assert_eq!(
        std::fs::read(dir.path().join("03. Track 3.mp3")).unwrap(),
        b"third track bytes"
    );
    assert!(!dir.path().join("02. Track 2.mp3").exists());
    assert_eq!(sink.overall_count(), 3);
}

#[tokio::test]
async fn second_run_skips_everything_without_network() {
    let server = MockServer::start().await;
    for n in 1..=2 {
        mount_track_page(&server, n, true).await;
        mount_stream(&server, n, b"the same bytes").await;
    }
    let dir = TempDir::new().unwrap();
    let (resolver, downloader) = real_pipeline();

    let first = run_batch(
        Arc::clone(&resolver),
        Arc::clone(&downloader),
        server_tracks(&server.uri(), 2),
        dir.path(),
        &BatchOptions::default(),
        Arc::new(NoopProgressSink),
    )
    .await
    .expect("first run");
    assert_eq!(first.completed(), 2);
    let requests_after_first = server.received_requests().await.unwrap().len();
    assert_eq!(requests_after_first, 4); // two pages, two streams

    let sink = RecordingSink::new();
    let second = run_batch(
        resolver,
        downloader,
        server_tracks(&server.uri(), 2),
        dir.path(),
        &BatchOptions::default(),
        Arc::new(sink.clone()),
    )
    .await
    .expect("second run");

    assert_eq!(second.skipped(), 2);
    assert_eq!(second.completed(), 0);
    assert_eq!(second.failed(), 0);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
    assert!(sink
        .events()
        .iter()
        .all(|event| !matches!(event, ProgressEvent::TaskStarted { .. })));
    assert_eq!(sink.overall_count(), 2);
}

#[tokio::test]
async fn worker_count_bounds_in_flight_jobs() {
    let dir = TempDir::new().unwrap();
    let gauge = Arc::new(Gauge::default());
    let resolver = Arc::new(FakeResolver {
        gauge: Arc::clone(&gauge),
        base_delay: Duration::from_millis(40),
        ..FakeResolver::default()
    });
    let downloader = Arc::new(FakeDownloader {
        gauge: Arc::clone(&gauge),
        delay: Duration::from_millis(25),
        bytes: 4,
    });

    let summary = run_batch(
        resolver,
        downloader,
        fake_tracks(6),
        dir.path(),
        &BatchOptions { worker_count: 2 },
        Arc::new(NoopProgressSink),
    )
    .await
    .expect("batch runs");

    assert_eq!(summary.completed(), 6);
    assert!(gauge.peak() >= 2, "expected both workers busy at some point");
    assert!(gauge.peak() <= 2, "more than worker_count jobs ran at once");
}

#[tokio::test]
async fn slowest_job_settles_last_without_losing_any() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(FakeResolver {
        base_delay: Duration::from_millis(5),
        slow: Some(("/track/1", Duration::from_millis(150))),
        ..FakeResolver::default()
    });
    let sink = RecordingSink::new();

    let summary = run_batch(
        resolver,
        Arc::new(FakeDownloader::default()),
        fake_tracks(4),
        dir.path(),
        &BatchOptions { worker_count: 4 },
        Arc::new(sink.clone()),
    )
    .await
    .expect("batch runs");

    assert_eq!(summary.items_finished(), 4);
    assert_eq!(summary.completed(), 4);
    assert_eq!(sink.overall_count(), 4);

    let finished = sink.finished_labels();
    assert_eq!(finished.len(), 4);
    assert_eq!(
        finished.last().map(String::as_str),
        Some("01. Track 1.mp3"),
        "the slow job should settle last"
    );
    assert_ne!(finished.first().map(String::as_str), Some("01. Track 1.mp3"));
}

#[tokio::test]
async fn panicking_job_is_contained() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(FakeResolver {
        panic: Some("/track/2"),
        ..FakeResolver::default()
    });

    let summary = run_batch(
        resolver,
        Arc::new(FakeDownloader::default()),
        fake_tracks(3),
        dir.path(),
        &BatchOptions::default(),
        Arc::new(NoopProgressSink),
    )
    .await
    .expect("batch survives");

    assert_eq!(summary.completed(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures()[0].track.display_name(), "02. Track 2.mp3");
    assert!(matches!(
        summary.failures()[0].error,
        TrackError::JobPanicked
    ));
    assert!(dir.path().join("01. Track 1.mp3").exists());
    assert!(dir.path().join("03. Track 3.mp3").exists());
}

#[tokio::test]
async fn album_dir_that_is_a_file_fails_setup() {
    let dir = TempDir::new().unwrap();
    let occupied = dir.path().join("occupied");
    std::fs::write(&occupied, b"not a directory").unwrap();

    let resolver = Arc::new(FakeResolver::default());
    let calls = Arc::clone(&resolver.calls);
    let err = run_batch(
        resolver,
        Arc::new(FakeDownloader::default()),
        fake_tracks(2),
        &occupied,
        &BatchOptions::default(),
        Arc::new(NoopProgressSink),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SetupError::AlbumDir { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "no job should have started");
}

#[tokio::test]
async fn empty_track_list_is_a_clean_summary() {
    let dir = TempDir::new().unwrap();
    let summary = run_batch(
        Arc::new(FakeResolver::default()),
        Arc::new(FakeDownloader::default()),
        Vec::new(),
        dir.path(),
        &BatchOptions::default(),
        Arc::new(NoopProgressSink),
    )
    .await
    .expect("runs");

    assert_eq!(summary.items_total(), 0);
    assert_eq!(summary.items_finished(), 0);
    assert!(summary.all_succeeded());
}
