//! Archivist engine: album scraping, stream link resolution and the bounded
//! concurrent download pipeline.
mod batch;
mod decode;
mod download;
mod fetch;
mod filename;
mod manifest;
mod persist;
mod resolve;
mod scrape;
mod track;
mod types;

pub use batch::{run_batch, BatchOptions, DEFAULT_WORKER_COUNT};
pub use decode::{decode_page, DecodeError};
pub use download::{DownloadOutcome, DownloadSettings, HttpTrackDownloader, TrackDownloader};
pub use fetch::{FetchSettings, HtmlPage, PageFetcher};
pub use filename::{
    album_dir_name, extension_from_url, path_for, sanitize_component, track_file_name,
    DEFAULT_EXTENSION,
};
pub use manifest::{write_manifest, MANIFEST_FILE_NAME};
pub use persist::{ensure_album_dir, write_atomic, PersistError};
pub use resolve::{AudioPageResolver, ResolvedLink, StreamResolver};
pub use scrape::{parse_album, AlbumInfo, AlbumPage, ScrapeError};
pub use track::{InvalidTrackRef, TrackRef};
pub use types::{
    BatchSummary, NoopProgressSink, OutcomeKind, ProgressEvent, ProgressSink, SetupError, TaskId,
    TrackError, TrackFailure,
};
