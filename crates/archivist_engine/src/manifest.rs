use std::path::{Path, PathBuf};

use serde_json::json;

use crate::persist::{self, PersistError};
use crate::scrape::AlbumInfo;
use crate::types::BatchSummary;

pub const MANIFEST_FILE_NAME: &str = "album.json";

/// Write `album.json` next to the downloaded tracks: what the album is,
/// where it came from, and how the batch went. Replaces any earlier run's
/// manifest atomically.
pub fn write_manifest(
    album_dir: &Path,
    info: &AlbumInfo,
    source_url: &str,
    saved_utc: &str,
    summary: &BatchSummary,
) -> Result<PathBuf, PersistError> {
    let doc = document(info, source_url, saved_utc, summary);
    let mut body = serde_json::to_string_pretty(&doc)
        .map_err(|err| PersistError::Serialize(err.to_string()))?;
    body.push('\n');
    persist::write_atomic(album_dir, MANIFEST_FILE_NAME, &body)
}

fn document(
    info: &AlbumInfo,
    source_url: &str,
    saved_utc: &str,
    summary: &BatchSummary,
) -> serde_json::Value {
    let failures: Vec<serde_json::Value> = summary
        .failures()
        .iter()
        .map(|failure| {
            json!({
                "track": failure.track.display_name(),
                "error": failure.error.to_string(),
            })
        })
        .collect();

    json!({
        "album": info.name,
        "source_url": source_url,
        "saved_utc": saved_utc,
        "platforms": info.platforms,
        "year": info.year,
        "developed_by": info.developed_by,
        "published_by": info.published_by,
        "file_count": info.file_count,
        "total_size": info.total_size,
        "date_added": info.date_added,
        "uploaded_by": info.uploaded_by,
        "changelog": info.changelog,
        "tracks": {
            "total": summary.items_total(),
            "completed": summary.completed(),
            "skipped": summary.skipped(),
            "failed": summary.failed(),
            "bytes_written": summary.bytes_written(),
        },
        "failures": failures,
    })
}
