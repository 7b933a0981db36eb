//! Plain-text blocks printed around the progress bars.

use std::fmt::Write as _;
use std::time::Duration;

use archivist_engine::{AlbumInfo, BatchSummary};

/// Album header shown before the downloads start. Fields the page did not
/// carry render as `-` so the block keeps its shape.
pub fn album_block(info: &AlbumInfo, track_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", info.name);
    let _ = writeln!(out, "{}", "=".repeat(info.name.chars().count().max(8)));
    line(&mut out, "Platforms", info.platforms.as_deref());
    line(&mut out, "Year", info.year.as_deref());
    line(&mut out, "Developed by", info.developed_by.as_deref());
    line(&mut out, "Published by", info.published_by.as_deref());
    line(&mut out, "Files listed", info.file_count.as_deref());
    line(&mut out, "Total size", info.total_size.as_deref());
    line(&mut out, "Date added", info.date_added.as_deref());
    line(&mut out, "Uploaded by", info.uploaded_by.as_deref());
    if let Some((first, rest)) = info.changelog.split_first() {
        line(&mut out, "Changelog", Some(first));
        for entry in rest {
            let _ = writeln!(out, "{:>14}  {entry}", "");
        }
    }
    line(&mut out, "Tracks found", Some(&track_count.to_string()));
    out
}

/// Closing block after the batch settles: counts, bytes, elapsed time and
/// one line per failed track.
pub fn summary_block(summary: &BatchSummary, elapsed: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} completed, {} skipped, {} failed ({} in {})",
        summary.completed(),
        summary.skipped(),
        summary.failed(),
        format_bytes(summary.bytes_written()),
        format_duration(elapsed),
    );
    for failure in summary.failures() {
        let _ = writeln!(out, "  {}: {}", failure.track.display_name(), failure.error);
    }
    out
}

fn line(out: &mut String, label: &str, value: Option<&str>) {
    let shown = match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    };
    let _ = writeln!(out, "{label:>14}: {shown}");
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!(
            "{}h {:02}m {:02}s",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:01}s", secs, d.subsec_millis() / 100)
    }
}
