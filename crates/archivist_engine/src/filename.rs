use std::path::{Path, PathBuf};

/// Extension used when a track link carries none.
pub const DEFAULT_EXTENSION: &str = "mp3";

const MAX_COMPONENT_LEN: usize = 80;

/// Windows-safe file name for one track: `{NN}. {title}.{ext}`.
///
/// The numeric prefix keeps names unique even when an album lists the same
/// title twice, and keeps a plain directory listing in album order.
pub fn track_file_name(number: usize, title: &str, extension: &str) -> String {
    let stem = sanitize_component(title);
    let ext = normalize_extension(extension);
    format!("{number:02}. {stem}.{ext}")
}

/// Directory component for the album folder.
pub fn album_dir_name(album_name: &str) -> String {
    sanitize_component(album_name)
}

/// Where a track lands on disk. Pure: same inputs, same path.
pub fn path_for(album_dir: &Path, display_name: &str) -> PathBuf {
    album_dir.join(display_name)
}

/// Best-effort extension from the final path segment of a URL.
pub fn extension_from_url(url: &str) -> String {
    let candidate = url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .and_then(|segment| {
            segment
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    candidate.unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Maps forbidden filesystem characters to `_`, collapses runs, trims edge
/// junk and defuses Windows reserved device names. Empty input becomes
/// `untitled`.
pub fn sanitize_component(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name = compacted;
    if final_name.len() > MAX_COMPONENT_LEN {
        let mut end = MAX_COMPONENT_LEN;
        while !final_name.is_char_boundary(end) {
            end -= 1;
        }
        final_name.truncate(end);
    }
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim_start_matches('.').trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return DEFAULT_EXTENSION.to_string();
    }
    trimmed.to_ascii_lowercase()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
