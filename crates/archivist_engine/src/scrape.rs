use engine_logging::engine_warn;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::filename;
use crate::track::TrackRef;

/// Metadata shown on an album page. Only the name is guaranteed; the rest
/// mirrors whatever the details block listed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlbumInfo {
    pub name: String,
    pub platforms: Option<String>,
    pub year: Option<String>,
    pub developed_by: Option<String>,
    pub published_by: Option<String>,
    pub file_count: Option<String>,
    pub total_size: Option<String>,
    pub date_added: Option<String>,
    pub uploaded_by: Option<String>,
    pub changelog: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumPage {
    pub info: AlbumInfo,
    pub tracks: Vec<TrackRef>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("album page url {url:?} is not usable: {message}")]
    BadPageUrl { url: String, message: String },
    #[error("album page has no name heading")]
    MissingAlbumName,
    #[error("album page has no track table")]
    MissingTrackTable,
    #[error("album page lists no usable tracks")]
    NoTracks,
}

/// Parse an album page into its metadata and numbered track list.
///
/// `page_url` is the URL the page was fetched from; relative track links are
/// joined against it.
pub fn parse_album(html: &str, page_url: &str) -> Result<AlbumPage, ScrapeError> {
    let base = Url::parse(page_url).map_err(|err| ScrapeError::BadPageUrl {
        url: page_url.to_string(),
        message: err.to_string(),
    })?;
    let doc = Html::parse_document(html);
    let info = parse_info(&doc)?;
    let tracks = parse_tracks(&doc, &base)?;
    Ok(AlbumPage { info, tracks })
}

fn sel(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn parse_info(doc: &Html) -> Result<AlbumInfo, ScrapeError> {
    let name = sel("h2")
        .and_then(|s| doc.select(&s).next())
        .map(|heading| collapse_ws(&heading.text().collect::<String>()))
        .filter(|name| !name.is_empty())
        .ok_or(ScrapeError::MissingAlbumName)?;

    let mut info = AlbumInfo {
        name,
        ..AlbumInfo::default()
    };

    if let Some(details) = sel(r#"p[align="left"]"#).and_then(|s| doc.select(&s).next()) {
        apply_details(&mut info, details);
    }

    info.uploaded_by = sel(r#"a[href*="/forums/index.php?members"]"#)
        .and_then(|s| doc.select(&s).next())
        .map(|link| collapse_ws(&link.text().collect::<String>()))
        .filter(|text| !text.is_empty());

    info.changelog = parse_changelog(doc);
    Ok(info)
}

/// Labels in the details block whose values we keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailField {
    Platforms,
    Year,
    DevelopedBy,
    PublishedBy,
    FileCount,
    TotalSize,
    DateAdded,
}

impl DetailField {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "platforms" => Some(Self::Platforms),
            "year" => Some(Self::Year),
            "developed by" => Some(Self::DevelopedBy),
            "published by" => Some(Self::PublishedBy),
            "number of files" => Some(Self::FileCount),
            "total filesize" => Some(Self::TotalSize),
            "date added" => Some(Self::DateAdded),
            _ => None,
        }
    }

    fn slot(self, info: &mut AlbumInfo) -> &mut Option<String> {
        match self {
            Self::Platforms => &mut info.platforms,
            Self::Year => &mut info.year,
            Self::DevelopedBy => &mut info.developed_by,
            Self::PublishedBy => &mut info.published_by,
            Self::FileCount => &mut info.file_count,
            Self::TotalSize => &mut info.total_size,
            Self::DateAdded => &mut info.date_added,
        }
    }

    /// Fields whose values span several text chunks (one per linked entry).
    /// Single-valued fields lock after their first chunk so trailing page
    /// furniture (changelog link text, uploader names) cannot leak in.
    fn accumulates(self) -> bool {
        matches!(self, Self::Platforms | Self::DevelopedBy | Self::PublishedBy)
    }
}

/// Walk the text chunks of the details block the way they render: a
/// `Label:` chunk opens a field, following chunks carry its value until the
/// next label. Unknown labels close the current field.
fn apply_details(info: &mut AlbumInfo, details: ElementRef<'_>) {
    let mut current: Option<DetailField> = None;
    for chunk in details.text() {
        let line = collapse_ws(chunk);
        if line.is_empty() {
            continue;
        }
        if let Some((raw_label, inline_value)) = line.split_once(':') {
            if let Some(field) = DetailField::from_label(raw_label) {
                current = Some(field);
                let inline_value = inline_value.trim();
                if !inline_value.is_empty() {
                    append_value(field.slot(info), inline_value);
                    if !field.accumulates() {
                        current = None;
                    }
                }
                continue;
            }
            current = None;
            continue;
        }
        if let Some(field) = current {
            append_value(field.slot(info), &line);
            if !field.accumulates() {
                current = None;
            }
        }
    }
}

fn append_value(slot: &mut Option<String>, text: &str) {
    match slot.as_mut() {
        Some(value) => {
            if !text.starts_with(',') && !text.starts_with(')') {
                value.push(' ');
            }
            value.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

fn parse_changelog(doc: &Html) -> Vec<String> {
    let anchor = match sel("a.change_log_dropdown").and_then(|s| doc.select(&s).next()) {
        Some(anchor) => anchor,
        None => return Vec::new(),
    };
    let tooltip = match sel("span.tooltip").and_then(|s| anchor.select(&s).next()) {
        Some(tooltip) => tooltip,
        None => return Vec::new(),
    };
    tooltip
        .text()
        .map(collapse_ws)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            !line.eq_ignore_ascii_case("album changelog:") && !line.eq_ignore_ascii_case("changelog:")
        })
        .collect()
}

fn parse_tracks(doc: &Html, base: &Url) -> Result<Vec<TrackRef>, ScrapeError> {
    let table = sel("table#songlist")
        .and_then(|s| doc.select(&s).next())
        .ok_or(ScrapeError::MissingTrackTable)?;
    let row_sel = sel("tr").ok_or(ScrapeError::MissingTrackTable)?;
    let cell_sel = sel("td.clickable-row").ok_or(ScrapeError::MissingTrackTable)?;
    let link_sel = sel("a").ok_or(ScrapeError::MissingTrackTable)?;

    let rows: Vec<ElementRef<'_>> = table.select(&row_sel).collect();
    if rows.len() <= 2 {
        // Just the header and footer rows.
        return Err(ScrapeError::NoTracks);
    }

    let mut listed = Vec::new();
    for row in &rows[1..rows.len() - 1] {
        let cell = match row.select(&cell_sel).next() {
            Some(cell) => cell,
            None => {
                engine_warn!("track row without a clickable cell, skipping");
                continue;
            }
        };
        let title = collapse_ws(&cell.text().collect::<String>());
        let href = match cell
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            Some(href) => href,
            None => {
                engine_warn!("track row {title:?} has no link, skipping");
                continue;
            }
        };
        let absolute = match base.join(href) {
            Ok(joined) => joined.to_string(),
            Err(err) => {
                engine_warn!("track link {href:?} does not resolve: {err}, skipping");
                continue;
            }
        };
        if title.is_empty() {
            engine_warn!("track row for {absolute} has no title, skipping");
            continue;
        }
        listed.push((title, absolute));
    }

    if listed.is_empty() {
        return Err(ScrapeError::NoTracks);
    }

    let mut tracks = Vec::with_capacity(listed.len());
    for (index, (title, link)) in listed.into_iter().enumerate() {
        let extension = filename::extension_from_url(&link);
        let display_name = filename::track_file_name(index + 1, &title, &extension);
        match TrackRef::new(display_name, link) {
            Ok(track) => tracks.push(track),
            Err(err) => engine_warn!("dropping track {}: {err}", index + 1),
        }
    }
    Ok(tracks)
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
