use thiserror::Error;

/// One downloadable track as listed on an album page.
///
/// Instances are built once at the scraping boundary and are valid by
/// construction: the display name is non-empty (and already filesystem-safe,
/// see `filename`), the source URL is non-empty and absolute. Downstream
/// code never re-checks either field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    display_name: String,
    source_url: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidTrackRef {
    #[error("track display name is empty")]
    EmptyName,
    #[error("track source url is empty")]
    EmptyUrl,
}

impl TrackRef {
    pub fn new(
        display_name: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Result<Self, InvalidTrackRef> {
        let display_name = display_name.into();
        let source_url = source_url.into();
        if display_name.trim().is_empty() {
            return Err(InvalidTrackRef::EmptyName);
        }
        if source_url.trim().is_empty() {
            return Err(InvalidTrackRef::EmptyUrl);
        }
        Ok(Self {
            display_name,
            source_url,
        })
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// URL of the track's own page (not the stream itself).
    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}
