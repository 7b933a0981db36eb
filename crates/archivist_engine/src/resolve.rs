use async_trait::async_trait;
use engine_logging::engine_debug;
use scraper::{Html, Selector};
use url::Url;

use crate::fetch::PageFetcher;
use crate::types::TrackError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub stream_url: String,
}

/// Turns a track's page URL into the direct stream URL.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, track_url: &str) -> Result<ResolvedLink, TrackError>;
}

/// Resolver that fetches the track page and reads the first `<audio>`
/// element's source attribute.
pub struct AudioPageResolver {
    fetcher: PageFetcher,
}

impl AudioPageResolver {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl StreamResolver for AudioPageResolver {
    async fn resolve(&self, track_url: &str) -> Result<ResolvedLink, TrackError> {
        let page = self.fetcher.fetch_html(track_url).await?;
        let src = find_audio_source(&page.html).ok_or_else(|| TrackError::MissingAudioSource {
            url: track_url.to_string(),
        })?;
        let stream_url = absolutize(&src, &page.url).ok_or_else(|| TrackError::InvalidUrl {
            url: src.clone(),
            message: "audio source is not a resolvable url".to_string(),
        })?;
        engine_debug!("resolved {track_url} -> {stream_url}");
        Ok(ResolvedLink { stream_url })
    }
}

fn find_audio_source(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let audio = Selector::parse("audio").ok()?;
    doc.select(&audio)
        .next()?
        .value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

fn absolutize(href: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|joined| joined.to_string())
}
