use std::time::Duration;

use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::decode;
use crate::types::{SetupError, TrackError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Cap on HTML page bodies. Does not apply to track streams.
    pub max_page_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_page_bytes: 4 * 1024 * 1024,
            user_agent: default_user_agent(),
        }
    }
}

pub(crate) fn default_user_agent() -> String {
    concat!("archivist/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPage {
    /// Final URL after redirects; relative links resolve against this.
    pub url: String,
    pub html: String,
}

/// Fetches and decodes HTML pages (album and track pages, not streams).
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    max_page_bytes: u64,
}

impl PageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|err| SetupError::HttpClient {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            max_page_bytes: settings.max_page_bytes,
        })
    }

    /// GET `url` and return the decoded HTML body.
    pub async fn fetch_html(&self, url: &str) -> Result<HtmlPage, TrackError> {
        let parsed = reqwest::Url::parse(url).map_err(|err| TrackError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|err| request_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_page_bytes {
                return Err(TrackError::TooLarge {
                    url: url.to_string(),
                    max_bytes: self.max_page_bytes,
                });
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| request_error(url, err))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_page_bytes {
                return Err(TrackError::TooLarge {
                    url: url.to_string(),
                    max_bytes: self.max_page_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let html = decode::decode_page(&bytes, content_type.as_deref()).map_err(|err| {
            TrackError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        })?;
        engine_debug!("fetched {final_url} ({} bytes)", bytes.len());

        Ok(HtmlPage {
            url: final_url,
            html,
        })
    }
}

pub(crate) fn request_error(url: &str, err: reqwest::Error) -> TrackError {
    if err.is_timeout() {
        return TrackError::Timeout {
            url: url.to_string(),
        };
    }
    TrackError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}
