//! Wire models and HTTP client for the external video search provider.
//!
//! Structs mirror the provider's JSON; most fields stay optional or default
//! so partially populated responses deserialize instead of failing the page.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::query::SearchQuery;

pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const GENERIC_FAILURE: &str = "failed to fetch videos";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub results_per_page: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub id: SearchItemId,
    #[serde(default)]
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: ThumbnailSet,
    #[serde(default)]
    pub channel_title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThumbnailSet {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

/// One entry of the per-item detail lookup (`/videos`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub snippet: Snippet,
    pub content_details: Option<ContentDetails>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderErrorBody {
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
}

/// Seam between the catalog flow and the external search service. The store
/// and normalizer only ever talk to this trait, so tests can substitute a
/// scripted provider.
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &SearchQuery) -> Result<SearchResponse, CatalogError>;
    fn video_details(&self, video_id: &str) -> Result<VideoItem, CatalogError>;
}

/// Blocking HTTP implementation against the YouTube Data API. Always driven
/// from async code through `tokio::task::spawn_blocking`.
#[derive(Debug)]
pub struct YouTubeProvider {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl YouTubeProvider {
    /// Validates the credential up front: an empty key is a configuration
    /// error raised before any request can be made.
    pub fn new(api_key: impl Into<String>) -> Result<Self, CatalogError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CatalogError::MissingCredential);
        }
        Ok(Self {
            agent: ureq::agent(),
            api_key,
            base_url: API_BASE_URL.to_owned(),
        })
    }
}

impl SearchProvider for YouTubeProvider {
    fn search(&self, query: &SearchQuery) -> Result<SearchResponse, CatalogError> {
        let mut request = self
            .agent
            .get(&format!("{}/search", self.base_url))
            .query("part", "snippet")
            .query("q", &query.text)
            .query("type", "video")
            .query("maxResults", &query.page_size.to_string())
            .query("order", query.order)
            .query("key", &self.api_key);
        if let Some(token) = &query.page_token {
            request = request.query("pageToken", token);
        }

        execute(request)
    }

    fn video_details(&self, video_id: &str) -> Result<VideoItem, CatalogError> {
        let request = self
            .agent
            .get(&format!("{}/videos", self.base_url))
            .query("part", "snippet,statistics,contentDetails")
            .query("id", video_id)
            .query("key", &self.api_key);

        let response: VideoListResponse = execute(request)?;
        response
            .items
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound)
    }
}

fn execute<T: serde::de::DeserializeOwned>(request: ureq::Request) -> Result<T, CatalogError> {
    match request.call() {
        Ok(response) => response
            .into_json()
            .map_err(|err| CatalogError::Network(format!("decoding provider response: {err}"))),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(status_error(status, &body))
        }
        Err(err) => Err(CatalogError::Network(err.to_string())),
    }
}

/// Maps a non-success status to the catalog error taxonomy: 403 becomes the
/// distinguished quota/access error, everything else carries the provider's
/// own message through verbatim.
fn status_error(status: u16, body: &str) -> CatalogError {
    if status == 403 {
        return CatalogError::AccessDenied;
    }

    let message = serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|detail| detail.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_owned());

    CatalogError::Provider { status, message }
}
