use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::models::{PlaylistItemListResponse, PlaylistPage, VideoItem, VideoListResponse};
use super::{VideoPlatform, MAX_BATCH_SIZE};
use crate::config::ApiConfig;
use crate::error::{AnalyzerError, Result};
use crate::records::{ChannelListingId, VideoId};

/// YouTube Data API v3 client
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl YouTubeClient {
    /// Create a client with the configured key, base URL and request timeout
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AnalyzerError::Configuration("YouTube API key is missing".into()))?
            .to_string();

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            AnalyzerError::Configuration(format!("invalid API base URL {}: {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AnalyzerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), name)
    }

    /// GET an endpoint and decode the JSON body.
    ///
    /// Transport failures and non-2xx statuses are `TransientFetch`, an
    /// undecodable body is `MalformedResponse`.
    async fn get_json<T: DeserializeOwned>(&self, name: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(name);
        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AnalyzerError::TransientFetch(format!("{} request failed: {}", name, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalyzerError::TransientFetch(format!("{} body read failed: {}", name, e)))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(AnalyzerError::TransientFetch(format!(
                "{} returned {}: {}",
                name, status, snippet
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AnalyzerError::MalformedResponse(format!("{} response: {}", name, e)))
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn video_details(&self, ids: &[VideoId]) -> Result<Vec<VideoItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_BATCH_SIZE {
            return Err(AnalyzerError::Configuration(format!(
                "videos.list accepts at most {} ids, got {}",
                MAX_BATCH_SIZE,
                ids.len()
            )));
        }

        let joined = ids.iter().map(VideoId::as_str).collect::<Vec<_>>().join(",");
        let response: VideoListResponse = self
            .get_json(
                "videos",
                &[("part", "snippet,contentDetails,statistics"), ("id", &joined)],
            )
            .await?;

        if let Some(error) = response.error {
            return Err(AnalyzerError::TransientFetch(format!(
                "YouTube API error: {}",
                error.describe()
            )));
        }

        Ok(response.items.unwrap_or_default())
    }

    async fn playlist_page(
        &self,
        listing_id: &ChannelListingId,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage> {
        let max_results = MAX_BATCH_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", listing_id.as_str()),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: PlaylistItemListResponse = self.get_json("playlistItems", &params).await?;
        response.into_page()
    }
}
