//! Typed records for the YouTube Data API v3 responses
//!
//! Every field is optional on the wire; conversion into the domain shapes
//! happens here so missing keys surface as `MalformedResponse` at the boundary.

use serde::Deserialize;

use crate::error::{AnalyzerError, Result};
use crate::records::VideoId;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    pub message: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> String {
        format!(
            "{} ({})",
            self.message.as_deref().unwrap_or("unknown error"),
            self.code.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string())
        )
    }
}

/// `videos.list` response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Option<Vec<VideoItem>>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoItem {
    pub id: Option<String>,
    pub snippet: Option<VideoSnippet>,
    #[serde(rename = "contentDetails")]
    pub content_details: Option<VideoContentDetails>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoSnippet {
    pub title: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "channelId")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

/// Counts arrive as decimal strings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
}

/// Validated view of a `videos.list` item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDetails {
    pub id: VideoId,
    pub title: String,
    pub published_at: String,
    pub duration: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

impl VideoItem {
    /// Owning channel of the video, required for catalog resolution
    pub fn channel_id(&self) -> Result<&str> {
        self.snippet
            .as_ref()
            .and_then(|s| s.channel_id.as_deref())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AnalyzerError::MalformedResponse(format!(
                    "video {} has no snippet.channelId",
                    self.id.as_deref().unwrap_or("<unknown>")
                ))
            })
    }

    /// Validate the item into details; statistics default to zero
    pub fn into_details(self) -> Result<VideoDetails> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AnalyzerError::MalformedResponse("video item without id".into()))?;

        let snippet = self.snippet.ok_or_else(|| {
            AnalyzerError::MalformedResponse(format!("video {} has no snippet", id))
        })?;

        let title = snippet.title.ok_or_else(|| {
            AnalyzerError::MalformedResponse(format!("video {} has no snippet.title", id))
        })?;

        let published_at = snippet.published_at.ok_or_else(|| {
            AnalyzerError::MalformedResponse(format!("video {} has no snippet.publishedAt", id))
        })?;

        let stats = self.statistics.unwrap_or_default();

        Ok(VideoDetails {
            id: VideoId::new(id),
            title,
            published_at,
            duration: self.content_details.and_then(|cd| cd.duration),
            views: parse_count(stats.view_count.as_deref()),
            likes: parse_count(stats.like_count.as_deref()),
            comments: parse_count(stats.comment_count.as_deref()),
        })
    }
}

/// `playlistItems.list` response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Option<Vec<PlaylistItem>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaylistItem {
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaylistItemSnippet {
    pub title: Option<String>,
    #[serde(rename = "resourceId")]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResourceId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

/// One video of a channel listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub video_id: VideoId,
    pub title: String,
}

impl PlaylistItem {
    pub fn into_entry(self) -> Result<PlaylistEntry> {
        let snippet = self
            .snippet
            .ok_or_else(|| AnalyzerError::MalformedResponse("playlist item without snippet".into()))?;

        let video_id = snippet
            .resource_id
            .and_then(|r| r.video_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AnalyzerError::MalformedResponse("playlist item without resourceId.videoId".into())
            })?;

        Ok(PlaylistEntry {
            video_id: VideoId::new(video_id),
            title: snippet.title.unwrap_or_default(),
        })
    }
}

/// One page of a listing after validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub entries: Vec<PlaylistEntry>,
    pub next_page_token: Option<String>,
    /// Items dropped because they lacked a video id
    pub malformed_items: usize,
}

impl PlaylistItemListResponse {
    pub fn into_page(self) -> Result<PlaylistPage> {
        if let Some(error) = self.error {
            return Err(AnalyzerError::TransientFetch(format!(
                "YouTube API error: {}",
                error.describe()
            )));
        }

        let mut page = PlaylistPage {
            next_page_token: self.next_page_token.filter(|t| !t.is_empty()),
            ..PlaylistPage::default()
        };

        for item in self.items.unwrap_or_default() {
            match item.into_entry() {
                Ok(entry) => page.entries.push(entry),
                Err(e) => {
                    tracing::debug!("Skipping playlist item: {}", e);
                    page.malformed_items += 1;
                }
            }
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_item_into_details() {
        let item: VideoItem = serde_json::from_value(json!({
            "id": "abc123",
            "snippet": {
                "title": "医師が語る",
                "publishedAt": "2024-03-05T10:00:00Z",
                "channelId": "UCxyz"
            },
            "contentDetails": { "duration": "PT4M13S" },
            "statistics": { "viewCount": "1200", "likeCount": "34" }
        }))
        .unwrap();

        assert_eq!(item.channel_id().unwrap(), "UCxyz");

        let details = item.into_details().unwrap();
        assert_eq!(details.id.as_str(), "abc123");
        assert_eq!(details.title, "医師が語る");
        assert_eq!(details.duration.as_deref(), Some("PT4M13S"));
        assert_eq!(details.views, 1200);
        assert_eq!(details.likes, 34);
        assert_eq!(details.comments, 0);
    }

    #[test]
    fn test_video_item_missing_snippet() {
        let item: VideoItem = serde_json::from_value(json!({ "id": "abc" })).unwrap();
        assert!(matches!(item.channel_id(), Err(AnalyzerError::MalformedResponse(_))));
        assert!(matches!(item.into_details(), Err(AnalyzerError::MalformedResponse(_))));
    }

    #[test]
    fn test_playlist_page_skips_bad_items() {
        let response: PlaylistItemListResponse = serde_json::from_value(json!({
            "items": [
                { "snippet": { "title": "one", "resourceId": { "videoId": "v1" } } },
                { "snippet": { "title": "broken" } },
                { "snippet": { "resourceId": { "videoId": "v2" } } }
            ],
            "nextPageToken": "CAUQAA"
        }))
        .unwrap();

        let page = response.into_page().unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[1].title, "");
        assert_eq!(page.malformed_items, 1);
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn test_api_error_is_transient() {
        let response: PlaylistItemListResponse = serde_json::from_value(json!({
            "error": { "code": 404, "message": "playlistNotFound" }
        }))
        .unwrap();

        match response.into_page() {
            Err(AnalyzerError::TransientFetch(msg)) => assert!(msg.contains("playlistNotFound")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
