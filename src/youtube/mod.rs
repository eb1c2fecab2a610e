//! External video platform query surface
//!
//! The pipeline only talks to the platform through [`VideoPlatform`];
//! [`YouTubeClient`] is the production implementation over the Data API v3.

pub mod client;
pub mod models;

pub use client::YouTubeClient;
pub use models::{PlaylistEntry, PlaylistPage, VideoDetails, VideoItem};

use async_trait::async_trait;

use crate::error::Result;
use crate::records::{ChannelListingId, VideoId};

/// Largest id batch or page size the Data API accepts
pub const MAX_BATCH_SIZE: usize = 50;

/// Batch and paginated queries against the video platform
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Look up details for at most [`MAX_BATCH_SIZE`] ids.
    ///
    /// Ids the platform does not know are silently absent from the result.
    async fn video_details(&self, ids: &[VideoId]) -> Result<Vec<VideoItem>>;

    /// Fetch one page of a channel listing, following `page_token` when given
    async fn playlist_page(
        &self,
        listing_id: &ChannelListingId,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage>;
}
