use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FailureStage, FailureTally};
use crate::records::{ChannelListingId, VideoId};
use crate::throttle::Throttle;
use crate::youtube::{PlaylistEntry, VideoPlatform, MAX_BATCH_SIZE};

/// Case-sensitive substring match against a video's display title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleFilter {
    needle: String,
}

impl TitleFilter {
    /// `None` for a blank needle, which would match everything
    pub fn new(needle: impl Into<String>) -> Option<Self> {
        let needle = needle.into();
        if needle.trim().is_empty() {
            None
        } else {
            Some(Self { needle })
        }
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, title: &str) -> bool {
        title.contains(&self.needle)
    }
}

/// Expands seed videos into the full catalog of their channels
pub struct CatalogResolver {
    platform: Arc<dyn VideoPlatform>,
    throttle: Arc<dyn Throttle>,
    max_pages: usize,
    requests: usize,
}

impl CatalogResolver {
    pub fn new(platform: Arc<dyn VideoPlatform>, throttle: Arc<dyn Throttle>, max_pages: usize) -> Self {
        Self {
            platform,
            throttle,
            max_pages: max_pages.max(1),
            requests: 0,
        }
    }

    /// Pause before every request but the first
    async fn pace(&mut self) {
        if self.requests > 0 {
            self.throttle.pause().await;
        }
        self.requests += 1;
    }

    /// Channel listings owning the seed videos, deduplicated in first-seen order.
    ///
    /// Seeds are looked up in batches of at most [`MAX_BATCH_SIZE`]. A failed
    /// batch is counted and skipped.
    pub async fn resolve_playlist_ids(
        &mut self,
        seeds: &[VideoId],
        tally: &mut FailureTally,
    ) -> Vec<ChannelListingId> {
        let mut seen = HashSet::new();
        let mut listing_ids = Vec::new();

        for (batch_index, batch) in seeds.chunks(MAX_BATCH_SIZE).enumerate() {
            self.pace().await;

            let items = match self.platform.video_details(batch).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("⚠️ Seed batch {} ({} ids) failed: {}", batch_index + 1, batch.len(), e);
                    tally.record(FailureStage::SeedBatch);
                    continue;
                }
            };

            for item in &items {
                let channel_id = match item.channel_id() {
                    Ok(channel_id) => channel_id,
                    Err(e) => {
                        warn!("Skipping seed item: {}", e);
                        tally.record(FailureStage::SeedItem);
                        continue;
                    }
                };

                match ChannelListingId::from_channel_id(channel_id) {
                    Some(listing_id) => {
                        if seen.insert(listing_id.clone()) {
                            debug!("Channel {} -> listing {}", channel_id, listing_id);
                            listing_ids.push(listing_id);
                        }
                    }
                    None => {
                        warn!("Channel id {} has no derivable uploads listing, skipping", channel_id);
                        tally.record(FailureStage::SeedItem);
                    }
                }
            }
        }

        info!("📺 Resolved {} channel listing(s) from {} seed(s)", listing_ids.len(), seeds.len());
        listing_ids
    }

    /// Every entry of every listing, following continuation tokens.
    ///
    /// Entries are deduplicated by video id across listings. A failed page ends
    /// that listing (no token to continue from) but keeps what was collected.
    pub async fn list_entries(
        &mut self,
        listing_ids: &[ChannelListingId],
        tally: &mut FailureTally,
    ) -> Vec<PlaylistEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for listing_id in listing_ids {
            let mut page_token: Option<String> = None;
            let mut pages = 0;

            loop {
                if pages >= self.max_pages {
                    warn!(
                        "⚠️ Listing {} still had pages after {} requests, stopping",
                        listing_id, self.max_pages
                    );
                    break;
                }
                self.pace().await;
                pages += 1;

                let page = match self.platform.playlist_page(listing_id, page_token.as_deref()).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("⚠️ Page {} of listing {} failed: {}", pages, listing_id, e);
                        tally.record(FailureStage::ListingPage);
                        break;
                    }
                };

                if page.malformed_items > 0 {
                    warn!(
                        "Listing {} page {}: {} item(s) without a video id",
                        listing_id, pages, page.malformed_items
                    );
                    tally.record_many(FailureStage::ListingItem, page.malformed_items);
                }

                let count = page.entries.len();
                for entry in page.entries {
                    if seen.insert(entry.video_id.clone()) {
                        entries.push(entry);
                    }
                }
                debug!("Listing {} page {}: {} entries", listing_id, pages, count);

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
        }

        entries
    }

    /// Seed ids to the deduplicated catalog, optionally filtered by title
    pub async fn resolve(
        &mut self,
        seeds: &[VideoId],
        title_filter: Option<&TitleFilter>,
        tally: &mut FailureTally,
    ) -> Vec<VideoId> {
        let listing_ids = self.resolve_playlist_ids(seeds, tally).await;
        let entries = self.list_entries(&listing_ids, tally).await;
        let total = entries.len();

        let ids: Vec<VideoId> = entries
            .into_iter()
            .filter(|entry| title_filter.map_or(true, |f| f.matches(&entry.title)))
            .map(|entry| entry.video_id)
            .collect();

        match title_filter {
            Some(filter) => info!(
                "🔍 {} of {} videos match title filter \"{}\"",
                ids.len(),
                total,
                filter.needle()
            ),
            None => info!("🔍 Found {} videos", ids.len()),
        }

        ids
    }
}
