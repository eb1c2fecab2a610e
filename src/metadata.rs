use chrono::{DateTime, NaiveDate};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::duration::parse_duration;
use crate::error::{AnalyzerError, FailureStage, FailureTally, Result};
use crate::records::{VideoId, VideoRecord};
use crate::throttle::Throttle;
use crate::youtube::{VideoDetails, VideoPlatform, MAX_BATCH_SIZE};

/// Day-precision publish date from an RFC 3339 timestamp.
///
/// Falls back to the leading `YYYY-MM-DD` when the rest does not parse.
pub fn parse_published_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.date_naive());
    }
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| AnalyzerError::MalformedResponse(format!("unparsable publishedAt {:?}", raw)))
}

/// Batch detail lookup producing one [`VideoRecord`] per returned video
pub struct MetadataFetcher {
    platform: Arc<dyn VideoPlatform>,
    throttle: Arc<dyn Throttle>,
}

impl MetadataFetcher {
    pub fn new(platform: Arc<dyn VideoPlatform>, throttle: Arc<dyn Throttle>) -> Self {
        Self { platform, throttle }
    }

    /// Convert validated details into a record.
    ///
    /// A malformed duration is not fatal: the record keeps `duration_seconds = 0`
    /// and the anomaly is counted.
    fn build_record(details: VideoDetails, tally: &mut FailureTally) -> Result<VideoRecord> {
        let published_date = parse_published_date(&details.published_at)?;

        let duration_seconds = match details.duration.as_deref().map(parse_duration) {
            Some(Ok(seconds)) => seconds,
            Some(Err(e)) => {
                warn!("⚠️ {}: {}, using 0s", details.id, e);
                tally.record(FailureStage::Duration);
                0
            }
            None => {
                warn!("⚠️ {}: no contentDetails.duration, using 0s", details.id);
                tally.record(FailureStage::Duration);
                0
            }
        };

        Ok(VideoRecord {
            id: details.id,
            title: details.title,
            published_date,
            duration_seconds,
            views: details.views,
            likes: details.likes,
            comments: details.comments,
        })
    }

    /// Details for `video_ids`, at most [`MAX_BATCH_SIZE`] per request.
    ///
    /// Ids the platform omits yield no record. Failed batches and malformed
    /// items are counted and skipped. Duplicates keep the first record.
    pub async fn fetch_details(&self, video_ids: &[VideoId], tally: &mut FailureTally) -> Vec<VideoRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(video_ids.len());
        let batches = video_ids.len().div_ceil(MAX_BATCH_SIZE);

        for (index, batch) in video_ids.chunks(MAX_BATCH_SIZE).enumerate() {
            if index > 0 {
                self.throttle.pause().await;
            }

            let items = match self.platform.video_details(batch).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("⚠️ Detail batch {}/{} failed: {}", index + 1, batches, e);
                    tally.record(FailureStage::DetailBatch);
                    continue;
                }
            };
            debug!("Detail batch {}/{}: {} of {} returned", index + 1, batches, items.len(), batch.len());

            for item in items {
                let record = item
                    .into_details()
                    .and_then(|details| Self::build_record(details, tally));

                match record {
                    Ok(record) => {
                        if seen.insert(record.id.clone()) {
                            records.push(record);
                        }
                    }
                    Err(e) => {
                        warn!("Skipping detail item: {}", e);
                        tally.record(FailureStage::DetailItem);
                    }
                }
            }
        }

        info!("📊 Fetched details for {} of {} videos", records.len(), video_ids.len());
        records
    }
}
