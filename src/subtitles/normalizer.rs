use std::sync::Arc;
use tracing::{debug, info, warn};

use super::CaptionSource;
use crate::error::{FailureStage, FailureTally};
use crate::records::{SubtitleRecord, VideoId};
use crate::throttle::Throttle;

/// Resolves plain subtitle text for videos with a manual-over-auto language policy
pub struct SubtitleNormalizer {
    source: Arc<dyn CaptionSource>,
    throttle: Arc<dyn Throttle>,
    languages: Vec<String>,
}

impl SubtitleNormalizer {
    pub fn new(source: Arc<dyn CaptionSource>, throttle: Arc<dyn Throttle>, languages: Vec<String>) -> Self {
        Self {
            source,
            throttle,
            languages,
        }
    }

    /// Subtitle text for one video.
    ///
    /// Never fails: missing captions, unsupported encodings and fetch errors
    /// all produce an empty string. Fetch errors are counted in `tally`.
    pub async fn resolve_subtitle_text(&self, video_id: &VideoId, tally: &mut FailureTally) -> String {
        let listing = match self.source.list_tracks(video_id).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("⚠️ Could not list captions for {}: {}", video_id, e);
                tally.record(FailureStage::Caption);
                return String::new();
            }
        };

        let Some(selection) = listing.select(self.languages.as_slice()) else {
            info!("No subtitles found for {} in [{}]", video_id, self.languages.join(", "));
            return String::new();
        };

        let Some((track, format)) = selection.preferred_track() else {
            warn!(
                "No supported caption encoding for {} ({} {})",
                video_id, selection.language, selection.kind
            );
            return String::new();
        };

        debug!(
            "Using {} {} captions ({}) for {}",
            selection.language, selection.kind, format, video_id
        );

        match self.source.download(track, format).await {
            Ok(payload) => payload.extract_text(),
            Err(e) => {
                warn!("⚠️ Subtitle download failed for {}: {}", video_id, e);
                tally.record(FailureStage::Caption);
                String::new()
            }
        }
    }

    /// One record per requested id, in request order, pausing between videos
    pub async fn extract_subtitles(&self, video_ids: &[VideoId], tally: &mut FailureTally) -> Vec<SubtitleRecord> {
        let mut records = Vec::with_capacity(video_ids.len());

        for (index, video_id) in video_ids.iter().enumerate() {
            if index > 0 {
                self.throttle.pause().await;
            }
            let text = self.resolve_subtitle_text(video_id, tally).await;
            debug!("📝 {}/{} {}: {} chars", index + 1, video_ids.len(), video_id, text.chars().count());
            records.push(SubtitleRecord {
                id: video_id.clone(),
                text,
            });
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalyzerError, Result};
    use crate::subtitles::{CaptionFormat, CaptionListing, CaptionPayload, CaptionTrack};
    use crate::throttle::{CountingThrottle, NoThrottle};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves listings keyed by video id and payloads keyed by track URL
    #[derive(Default)]
    struct FakeCaptions {
        listings: HashMap<String, CaptionListing>,
        bodies: HashMap<String, String>,
    }

    #[async_trait]
    impl CaptionSource for FakeCaptions {
        async fn list_tracks(&self, video_id: &VideoId) -> Result<CaptionListing> {
            self.listings
                .get(video_id.as_str())
                .cloned()
                .ok_or_else(|| AnalyzerError::TransientFetch(format!("yt-dlp failed for {}", video_id)))
        }

        async fn download(&self, track: &CaptionTrack, format: CaptionFormat) -> Result<CaptionPayload> {
            let url = track.url.clone().unwrap_or_default();
            let body = self
                .bodies
                .get(&url)
                .ok_or_else(|| AnalyzerError::TransientFetch(format!("404 {}", url)))?;
            CaptionPayload::from_body(format, body)
        }
    }

    fn normalizer(source: FakeCaptions, languages: &[&str]) -> SubtitleNormalizer {
        SubtitleNormalizer::new(
            Arc::new(source),
            Arc::new(NoThrottle),
            languages.iter().map(|l| l.to_string()).collect(),
        )
    }

    fn json3(text: &str) -> String {
        serde_json::json!({ "events": [{ "segs": [{ "utf8": text }] }] }).to_string()
    }

    #[tokio::test]
    async fn test_auto_track_of_higher_priority_language_wins() {
        let mut source = FakeCaptions::default();
        let mut listing = CaptionListing::default();
        listing.automatic.insert("ja".into(), vec![CaptionTrack::new("json3", "auto-ja")]);
        listing.manual.insert("en".into(), vec![CaptionTrack::new("json3", "manual-en")]);
        source.listings.insert("v1".into(), listing);
        source.bodies.insert("auto-ja".into(), json3("自動字幕"));
        source.bodies.insert("manual-en".into(), json3("manual english"));

        let normalizer = normalizer(source, &["ja", "en"]);
        let mut tally = FailureTally::new();
        let text = normalizer.resolve_subtitle_text(&VideoId::from("v1"), &mut tally).await;

        assert_eq!(text, "自動字幕");
        assert!(tally.is_empty());
    }

    #[tokio::test]
    async fn test_timed_text_track() {
        let mut source = FakeCaptions::default();
        let mut listing = CaptionListing::default();
        listing.manual.insert("ja".into(), vec![CaptionTrack::new("srt", "srt-ja")]);
        source.listings.insert("v1".into(), listing);
        source
            .bodies
            .insert("srt-ja".into(), "1\n00:00:00,000 --> 00:00:01,000\nHello\n\n2\n00:00:01,000 --> 00:00:02,000\nWorld\n".into());

        let normalizer = normalizer(source, &["ja"]);
        let text = normalizer
            .resolve_subtitle_text(&VideoId::from("v1"), &mut FailureTally::new())
            .await;
        assert_eq!(text, "Hello World");
    }

    #[tokio::test]
    async fn test_every_video_gets_a_record() {
        let mut source = FakeCaptions::default();
        let mut listing = CaptionListing::default();
        listing.manual.insert("ja".into(), vec![CaptionTrack::new("json3", "broken-url")]);
        source.listings.insert("download-fails".into(), listing);
        source.listings.insert("no-captions".into(), CaptionListing::default());

        let normalizer = normalizer(source, &["ja"]);
        let ids: Vec<VideoId> = ["download-fails", "no-captions", "listing-fails"]
            .into_iter()
            .map(VideoId::from)
            .collect();
        let mut tally = FailureTally::new();
        let records = normalizer.extract_subtitles(&ids, &mut tally).await;

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.text.is_empty()));
        assert_eq!(records[2].id.as_str(), "listing-fails");
        assert_eq!(tally.count(FailureStage::Caption), 2);
    }

    #[tokio::test]
    async fn test_pauses_between_videos_only() {
        let throttle = Arc::new(CountingThrottle::default());
        let normalizer = SubtitleNormalizer::new(Arc::new(FakeCaptions::default()), throttle.clone(), vec!["ja".into()]);
        let ids: Vec<VideoId> = ["a", "b", "c"].into_iter().map(VideoId::from).collect();

        let records = normalizer.extract_subtitles(&ids, &mut FailureTally::new()).await;

        assert_eq!(records.len(), 3);
        assert_eq!(throttle.pauses(), 2);
    }
}
