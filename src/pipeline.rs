use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::catalog::{CatalogResolver, TitleFilter};
use crate::config::Config;
use crate::error::{FailureTally, Result};
use crate::export::CsvExporter;
use crate::keywords::{KeywordDictionary, KeywordScorer};
use crate::metadata::MetadataFetcher;
use crate::records::{ClassifiedRecord, MergedRecord, SubtitleRecord, VideoId, VideoRecord};
use crate::subtitles::{CaptionSource, SubtitleNormalizer, YtDlpCaptionSource};
use crate::throttle::Throttles;
use crate::youtube::{VideoPlatform, YouTubeClient};

/// Rows echoed to the log after a run
const SUMMARY_ROWS: usize = 10;

const DEBUG_MERGE_FILE: &str = "debug_merged_data.csv";

/// Outcome of one full run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub videos_found: usize,
    pub details_fetched: usize,
    pub subtitles_found: usize,
    pub rows: usize,
    pub failures: FailureTally,
    pub output_path: PathBuf,
    pub debug_path: Option<PathBuf>,
    pub total_time: Duration,
}

/// Full outer join of details and subtitles on video id, ordered by id.
///
/// Every id from either side yields exactly one row. The first record wins
/// when a side repeats an id.
pub fn merge_records(videos: Vec<VideoRecord>, subtitles: Vec<SubtitleRecord>) -> Vec<MergedRecord> {
    let mut rows: BTreeMap<VideoId, MergedRecord> = BTreeMap::new();

    for video in videos {
        let row = rows.entry(video.id.clone()).or_insert_with(|| MergedRecord {
            id: video.id.clone(),
            video: None,
            subtitles: None,
        });
        if row.video.is_none() {
            row.video = Some(video);
        }
    }

    for subtitle in subtitles {
        let row = rows.entry(subtitle.id.clone()).or_insert_with(|| MergedRecord {
            id: subtitle.id.clone(),
            video: None,
            subtitles: None,
        });
        if row.subtitles.is_none() {
            row.subtitles = Some(subtitle);
        }
    }

    rows.into_values().collect()
}

/// Sequences catalog resolution, detail and subtitle retrieval, scoring and export
pub struct PipelineOrchestrator {
    config: Config,
    platform: Arc<dyn VideoPlatform>,
    captions: Arc<dyn CaptionSource>,
    scorer: KeywordScorer,
    throttles: Throttles,
}

impl PipelineOrchestrator {
    pub fn new(
        config: Config,
        platform: Arc<dyn VideoPlatform>,
        captions: Arc<dyn CaptionSource>,
        dictionary: KeywordDictionary,
    ) -> Self {
        let throttles = Throttles::from_config(&config.throttle);
        let scorer = KeywordScorer::new(Arc::new(dictionary), config.pipeline.threshold);
        Self {
            config,
            platform,
            captions,
            scorer,
            throttles,
        }
    }

    /// Replace the configured pacing, e.g. to run without delays
    pub fn with_throttles(mut self, throttles: Throttles) -> Self {
        self.throttles = throttles;
        self
    }

    /// Wire the production YouTube client, yt-dlp caption source and keyword file
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let platform = Arc::new(YouTubeClient::new(&config.api)?);
        let captions = Arc::new(YtDlpCaptionSource::new(&config.subtitles)?);

        let dictionary = match &config.keywords.categories_file {
            Some(path) if path.exists() => KeywordDictionary::from_file(path).await?,
            Some(path) => {
                warn!("Keyword file not found: {}, using default categories", path.display());
                KeywordDictionary::new()
            }
            None => KeywordDictionary::new(),
        };

        let stats = dictionary.get_stats();
        info!(
            "📚 Keyword dictionary loaded: {} categories, {} keywords",
            stats.total_categories, stats.total_keywords
        );

        Ok(Self::new(config, platform, captions, dictionary))
    }

    /// Score merged rows; subtitle-only rows are scored with zero duration
    pub fn classify_records(&self, merged: Vec<MergedRecord>) -> Vec<ClassifiedRecord> {
        merged
            .into_iter()
            .map(|merged| {
                let scores = self.scorer.score(merged.text(), merged.duration_seconds());
                let primary_category = KeywordScorer::primary_category(&scores);
                ClassifiedRecord {
                    merged,
                    scores,
                    primary_category,
                }
            })
            .collect()
    }

    /// Run the whole pipeline once.
    ///
    /// Only configuration problems and export I/O abort the run; every
    /// per-batch, per-page and per-video failure is counted in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        self.config.validate()?;

        let mut failures = FailureTally::new();
        let pipeline = &self.config.pipeline;

        info!("🚀 Starting channel analysis...");

        let seeds: Vec<VideoId> = pipeline
            .seed_video_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(VideoId::from)
            .collect();
        let title_filter = pipeline.title_filter.clone().and_then(|f| TitleFilter::new(f));

        let mut resolver = CatalogResolver::new(
            Arc::clone(&self.platform),
            Arc::clone(&self.throttles.listing),
            pipeline.max_pages_per_listing,
        );
        let video_ids = resolver.resolve(&seeds, title_filter.as_ref(), &mut failures).await;
        if video_ids.is_empty() {
            warn!("No videos found for {} seed(s)", seeds.len());
        }

        info!("📊 Fetching details for {} videos...", video_ids.len());
        let fetcher = MetadataFetcher::new(Arc::clone(&self.platform), Arc::clone(&self.throttles.detail));
        let videos = fetcher.fetch_details(&video_ids, &mut failures).await;
        let details_fetched = videos.len();

        info!(
            "📝 Fetching subtitles for {} videos [{}]...",
            video_ids.len(),
            pipeline.subtitle_languages.join(", ")
        );
        let normalizer = SubtitleNormalizer::new(
            Arc::clone(&self.captions),
            Arc::clone(&self.throttles.subtitle),
            pipeline.subtitle_languages.clone(),
        );
        let subtitles = normalizer.extract_subtitles(&video_ids, &mut failures).await;
        let subtitles_found = subtitles.iter().filter(|s| !s.text.is_empty()).count();

        let merged = merge_records(videos, subtitles);

        let output = &self.config.output;
        let exporter = CsvExporter::new(output.output_dir.clone(), self.config.subtitles.watch_base_url.clone());
        let debug_path = if output.debug {
            Some(exporter.write_merged(DEBUG_MERGE_FILE, &merged)?)
        } else {
            None
        };

        let classified = self.classify_records(merged);
        let categories: Vec<String> = self.scorer.dictionary().names().map(String::from).collect();
        let output_path = exporter.write_classified(&output.file_name, &categories, &classified)?;

        self.log_preview(&classified);

        let summary = RunSummary {
            videos_found: video_ids.len(),
            details_fetched,
            subtitles_found,
            rows: classified.len(),
            failures,
            output_path,
            debug_path,
            total_time: start_time.elapsed(),
        };

        if summary.failures.is_empty() {
            info!("✅ Analysis complete: {} rows in {:.2}s", summary.rows, summary.total_time.as_secs_f64());
        } else {
            warn!(
                "⚠️ Analysis complete with skipped work ({}): {} rows in {:.2}s",
                summary.failures,
                summary.rows,
                summary.total_time.as_secs_f64()
            );
        }

        Ok(summary)
    }

    fn log_preview(&self, classified: &[ClassifiedRecord]) {
        for record in classified.iter().take(SUMMARY_ROWS) {
            let title = record.merged.video.as_ref().map(|v| v.title.as_str()).unwrap_or("");
            let rates: Vec<String> = record
                .scores
                .scores
                .iter()
                .map(|s| format!("{}={:.2}", s.name, s.per_minute))
                .collect();
            info!(
                "  {} | {} | {} | {}",
                record.merged.id,
                title,
                rates.join(" "),
                record.primary_category
            );
        }
        if classified.len() > SUMMARY_ROWS {
            info!("  ... {} more rows", classified.len() - SUMMARY_ROWS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn video(id: &str, duration_seconds: u64) -> VideoRecord {
        VideoRecord {
            id: VideoId::from(id),
            title: format!("title {}", id),
            published_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            duration_seconds,
            views: 0,
            likes: 0,
            comments: 0,
        }
    }

    fn subtitle(id: &str, text: &str) -> SubtitleRecord {
        SubtitleRecord {
            id: VideoId::from(id),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_merge_is_full_outer_join() {
        let merged = merge_records(
            vec![video("b", 60), video("a", 60)],
            vec![subtitle("a", "x"), subtitle("c", "only subtitles")],
        );

        let ids: Vec<&str> = merged.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(merged[0].video.is_some() && merged[0].subtitles.is_some());
        assert!(merged[1].subtitles.is_none());
        assert_eq!(merged[1].text(), "");
        assert!(merged[2].video.is_none());
        assert_eq!(merged[2].duration_seconds(), 0);
    }

    #[test]
    fn test_merge_first_record_wins() {
        let merged = merge_records(
            vec![video("a", 60), video("a", 999)],
            vec![subtitle("a", "first"), subtitle("a", "second")],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].duration_seconds(), 60);
        assert_eq!(merged[0].text(), "first");
    }
}
