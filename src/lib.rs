//! YouTube Channel Analyzer
//!
//! Expands seed videos into their channels' full catalogs, collects details and
//! subtitle text for every video, and scores each one against keyword categories
//! normalized by duration.

pub mod catalog;
pub mod config;
pub mod duration;
pub mod error;
pub mod export;
pub mod keywords;
pub mod metadata;
pub mod pipeline;
pub mod records;
pub mod subtitles;
pub mod throttle;
pub mod youtube;

// Re-export main types for easy access
pub use crate::catalog::{CatalogResolver, TitleFilter};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::duration::parse_duration;
pub use crate::error::{AnalyzerError, FailureStage, FailureTally, Result};
pub use crate::export::CsvExporter;
pub use crate::keywords::{KeywordCategory, KeywordDictionary, KeywordScorer, ScoreRow};
pub use crate::metadata::MetadataFetcher;
pub use crate::pipeline::{merge_records, PipelineOrchestrator, RunSummary};
pub use crate::records::{ChannelListingId, ClassifiedRecord, MergedRecord, SubtitleRecord, VideoId, VideoRecord};
pub use crate::subtitles::{CaptionSource, SubtitleNormalizer, YtDlpCaptionSource};
pub use crate::throttle::{JitterThrottle, NoThrottle, Throttle, Throttles};
pub use crate::youtube::{VideoPlatform, YouTubeClient};
