use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keywords::ScoreRow;

/// Opaque identifier of a video on the platform
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for VideoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a channel's "all uploads" listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelListingId(String);

impl ChannelListingId {
    /// Derive the uploads listing from a channel id (`UCxxxx` -> `UUxxxx`).
    ///
    /// Purely syntactic: only ids whose second character is `C` are rewritten.
    /// Other shapes yield `None` and are skipped by the caller.
    pub fn from_channel_id(channel_id: &str) -> Option<Self> {
        let mut chars = channel_id.chars();
        let first = chars.next()?;
        match chars.next() {
            Some('C') => {
                let rest = chars.as_str();
                Some(Self(format!("{}U{}", first, rest)))
            }
            _ => None,
        }
    }

    /// Wrap an already-known listing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured details of one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    pub title: String,
    pub published_date: NaiveDate,
    pub duration_seconds: u64,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

/// Plain subtitle text for one video; empty when no captions were found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub id: VideoId,
    pub text: String,
}

/// One row of the outer join of details and subtitles
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub id: VideoId,
    pub video: Option<VideoRecord>,
    pub subtitles: Option<SubtitleRecord>,
}

impl MergedRecord {
    /// Subtitle text, empty when the subtitle side is missing
    pub fn text(&self) -> &str {
        self.subtitles.as_ref().map(|s| s.text.as_str()).unwrap_or("")
    }

    /// Duration used for rate normalization; 0 when details are missing
    pub fn duration_seconds(&self) -> u64 {
        self.video.as_ref().map(|v| v.duration_seconds).unwrap_or(0)
    }
}

/// Terminal row: merged data plus per-category scores
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub merged: MergedRecord,
    pub scores: ScoreRow,
    pub primary_category: String,
}
