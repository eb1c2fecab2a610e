//! Subtitle retrieval and normalization
//!
//! Caption tracks are listed per language, split into manual and
//! auto-generated sets, and the chosen track is reduced to plain text.

pub mod formats;
pub mod normalizer;
pub mod ytdlp;

pub use formats::{CaptionFormat, CaptionPayload, Json3Document, SubtitleFormatter};
pub use normalizer::SubtitleNormalizer;
pub use ytdlp::YtDlpCaptionSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::records::VideoId;

/// Who produced a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    /// Authored by a person
    Manual,
    /// Automatic speech recognition
    Automatic,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Manual => f.write_str("manual"),
            TrackKind::Automatic => f.write_str("auto-generated"),
        }
    }
}

/// One downloadable encoding of a caption track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Encoding as reported by the source (`json3`, `srt`, `vtt`, `srv3`, ...)
    pub ext: String,
    pub url: Option<String>,
    pub name: Option<String>,
}

impl CaptionTrack {
    pub fn new(ext: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            ext: ext.into(),
            url: Some(url.into()),
            name: None,
        }
    }

    /// Supported encoding of this track, if any
    pub fn format(&self) -> Option<CaptionFormat> {
        CaptionFormat::from_ext(&self.ext)
    }
}

/// Caption tracks available for one video, keyed by language code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionListing {
    pub manual: HashMap<String, Vec<CaptionTrack>>,
    pub automatic: HashMap<String, Vec<CaptionTrack>>,
}

/// Track set chosen for a video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSelection<'a> {
    pub language: &'a str,
    pub kind: TrackKind,
    pub tracks: &'a [CaptionTrack],
}

impl<'a> TrackSelection<'a> {
    /// Best supported encoding among the offered tracks
    pub fn preferred_track(&self) -> Option<(&'a CaptionTrack, CaptionFormat)> {
        CaptionFormat::PREFERENCE.iter().find_map(|wanted| {
            self.tracks
                .iter()
                .find(|track| track.format() == Some(*wanted))
                .map(|track| (track, *wanted))
        })
    }
}

impl CaptionListing {
    pub fn is_empty(&self) -> bool {
        self.manual.values().all(Vec::is_empty) && self.automatic.values().all(Vec::is_empty)
    }

    fn tracks(&self, kind: TrackKind, language: &str) -> Option<&[CaptionTrack]> {
        let map = match kind {
            TrackKind::Manual => &self.manual,
            TrackKind::Automatic => &self.automatic,
        };
        map.get(language).map(Vec::as_slice).filter(|tracks| !tracks.is_empty())
    }

    /// Walk `languages` in priority order and stop at the first language
    /// offering any track: its manual track when present, otherwise its
    /// auto-generated one. A manual track in a lower-priority language never
    /// overrides an auto-generated track in a higher-priority one.
    pub fn select<'a, S: AsRef<str>>(&'a self, languages: &'a [S]) -> Option<TrackSelection<'a>> {
        languages.iter().find_map(|language| {
            let language = language.as_ref();
            [TrackKind::Manual, TrackKind::Automatic]
                .into_iter()
                .find_map(|kind| {
                    self.tracks(kind, language).map(|tracks| TrackSelection {
                        language,
                        kind,
                        tracks,
                    })
                })
        })
    }
}

/// Per-video caption retrieval
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List manual and auto-generated tracks for a video
    async fn list_tracks(&self, video_id: &VideoId) -> Result<CaptionListing>;

    /// Download one track in the given encoding
    async fn download(&self, track: &CaptionTrack, format: CaptionFormat) -> Result<CaptionPayload>;
}
