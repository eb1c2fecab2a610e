use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{AnalyzerError, Result};

/// Caption encodings the normalizer can turn into plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptionFormat {
    /// YouTube timed JSON events
    Json3,
    /// SubRip line format
    Srt,
    /// WebVTT line format
    Vtt,
}

impl CaptionFormat {
    /// Preference order when a track is offered in several encodings
    pub const PREFERENCE: [CaptionFormat; 3] = [CaptionFormat::Json3, CaptionFormat::Srt, CaptionFormat::Vtt];

    /// Map a file extension as reported by the caption source
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "json3" => Some(CaptionFormat::Json3),
            "srt" => Some(CaptionFormat::Srt),
            "vtt" => Some(CaptionFormat::Vtt),
            _ => None,
        }
    }

    pub fn ext(&self) -> &'static str {
        match self {
            CaptionFormat::Json3 => "json3",
            CaptionFormat::Srt => "srt",
            CaptionFormat::Vtt => "vtt",
        }
    }
}

impl fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

/// A single text segment inside a JSON event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json3Segment {
    pub utf8: Option<String>,
}

/// A timed JSON event; `segs` is absent for window/style events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json3Event {
    pub segs: Option<Vec<Json3Segment>>,
}

/// Parsed timed JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json3Document {
    pub events: Vec<Json3Event>,
}

impl Json3Document {
    /// Build from either `{"events": [...]}` or a bare event array.
    ///
    /// Unknown shapes and malformed events or segments are dropped rather than rejected.
    pub fn from_value(value: &Value) -> Self {
        let events: &[Value] = match value {
            Value::Array(events) => events.as_slice(),
            Value::Object(map) => match map.get("events") {
                Some(Value::Array(events)) => events.as_slice(),
                _ => &[],
            },
            _ => &[],
        };

        let events = events
            .iter()
            .map(|event| Json3Event {
                segs: event.get("segs").and_then(Value::as_array).map(|segs| {
                    segs.iter()
                        .map(|seg| Json3Segment {
                            utf8: seg.get("utf8").and_then(Value::as_str).map(String::from),
                        })
                        .collect()
                }),
            })
            .collect();

        Self { events }
    }

    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| AnalyzerError::MalformedResponse(format!("json3 captions: {}", e)))?;
        Ok(Self::from_value(&value))
    }
}

/// Caption payload tagged by encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionPayload {
    SubRip(String),
    WebVtt(String),
    Json3(Json3Document),
}

impl CaptionPayload {
    /// Wrap a downloaded body in the variant for `format`
    pub fn from_body(format: CaptionFormat, body: &str) -> Result<Self> {
        Ok(match format {
            CaptionFormat::Srt => CaptionPayload::SubRip(body.to_string()),
            CaptionFormat::Vtt => CaptionPayload::WebVtt(body.to_string()),
            CaptionFormat::Json3 => CaptionPayload::Json3(Json3Document::parse(body)?),
        })
    }

    pub fn format(&self) -> CaptionFormat {
        match self {
            CaptionPayload::SubRip(_) => CaptionFormat::Srt,
            CaptionPayload::WebVtt(_) => CaptionFormat::Vtt,
            CaptionPayload::Json3(_) => CaptionFormat::Json3,
        }
    }

    /// Timestamp-free plain text
    pub fn extract_text(&self) -> String {
        match self {
            CaptionPayload::SubRip(text) | CaptionPayload::WebVtt(text) => {
                SubtitleFormatter::timed_text_to_plain(text)
            }
            CaptionPayload::Json3(doc) => SubtitleFormatter::json3_to_plain(doc),
        }
    }
}

fn sequence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("sequence pattern is valid"))
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // SRT always carries hours; VTT may omit them
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:\d{2,}:)?\d{2}:\d{2}[,.]\d{3}\s+-->").expect("timestamp pattern is valid")
    })
}

const HEADER_PREFIXES: [&str; 6] = ["WEBVTT", "NOTE", "STYLE", "REGION", "Kind:", "Language:"];

/// Caption text utilities
pub struct SubtitleFormatter;

impl SubtitleFormatter {
    /// Whether a trimmed line of SRT/VTT carries no spoken text
    pub fn is_noise_line(line: &str) -> bool {
        line.is_empty()
            || sequence_pattern().is_match(line)
            || timestamp_pattern().is_match(line)
            || HEADER_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
    }

    /// Strip sequence numbers, timestamp ranges, headers and blank lines,
    /// then join what remains with single spaces.
    pub fn timed_text_to_plain(text: &str) -> String {
        text.trim_start_matches('\u{feff}')
            .lines()
            .map(str::trim)
            .filter(|line| !Self::is_noise_line(line))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Join segment texts in event order; newlines become spaces
    pub fn json3_to_plain(doc: &Json3Document) -> String {
        let parts: Vec<&str> = doc
            .events
            .iter()
            .filter_map(|event| event.segs.as_ref())
            .flatten()
            .filter_map(|seg| seg.utf8.as_deref())
            .collect();

        parts.join(" ").replace('\n', " ").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_srt_to_plain() {
        let srt = ["1", "00:00:00,000 --> 00:00:01,000", "Hello", "", "2", "00:00:01,000 --> 00:00:02,000", "World"]
            .join("\n");
        assert_eq!(SubtitleFormatter::timed_text_to_plain(&srt), "Hello World");
    }

    #[test]
    fn test_vtt_to_plain() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: ja\n\nNOTE generated\n\n\
                   00:00:01.000 --> 00:00:03.500 align:start position:0%\n医師の診断\n\n\
                   00:04.000 --> 00:05.000\n  重症でした  \n";
        assert_eq!(SubtitleFormatter::timed_text_to_plain(vtt), "医師の診断 重症でした");
    }

    #[test]
    fn test_text_lines_with_digits_are_kept() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\n2024年 100人\n";
        assert_eq!(SubtitleFormatter::timed_text_to_plain(srt), "2024年 100人");
    }

    #[test]
    fn test_crlf_and_bom() {
        let srt = "\u{feff}1\r\n00:00:00,000 --> 00:00:01,000\r\nHi there\r\n";
        assert_eq!(SubtitleFormatter::timed_text_to_plain(srt), "Hi there");
    }

    #[test]
    fn test_json3_order_and_newlines() {
        let doc = Json3Document::from_value(&json!({
            "events": [
                { "tStartMs": 0, "segs": [{ "utf8": "first" }, { "utf8": "line\nbreak" }] },
                { "tStartMs": 10 },
                { "segs": [] },
                { "segs": [{ "utf8": "last" }, { "tOffsetMs": 5 }] }
            ]
        }));
        assert_eq!(SubtitleFormatter::json3_to_plain(&doc), "first line break last");
    }

    #[test]
    fn test_json3_bare_array_and_garbage() {
        let doc = Json3Document::from_value(&json!([{ "segs": [{ "utf8": " x " }] }]));
        assert_eq!(SubtitleFormatter::json3_to_plain(&doc), "x");

        let doc = Json3Document::from_value(&json!({ "events": "nope" }));
        assert_eq!(SubtitleFormatter::json3_to_plain(&doc), "");

        let doc = Json3Document::from_value(&json!([{ "segs": null }, { "segs": [{ "utf8": 5 }] }]));
        assert_eq!(SubtitleFormatter::json3_to_plain(&doc), "");
    }

    #[test]
    fn test_payload_dispatch() {
        let payload = CaptionPayload::from_body(CaptionFormat::Json3, r#"{"events":[{"segs":[{"utf8":"ok"}]}]}"#).unwrap();
        assert_eq!(payload.format(), CaptionFormat::Json3);
        assert_eq!(payload.extract_text(), "ok");

        assert!(CaptionPayload::from_body(CaptionFormat::Json3, "<xml/>").is_err());
        assert_eq!(CaptionFormat::from_ext("VTT"), Some(CaptionFormat::Vtt));
        assert_eq!(CaptionFormat::from_ext("srv3"), None);
    }
}
