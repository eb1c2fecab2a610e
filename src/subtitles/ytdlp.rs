use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{CaptionFormat, CaptionListing, CaptionPayload, CaptionSource, CaptionTrack};
use crate::config::SubtitleConfig;
use crate::error::{AnalyzerError, Result};
use crate::records::VideoId;

/// Subset of `yt-dlp --dump-single-json` needed for caption discovery
#[derive(Debug, Deserialize, Default)]
struct YtDlpInfo {
    #[serde(default)]
    subtitles: Option<HashMap<String, Vec<YtDlpTrack>>>,
    #[serde(default)]
    automatic_captions: Option<HashMap<String, Vec<YtDlpTrack>>>,
}

#[derive(Debug, Deserialize)]
struct YtDlpTrack {
    ext: Option<String>,
    url: Option<String>,
    name: Option<String>,
}

fn into_tracks(raw: Option<HashMap<String, Vec<YtDlpTrack>>>) -> HashMap<String, Vec<CaptionTrack>> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(language, tracks)| {
            let tracks = tracks
                .into_iter()
                .filter_map(|t| {
                    Some(CaptionTrack {
                        ext: t.ext?,
                        url: t.url,
                        name: t.name,
                    })
                })
                .collect();
            (language, tracks)
        })
        .collect()
}

/// Parse the info JSON printed by yt-dlp into a caption listing
pub fn parse_info_json(raw: &str) -> Result<CaptionListing> {
    let info: YtDlpInfo = serde_json::from_str(raw)
        .map_err(|e| AnalyzerError::MalformedResponse(format!("yt-dlp info JSON: {}", e)))?;

    Ok(CaptionListing {
        manual: into_tracks(info.subtitles),
        automatic: into_tracks(info.automatic_captions),
    })
}

/// Caption source backed by the `yt-dlp` executable plus direct track downloads.
///
/// Captions stay in memory; nothing is written to disk.
#[derive(Clone)]
pub struct YtDlpCaptionSource {
    program: PathBuf,
    watch_base_url: String,
    timeout: Duration,
    client: Client,
}

impl YtDlpCaptionSource {
    pub fn new(config: &SubtitleConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyzerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            program: config.ytdlp_path.clone(),
            watch_base_url: config.watch_base_url.clone(),
            timeout,
            client,
        })
    }

    pub fn watch_url(&self, video_id: &VideoId) -> String {
        format!("{}{}", self.watch_base_url, video_id)
    }

    /// Check that the executable runs at all
    pub async fn check_availability(&self) -> Result<String> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program).arg("--version").kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| AnalyzerError::TransientFetch("yt-dlp --version timed out".into()))??;

        if !output.status.success() {
            return Err(AnalyzerError::TransientFetch(format!(
                "{} --version exited with {}",
                self.program.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<CaptionListing> {
        let url = self.watch_url(video_id);
        debug!("Listing captions via {} for {}", self.program.display(), url);

        let mut command = Command::new(&self.program);
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg(&url)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                AnalyzerError::TransientFetch(format!(
                    "yt-dlp timed out after {}s for {}",
                    self.timeout.as_secs(),
                    video_id
                ))
            })?
            .map_err(|e| {
                AnalyzerError::TransientFetch(format!("could not run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalyzerError::TransientFetch(format!(
                "yt-dlp exited with {} for {}: {}",
                output.status,
                video_id,
                stderr.lines().last().unwrap_or("")
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        parse_info_json(&raw)
    }

    async fn download(&self, track: &CaptionTrack, format: CaptionFormat) -> Result<CaptionPayload> {
        let url = track
            .url
            .as_deref()
            .ok_or_else(|| AnalyzerError::MalformedResponse(format!("{} track without url", format)))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::TransientFetch(format!(
                "caption download returned {}",
                status
            )));
        }

        let body = response.text().await?;
        CaptionPayload::from_body(format, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info_json() {
        let raw = r#"{
            "id": "3jiUMCoLgzI",
            "subtitles": {
                "en": [
                    {"ext": "json3", "url": "https://example.test/en.json3"},
                    {"ext": "vtt", "url": "https://example.test/en.vtt", "name": "English"}
                ]
            },
            "automatic_captions": {
                "ja": [{"ext": "srv1", "url": "https://example.test/ja.srv1"}, {"url": "no-ext"}]
            }
        }"#;

        let listing = parse_info_json(raw).unwrap();
        assert_eq!(listing.manual["en"].len(), 2);
        assert_eq!(listing.manual["en"][1].name.as_deref(), Some("English"));
        assert_eq!(listing.automatic["ja"].len(), 1);
        assert_eq!(listing.automatic["ja"][0].format(), None);
    }

    #[test]
    fn test_parse_info_json_without_captions() {
        let listing = parse_info_json(r#"{"id": "x", "subtitles": null}"#).unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_parse_info_json_garbage() {
        assert!(matches!(
            parse_info_json("ERROR: Video unavailable"),
            Err(AnalyzerError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_executable_is_transient() {
        let source = YtDlpCaptionSource::new(&SubtitleConfig {
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp-binary"),
            timeout_seconds: 5,
            ..SubtitleConfig::default()
        })
        .unwrap();

        let result = source.list_tracks(&VideoId::from("abc")).await;
        assert!(matches!(result, Err(AnalyzerError::TransientFetch(_))));
    }

    #[test]
    fn test_watch_url() {
        let source = YtDlpCaptionSource::new(&SubtitleConfig::default()).unwrap();
        assert_eq!(
            source.watch_url(&VideoId::from("abc")),
            "https://www.youtube.com/watch?v=abc"
        );
    }
}
