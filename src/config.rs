use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{AnalyzerError, Result};

/// Configuration for the channel analyzer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// YouTube Data API settings
    pub api: ApiConfig,

    /// Seeds, language preference and scoring settings
    pub pipeline: PipelineConfig,

    /// Courtesy delays between external calls
    pub throttle: ThrottleConfig,

    /// Caption retrieval settings
    pub subtitles: SubtitleConfig,

    /// Keyword category settings
    pub keywords: KeywordConfig,

    /// Output and storage settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key for the YouTube Data API
    pub api_key: Option<String>,

    /// Base URL of the Data API
    pub base_url: String,

    /// Timeout for each API request (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed video identifiers used to discover channels
    pub seed_video_ids: Vec<String>,

    /// Only keep videos whose title contains this substring (case-sensitive)
    pub title_filter: Option<String>,

    /// Subtitle languages in priority order
    pub subtitle_languages: Vec<String>,

    /// Classification threshold. Accepted and carried, but no scoring rule reads it yet.
    pub threshold: f64,

    /// Upper bound on pages followed per channel listing
    pub max_pages_per_listing: usize,
}

/// Inclusive range for a randomized delay
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Disable all delays (tests, dry runs against mocks)
    pub enabled: bool,

    /// Delay between seed batches and listing pages
    pub listing_delay: DelayRange,

    /// Delay between detail batches
    pub detail_delay: DelayRange,

    /// Delay between per-video caption downloads
    pub subtitle_delay: DelayRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// yt-dlp executable used to list caption tracks
    pub ytdlp_path: PathBuf,

    /// Timeout for a single yt-dlp call or caption download (seconds)
    pub timeout_seconds: u64,

    /// Watch page prefix; the video id is appended
    pub watch_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeywordConfig {
    /// TOML file with `[[category]]` tables; built-in categories when unset
    pub categories_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub output_dir: PathBuf,

    /// Name of the classified table
    pub file_name: String,

    /// Also write the merged table before scoring
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed_video_ids: Vec::new(),
            title_filter: None,
            subtitle_languages: vec!["ja".to_string()],
            threshold: 0.5,
            max_pages_per_listing: 1000,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_delay: DelayRange::new(100, 200),
            detail_delay: DelayRange::new(100, 200),
            subtitle_delay: DelayRange::new(800, 1500),
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            timeout_seconds: 60,
            watch_base_url: "https://www.youtube.com/watch?v=".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            file_name: "video_analysis_result.csv".to_string(),
            debug: false,
        }
    }
}

/// Load `.env` from the working directory or its parents into the process environment.
///
/// Returns whether a file was loaded. A missing file is normal; an unreadable one
/// is logged and ignored.
pub fn load_dotenv() -> bool {
    report_dotenv(dotenvy::dotenv())
}

/// Same as [`load_dotenv`] for an explicit file
pub fn load_dotenv_from(path: &Path) -> bool {
    report_dotenv(dotenvy::from_path(path).map(|_| path.to_path_buf()))
}

fn report_dotenv(result: dotenvy::Result<PathBuf>) -> bool {
    match result {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            true
        }
        Err(e) if e.not_found() => {
            tracing::debug!("No .env file found");
            false
        }
        Err(e) => {
            tracing::warn!("⚠️ Ignoring unreadable .env file: {}", e);
            false
        }
    }
}

/// Split a comma separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from an explicit file or the default locations
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let config_paths = ["yt-analyzer.toml", "config/yt-analyzer.toml"];
        for path in &config_paths {
            let path = Path::new(path);
            if path.exists() {
                match Self::from_file(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {:#}", path.display(), e),
                }
            }
        }

        Err(anyhow::anyhow!("No configuration file found"))
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Overlay values from the process environment.
    ///
    /// Called once at startup; components only ever see the resulting `Config`.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("YOUTUBE_API_KEY") {
            self.api.api_key = Some(key.trim().to_string());
        }

        if let Some(ids) = lookup("VIDEO_IDS") {
            self.pipeline.seed_video_ids = split_list(&ids);
        }

        if let Some(filter) = lookup("TITLE_FILTER") {
            let filter = filter.trim();
            self.pipeline.title_filter = (!filter.is_empty()).then(|| filter.to_string());
        }

        if let Some(langs) = lookup("SUBTITLE_LANGS") {
            let langs = split_list(&langs);
            if !langs.is_empty() {
                self.pipeline.subtitle_languages = langs;
            }
        }

        if let Some(dir) = lookup("OUTPUT_DIR") {
            let dir = dir.trim();
            if !dir.is_empty() {
                self.output.output_dir = PathBuf::from(dir);
            }
        }

        if let Some(threshold) = lookup("THRESHOLD") {
            match threshold.trim().parse() {
                Ok(value) => self.pipeline.threshold = value,
                Err(_) => tracing::warn!("Ignoring invalid THRESHOLD value: {}", threshold),
            }
        }

        if let Some(debug) = lookup("DEBUG") {
            self.output.debug = debug.trim().eq_ignore_ascii_case("true");
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| AnalyzerError::Configuration(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration. Every failure here is fatal and happens before any request.
    pub fn validate(&self) -> Result<()> {
        match self.api.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {}
            _ => return Err(AnalyzerError::Configuration("YouTube API key is missing".into())),
        }

        if self.pipeline.seed_video_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(AnalyzerError::Configuration(
                "no seed video ids configured (VIDEO_IDS)".into(),
            ));
        }

        if self.pipeline.subtitle_languages.is_empty() {
            return Err(AnalyzerError::Configuration(
                "at least one subtitle language is required".into(),
            ));
        }

        if self.pipeline.max_pages_per_listing == 0 {
            return Err(AnalyzerError::Configuration(
                "max_pages_per_listing must be greater than 0".into(),
            ));
        }

        Url::parse(&self.api.base_url).map_err(|e| {
            AnalyzerError::Configuration(format!("invalid API base URL {}: {}", self.api.base_url, e))
        })?;

        for (name, range) in [
            ("listing_delay", self.throttle.listing_delay),
            ("detail_delay", self.throttle.detail_delay),
            ("subtitle_delay", self.throttle.subtitle_delay),
        ] {
            if range.min_ms > range.max_ms {
                return Err(AnalyzerError::Configuration(format!(
                    "{} min_ms ({}) exceeds max_ms ({})",
                    name, range.min_ms, range.max_ms
                )));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        let masked_key = self
            .api
            .api_key
            .as_deref()
            .map(|k| format!("{}…", k.chars().take(4).collect::<String>()))
            .unwrap_or_else(|| "<unset>".to_string());

        format!(
            "Channel Analyzer Configuration:\n\
            - API key: {}\n\
            - Seed videos: {}\n\
            - Title filter: {}\n\
            - Subtitle languages: {}\n\
            - Threshold: {} (not applied)\n\
            - Output directory: {}\n\
            - Throttling: {}",
            masked_key,
            self.pipeline.seed_video_ids.len(),
            self.pipeline.title_filter.as_deref().unwrap_or("<none>"),
            self.pipeline.subtitle_languages.join(", "),
            self.pipeline.threshold,
            self.output.output_dir.display(),
            self.throttle.enabled,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn with_seed_video_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pipeline.seed_video_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_title_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.pipeline.title_filter = Some(filter.into());
        self
    }

    pub fn with_subtitle_languages<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pipeline.subtitle_languages = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.output_dir = dir;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.output.debug = debug;
        self
    }

    pub fn enable_throttling(mut self, enable: bool) -> Self {
        self.config.throttle.enabled = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> Config {
        ConfigBuilder::new()
            .with_api_key("AIzaTestKey")
            .with_seed_video_ids(["SyibOFcjCHk"])
            .build()
    }

    #[test]
    fn test_dotenv_missing_and_unreadable_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_dotenv_from(&dir.path().join("absent.env")));
        // a directory cannot be read as a file
        assert!(!load_dotenv_from(dir.path()));

        let path = dir.path().join(".env");
        std::fs::write(&path, "YT_ANALYZER_DOTENV_CHECK=loaded\n").unwrap();
        assert!(load_dotenv_from(&path));
        assert_eq!(std::env::var("YT_ANALYZER_DOTENV_CHECK").as_deref(), Ok("loaded"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yt-analyzer.toml");

        let mut config = valid_config();
        config.pipeline.title_filter = Some("【実話】".to_string());
        config.throttle.subtitle_delay = DelayRange::new(500, 900);
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.api.api_key.as_deref(), Some("AIzaTestKey"));
        assert_eq!(loaded.pipeline.seed_video_ids, vec!["SyibOFcjCHk"]);
        assert_eq!(loaded.pipeline.title_filter.as_deref(), Some("【実話】"));
        assert_eq!(loaded.throttle.subtitle_delay, DelayRange::new(500, 900));
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.subtitle_languages, vec!["ja"]);
        assert_eq!(config.pipeline.threshold, 0.5);
        assert_eq!(config.output.file_name, "video_analysis_result.csv");
        assert!(config.throttle.enabled);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let mut config = valid_config();
        config.api.api_key = Some("   ".to_string());
        assert!(matches!(config.validate(), Err(AnalyzerError::Configuration(_))));
    }

    #[test]
    fn test_empty_seed_list_is_fatal() {
        let config = ConfigBuilder::new().with_api_key("key").build();
        assert!(matches!(config.validate(), Err(AnalyzerError::Configuration(_))));
    }

    #[test]
    fn test_inverted_delay_range_is_rejected() {
        let mut config = valid_config();
        config.throttle.subtitle_delay = DelayRange::new(2000, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("YOUTUBE_API_KEY", " secret \n"),
            ("VIDEO_IDS", "abc, def ,,ghi"),
            ("TITLE_FILTER", "  "),
            ("SUBTITLE_LANGS", "ja,en"),
            ("THRESHOLD", "0.8"),
            ("DEBUG", "True"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.pipeline.seed_video_ids, vec!["abc", "def", "ghi"]);
        assert_eq!(config.pipeline.title_filter, None);
        assert_eq!(config.pipeline.subtitle_languages, vec!["ja", "en"]);
        assert_eq!(config.pipeline.threshold, 0.8);
        assert!(config.output.debug);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            seed_video_ids = ["one"]

            [throttle]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.seed_video_ids, vec!["one"]);
        assert_eq!(config.pipeline.subtitle_languages, vec!["ja"]);
        assert!(!config.throttle.enabled);
        assert_eq!(config.throttle.subtitle_delay, DelayRange::new(800, 1500));
    }

    #[test]
    fn test_summary_masks_key() {
        let summary = valid_config().summary();
        assert!(summary.contains("AIza…"));
        assert!(!summary.contains("AIzaTestKey"));
    }
}
