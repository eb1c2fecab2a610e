use anyhow::Result;
use std::sync::Arc;
use yt_channel_analyzer::config::load_dotenv;
use yt_channel_analyzer::subtitles::CaptionSource;
use yt_channel_analyzer::{
    Config, FailureTally, KeywordDictionary, KeywordScorer, NoThrottle, SubtitleNormalizer, VideoId,
    YtDlpCaptionSource,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("yt_channel_analyzer=info,check_subtitles=info")
        .init();

    load_dotenv();
    let mut config = Config::load(None).unwrap_or_default();
    config.apply_env();

    info!("🔍 Checking subtitle backend availability...");

    let source = YtDlpCaptionSource::new(&config.subtitles)?;
    match source.check_availability().await {
        Ok(version) => {
            info!("✅ yt-dlp {}", version);
        }
        Err(e) => {
            info!("❌ {}", e);
            info!("💡 Install yt-dlp and make sure it is on PATH:");
            info!("   pip install -U yt-dlp");
            info!("   # or set subtitles.ytdlp_path in yt-analyzer.toml");
            return Ok(());
        }
    }

    // Test keyword dictionary
    info!("📚 Testing keyword dictionary...");
    let dictionary = match &config.keywords.categories_file {
        Some(path) => KeywordDictionary::from_file(path).await?,
        None => KeywordDictionary::new(),
    };
    for line in dictionary.get_stats().summary().lines() {
        info!("   {}", line);
    }

    let video_id = match std::env::args().nth(1).or_else(|| config.pipeline.seed_video_ids.first().cloned()) {
        Some(id) => VideoId::new(id),
        None => {
            info!("💡 Pass a video id to inspect its captions: check-subtitles <VIDEO_ID>");
            return Ok(());
        }
    };

    info!("📋 Caption tracks for {}:", video_id);
    let listing = source.list_tracks(&video_id).await?;
    for (kind, tracks) in [("manual", &listing.manual), ("auto-generated", &listing.automatic)] {
        let mut languages: Vec<&String> = tracks.keys().collect();
        languages.sort();
        let formats: Vec<String> = languages
            .iter()
            .map(|lang| {
                let exts: Vec<&str> = tracks[*lang].iter().map(|t| t.ext.as_str()).collect();
                format!("{} [{}]", lang, exts.join("/"))
            })
            .collect();
        info!("   - {}: {}", kind, if formats.is_empty() { "none".to_string() } else { formats.join(", ") });
    }

    let languages = config.pipeline.subtitle_languages.clone();
    let normalizer = SubtitleNormalizer::new(Arc::new(source), Arc::new(NoThrottle), languages);
    let mut failures = FailureTally::new();
    let text = normalizer.resolve_subtitle_text(&video_id, &mut failures).await;

    let preview: String = text.chars().take(100).collect();
    info!("📝 {} characters of subtitle text: {}", text.chars().count(), preview);

    let scorer = KeywordScorer::new(Arc::new(dictionary), config.pipeline.threshold);
    let matched: Vec<String> = scorer
        .classify(&text)
        .into_iter()
        .filter(|m| m.matched)
        .map(|m| format!("{}={}", m.category, m.count))
        .collect();
    info!("🏷️ Keyword hits: {}", if matched.is_empty() { "none".to_string() } else { matched.join(", ") });

    if !failures.is_empty() {
        info!("⚠️ {}", failures);
    }

    info!("🎉 Subtitle pipeline components ready!");
    info!("💡 To run the full analysis, use: cargo run --bin yt-analyzer -- --video-ids <IDS>");

    Ok(())
}
