use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yt_channel_analyzer::config::{load_dotenv, split_list};
use yt_channel_analyzer::{Config, PipelineOrchestrator};

fn cli() -> Command {
    Command::new("YouTube Channel Analyzer")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Catalog a YouTube channel and score every video against keyword categories")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("video-ids")
                .short('i')
                .long("video-ids")
                .value_name("IDS")
                .help("Comma separated seed video ids"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .value_name("KEY")
                .help("YouTube Data API key"),
        )
        .arg(
            Arg::new("title-filter")
                .short('t')
                .long("title-filter")
                .value_name("TEXT")
                .help("Only keep videos whose title contains TEXT (case-sensitive)"),
        )
        .arg(
            Arg::new("langs")
                .short('l')
                .long("langs")
                .value_name("LANGS")
                .help("Comma separated subtitle languages in priority order"),
        )
        .arg(
            Arg::new("keywords")
                .short('k')
                .long("keywords")
                .value_name("FILE")
                .help("TOML file with [[category]] keyword tables")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for results")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .value_name("VALUE")
                .help("Classification threshold (recorded, not applied)")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Also write the merged table before scoring")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-throttle")
                .long("no-throttle")
                .help("Disable courtesy delays between requests")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .value_name("FILE")
                .help("Write the effective configuration to FILE and exit")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
}

/// Command line flags take precedence over file and environment values
fn apply_cli(config: &mut Config, matches: &clap::ArgMatches) {
    if let Some(ids) = matches.get_one::<String>("video-ids") {
        config.pipeline.seed_video_ids = split_list(ids);
    }
    if let Some(key) = matches.get_one::<String>("api-key") {
        config.api.api_key = Some(key.trim().to_string());
    }
    if let Some(filter) = matches.get_one::<String>("title-filter") {
        let filter = filter.trim();
        config.pipeline.title_filter = (!filter.is_empty()).then(|| filter.to_string());
    }
    if let Some(langs) = matches.get_one::<String>("langs") {
        config.pipeline.subtitle_languages = split_list(langs);
    }
    if let Some(path) = matches.get_one::<PathBuf>("keywords") {
        config.keywords.categories_file = Some(path.clone());
    }
    if let Some(dir) = matches.get_one::<PathBuf>("output-dir") {
        config.output.output_dir = dir.clone();
    }
    if let Some(threshold) = matches.get_one::<f64>("threshold") {
        config.pipeline.threshold = *threshold;
    }
    if matches.get_flag("debug") {
        config.output.debug = true;
    }
    if matches.get_flag("no-throttle") {
        config.throttle.enabled = false;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    // Initialize logging; RUST_LOG wins over the defaults
    let default_filter = if verbose {
        "yt_channel_analyzer=debug,yt_analyzer=debug,warn"
    } else {
        "yt_channel_analyzer=info,yt_analyzer=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    load_dotenv();

    // Load configuration: file, then environment, then flags
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load(Some(path.as_path()))?,
        None => Config::load(None).unwrap_or_else(|e| {
            info!("{}, using defaults", e);
            Config::default()
        }),
    };
    config.apply_env();
    apply_cli(&mut config, &matches);

    if let Some(path) = matches.get_one::<PathBuf>("write-config") {
        config.save(path).context("failed to write configuration")?;
        return Ok(());
    }

    config.validate().context("invalid configuration")?;

    info!("🚀 YouTube Channel Analyzer starting...");
    for line in config.summary().lines() {
        info!("{}", line);
    }

    let orchestrator = PipelineOrchestrator::from_config(config).await?;
    let summary = orchestrator.run().await?;

    info!("🎉 Finished in {:.2}s", summary.total_time.as_secs_f64());
    info!("📹 Videos found: {}", summary.videos_found);
    info!("📊 Details fetched: {}", summary.details_fetched);
    info!("📝 Videos with subtitles: {}", summary.subtitles_found);
    info!("💾 Results: {}", summary.output_path.display());
    if let Some(path) = &summary.debug_path {
        info!("🐛 Debug merge: {}", path.display());
    }
    if !summary.failures.is_empty() {
        warn!("⚠️ Skipped work: {}", summary.failures);
    }

    Ok(())
}
