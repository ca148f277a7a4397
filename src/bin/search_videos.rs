#![forbid(unsafe_code)]

//! One-shot catalog query from the command line. Useful for checking what a
//! given category/sort selection returns without starting the backend.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Parser;
use clipshare_tools::{
    catalog::CatalogStore,
    config,
    cursor::TokenCache,
    normalize::format_view_count,
    provider::YouTubeProvider,
    query::{FetchRequest, SortKey},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "search_videos", about = "Query the clipshare video catalog")]
struct Args {
    /// Search term; empty falls back to the catalog's default category.
    #[arg(default_value = "")]
    query: String,
    /// Sort key: date, trending, relevance, rating or title.
    #[arg(long, default_value = "date")]
    sort: String,
    /// Provider page to request. Pages after the first resume the cached
    /// cursor for this query when one exists.
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Path to the environment configuration file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let runtime = config::load_runtime_config_from(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    let provider = YouTubeProvider::new(runtime.youtube_api_key.clone())
        .context("initializing search provider")?;
    let tokens = TokenCache::open(runtime.token_db_path())
        .context("initializing pagination token cache")?;
    let store = CatalogStore::new(Arc::new(provider), tokens);

    let request = FetchRequest::new(args.page, args.query, SortKey::from_param(&args.sort));
    let state = store.fetch_videos(request).await;

    if let Some(error) = &state.error {
        bail!("catalog fetch failed: {error}");
    }

    println!(
        "Page {} of {} ({} videos)",
        state.current_page,
        state.total_pages,
        state.videos.len()
    );
    println!();

    for video in &state.videos {
        println!("{} [{}]", video.title, video.duration);
        println!(
            "  {} views | {}",
            format_view_count(video.views),
            video.uploader.display_name
        );
        println!("  https://www.youtube.com/watch?v={}", video.id);
    }

    Ok(())
}
