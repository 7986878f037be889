//! Newsdesk CLI
//!
//! Operational entry point for the refresh core: run feed/search requests
//! against the local store (with provider backfill), look up stored
//! articles, and validate configuration.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use newsdesk::{
    cache::FreshnessCache,
    config::Config,
    error::Result,
    services::{HttpFeedClient, NewsService},
    storage::{ArticleStore, SqliteArticleStore},
};

/// Newsdesk - science-news refresh and caching core
#[derive(Parser, Debug)]
#[command(name = "newsdesk", version, about = "Science-news refresh core")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "newsdesk.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the recent-news feed, backfilling from the provider if needed
    Feed {
        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        limit: i64,

        /// Never call the external provider (DB-only result)
        #[arg(long)]
        no_api_fallback: bool,
    },

    /// Search stored articles by keyword, backfilling if needed
    Search {
        keyword: String,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Show a single stored article by id
    Show { id: i64 },

    /// Validate the configuration file and database connectivity
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);

    if let Command::Validate = cli.command {
        config.validate()?;
        let store = SqliteArticleStore::connect(
            &config.store.database_path,
            config.news.total_count_cap,
        )
        .await?;
        let count = store.count_all().await?;
        log::info!("Configuration OK; {} articles stored.", count);
        return Ok(());
    }

    let api_key = config.api_key().unwrap_or_else(|e| {
        log::warn!("{} - provider calls will be rejected upstream.", e);
        String::new()
    });

    let store = Arc::new(
        SqliteArticleStore::connect(&config.store.database_path, config.news.total_count_cap)
            .await?,
    );
    let feed = Arc::new(HttpFeedClient::new(&config.feed, api_key)?);
    let cache = Arc::new(FreshnessCache::new(config.cache.default_ttl_secs));
    let news = NewsService::new(store.clone(), feed, cache, config.news.clone(), &config.cache);

    match cli.command {
        Command::Feed {
            page,
            limit,
            no_api_fallback,
        } => {
            let result = news.get_feed(page, limit, no_api_fallback).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Search {
            keyword,
            page,
            limit,
        } => {
            let result = news.get_by_keyword(&keyword, page, limit).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Show { id } => match news.get_article_by_id(id).await? {
            Some(article) => println!("{}", serde_json::to_string_pretty(&article)?),
            None => {
                log::warn!("No article with id {}", id);
            }
        },
        Command::Validate => unreachable!("handled above"),
    }

    Ok(())
}
