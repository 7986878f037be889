// src/storage/mod.rs

//! Article persistence.
//!
//! The store is the sole reader/writer of persisted article rows. Writes go
//! through upsert-on-`url` only, so re-ingesting the same provider batch is
//! idempotent. The provider→column mapping (names, truncation, defaults)
//! lives here, explicit rather than reflection-driven.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Article, ArticlePage, RawArticle};
use crate::utils::truncate_chars;

pub use sqlite::SqliteArticleStore;

/// Column length limits, mirroring the relational schema.
pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 500;
pub const URL_MAX: usize = 500;
pub const IMAGE_URL_MAX: usize = 500;
pub const NAME_MAX: usize = 100;

/// Fallback description when the provider omitted one.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Fallback author/source display name.
pub const UNKNOWN: &str = "Unknown";

/// An article mapped and validated for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_name: String,
    pub source_name: String,
}

impl NewArticle {
    /// Map a raw provider article to the storage shape.
    ///
    /// Caller guarantees `url` and a parseable `publishedAt` are present;
    /// everything else is defaulted or truncated to column limits here.
    fn from_raw(raw: &RawArticle, published_at: DateTime<Utc>, url: &str) -> Self {
        Self {
            title: truncate_chars(raw.title.as_deref().unwrap_or(UNKNOWN), TITLE_MAX),
            description: truncate_chars(
                raw.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
                DESCRIPTION_MAX,
            ),
            url: truncate_chars(url, URL_MAX),
            url_to_image: raw
                .url_to_image
                .as_deref()
                .map(|u| truncate_chars(u, IMAGE_URL_MAX)),
            published_at,
            author_name: truncate_chars(raw.author.as_deref().unwrap_or(UNKNOWN), NAME_MAX),
            source_name: truncate_chars(
                raw.source
                    .as_ref()
                    .and_then(|s| s.name.as_deref())
                    .unwrap_or(UNKNOWN),
                NAME_MAX,
            ),
        }
    }
}

/// Prepare a raw provider batch for insertion.
///
/// Drops entries missing a `url` or a parseable `publishedAt`, keeps the
/// first occurrence of each `url` within the batch, and (unless `bypass`)
/// drops articles not strictly newer than `latest_published_at` — the
/// recency filter that keeps routine re-ingestion from rewriting old rows.
pub fn prepare_batch(
    raw: &[RawArticle],
    latest_published_at: Option<DateTime<Utc>>,
    bypass: bool,
) -> Vec<NewArticle> {
    let mut seen = std::collections::HashSet::new();
    let mut prepared = Vec::new();

    for article in raw {
        let Some(url) = article.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        let Some(published_at) = article.published_at_utc() else {
            continue;
        };
        if !seen.insert(url.to_string()) {
            continue; // duplicate url within the batch, first wins
        }
        if !bypass {
            if let Some(latest) = latest_published_at {
                if published_at <= latest {
                    continue;
                }
            }
        }
        prepared.push(NewArticle::from_raw(article, published_at, url));
    }

    prepared
}

/// Typed access to persisted articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch articles published within the last `max_age_hours`, newest
    /// first, as the requested page. Count and slice are computed over the
    /// same filtered set; the reported count is capped.
    async fn fetch_recent(&self, max_age_hours: u32, page: i64, limit: i64)
    -> Result<ArticlePage>;

    /// Case-insensitive substring search over title and description,
    /// newest first, paginated with the same cap rules.
    async fn search_by_keyword(&self, keyword: &str, page: i64, limit: i64)
    -> Result<ArticlePage>;

    /// Point lookup by surrogate id. A miss is `Ok(None)`, not an error.
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Upsert a raw provider batch; returns the number of rows written.
    /// An input that is empty after filtering writes nothing and returns 0.
    async fn upsert_many(&self, raw: &[RawArticle], bypass_recency_filter: bool)
    -> Result<usize>;

    /// Most recent stored publication timestamp, if any rows exist.
    async fn max_published_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Total stored row count, for diagnostics.
    async fn count_all(&self) -> Result<i64>;
}
