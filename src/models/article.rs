// src/models/article.rs

//! Article data structures.
//!
//! `Article` is the stored row shape; `RawArticle` mirrors the provider's
//! wire format (camelCase, everything optional). Validation and field
//! defaulting happen at ingestion time, not at deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted news article.
///
/// `url` is the natural key: no two stored articles share one, and ingestion
/// upserts on it. Rows are never mutated after insert by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    /// Surrogate id assigned at persistence
    pub id: i64,

    /// Article headline
    pub title: String,

    /// Short summary, if the provider supplied one
    pub description: Option<String>,

    /// Canonical article URL (globally unique dedup key)
    pub url: String,

    /// Lead image URL
    pub url_to_image: Option<String>,

    /// Publication timestamp; drives freshness filtering and ordering
    pub published_at: DateTime<Utc>,

    /// Author display name ("Unknown" when the provider omitted it)
    pub author_name: String,

    /// Publisher display name ("Unknown" when the provider omitted it)
    pub source_name: String,
}

/// Provider response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeedResult {
    /// Provider status marker; "ok" on success
    #[serde(default)]
    pub status: String,

    #[serde(rename = "totalResults", default)]
    pub total_results: Option<u64>,

    #[serde(default)]
    pub articles: Vec<RawArticle>,
}

/// Source block inside a raw provider article.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An article as returned by the provider, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub source: Option<RawSource>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(rename = "urlToImage", default)]
    pub url_to_image: Option<String>,

    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

impl RawArticle {
    /// Parse the provider timestamp, if present and well-formed.
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        self.published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
