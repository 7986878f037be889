// src/storage/sqlite.rs

//! SQLite-backed article store.
//!
//! Uniqueness-by-`url` is enforced by the schema; concurrent upserts of the
//! same URL resolve through `ON CONFLICT(url) DO UPDATE` rather than
//! application-level locking. A single pooled connection avoids SQLite
//! write-lock contention and keeps `:memory:` databases coherent in tests.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error::{AppError, Result};
use crate::models::{Article, ArticlePage, RawArticle};
use crate::storage::{ArticleStore, prepare_batch};
use crate::utils::pagination::{self, paginate_capped};

const SELECT_COLUMNS: &str =
    "id, title, description, url, url_to_image, published_at, author_name, source_name";

/// SQLite implementation of [`ArticleStore`].
pub struct SqliteArticleStore {
    pool: Pool<Sqlite>,
    total_count_cap: usize,
}

impl SqliteArticleStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// `":memory:"` yields an ephemeral store.
    pub async fn connect(path: &str, total_count_cap: usize) -> Result<Self> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        // One connection: SQLite permits limited write concurrency, and a
        // single shared connection keeps :memory: databases visible to
        // every caller.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            total_count_cap,
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the articles table and its unique url index idempotently.
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                title         TEXT NOT NULL,
                description   TEXT,
                url           TEXT NOT NULL UNIQUE,
                url_to_image  TEXT,
                published_at  TEXT NOT NULL,
                author_name   TEXT NOT NULL DEFAULT 'Unknown',
                source_name   TEXT NOT NULL DEFAULT 'Unknown'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_published_at
             ON articles (published_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Access the underlying pool (tests, diagnostics).
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl ArticleStore for SqliteArticleStore {
    async fn fetch_recent(
        &self,
        max_age_hours: u32,
        page: i64,
        limit: i64,
    ) -> Result<ArticlePage> {
        if max_age_hours == 0 {
            return Err(AppError::invalid_argument("max_age_hours must be > 0"));
        }
        let (page, limit) = pagination::coerce(page, limit);
        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours as i64);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE published_at >= ?",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        let total_count = (total as usize).min(self.total_count_cap);
        let total_pages = total_count.div_ceil(limit);
        let offset = (page - 1).saturating_mul(limit);

        // Pages past the capped count do not exist per the metadata, so do
        // not serve rows for them even when raw rows are present.
        let articles = if offset >= total_count {
            Vec::new()
        } else {
            let window = limit.min(total_count - offset);
            sqlx::query_as::<_, Article>(&format!(
                "SELECT {SELECT_COLUMNS} FROM articles
                 WHERE published_at >= ?
                 ORDER BY published_at DESC
                 LIMIT ? OFFSET ?"
            ))
            .bind(cutoff)
            .bind(window as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(ArticlePage {
            total_count,
            total_pages,
            current_page: page,
            articles,
        })
    }

    async fn search_by_keyword(
        &self,
        keyword: &str,
        page: i64,
        limit: i64,
    ) -> Result<ArticlePage> {
        if keyword.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "Keyword is required for searching articles",
            ));
        }

        // Fetch the full ordered match set and paginate in memory so the
        // count and the slice come from the same set.
        let pattern = format!("%{keyword}%");
        let matches = sqlx::query_as::<_, Article>(&format!(
            "SELECT {SELECT_COLUMNS} FROM articles
             WHERE title LIKE ?1 OR description LIKE ?1
             ORDER BY published_at DESC"
        ))
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let slice = paginate_capped(&matches, page, limit, self.total_count_cap);
        Ok(ArticlePage {
            total_count: slice.total_count,
            total_pages: slice.total_pages,
            current_page: slice.current_page,
            articles: slice.items,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {SELECT_COLUMNS} FROM articles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(article)
    }

    async fn upsert_many(&self, raw: &[RawArticle], bypass_recency_filter: bool) -> Result<usize> {
        let latest = if bypass_recency_filter {
            None
        } else {
            self.max_published_at().await?
        };

        let batch = prepare_batch(raw, latest, bypass_recency_filter);
        if batch.is_empty() {
            log::info!("No new articles to insert.");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for article in &batch {
            sqlx::query(
                r#"
                INSERT INTO articles
                    (title, description, url, url_to_image, published_at,
                     author_name, source_name)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    url_to_image = excluded.url_to_image,
                    published_at = excluded.published_at,
                    author_name = excluded.author_name,
                    source_name = excluded.source_name
                "#,
            )
            .bind(&article.title)
            .bind(&article.description)
            .bind(&article.url)
            .bind(&article.url_to_image)
            .bind(article.published_at)
            .bind(&article.author_name)
            .bind(&article.source_name)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        log::info!("Stored {} new articles.", batch.len());
        Ok(batch.len())
    }

    async fn max_published_at(&self) -> Result<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(published_at) FROM articles")
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
