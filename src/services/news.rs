// src/services/news.rs

//! Refresh orchestrator.
//!
//! Decides data provenance for every read request — cache, relational
//! store, or external provider — and keeps the cache coherent across
//! backfills.
//!
//! Feed path per request: cache hit is terminal (store and provider are
//! never touched); on a miss the qualifying window is read from the store;
//! if it holds fewer than `min(MIN_DB_RESULTS, limit)` articles the
//! shortfall is backfilled from the provider, persisted (upsert on url),
//! the *entire* cache is flushed (counts for every cached page may have
//! shifted), and the store is re-read so the response reflects the
//! post-backfill truth. The final set is cached for the feed TTL.
//!
//! A failed backfill fails the request; no partial result is fabricated and
//! the cache is neither written nor flushed on the failure path.

use std::sync::Arc;

use crate::cache::FreshnessCache;
use crate::config::{CacheConfig, NewsConfig};
use crate::error::{AppError, Result};
use crate::models::{Article, ArticlePage};
use crate::services::FeedProvider;
use crate::storage::ArticleStore;
use crate::utils::pagination::{self, paginate_capped};

/// Cache key for the general recent-articles set.
pub const FEED_CACHE_KEY: &str = "recent_articles";

/// Cache key for one keyword's search result set.
fn search_cache_key(keyword: &str) -> String {
    format!("search:{}", keyword.trim().to_lowercase())
}

/// Orchestrates cache/store/provider sourcing for news reads.
pub struct NewsService {
    store: Arc<dyn ArticleStore>,
    feed: Arc<dyn FeedProvider>,
    cache: Arc<FreshnessCache>,
    policy: NewsConfig,
    feed_ttl_secs: u64,
}

impl NewsService {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        feed: Arc<dyn FeedProvider>,
        cache: Arc<FreshnessCache>,
        policy: NewsConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            feed,
            cache,
            policy,
            feed_ttl_secs: cache_config.feed_ttl_secs,
        }
    }

    /// Serve the general recent-news feed.
    ///
    /// `disable_api_fallback` suppresses the provider backfill, for
    /// deterministic test/offline runs.
    pub async fn get_feed(
        &self,
        page: i64,
        limit: i64,
        disable_api_fallback: bool,
    ) -> Result<ArticlePage> {
        if let Some(cached) = self.cache.get::<Vec<Article>>(FEED_CACHE_KEY) {
            log::info!("Serving news from cache");
            return Ok(self.page_from_set(&cached, page, limit));
        }

        log::info!("Cache miss or invalid cache, checking DB...");
        let mut set = self
            .recent_window()
            .await
            .map_err(|e| self.wrap("recent articles lookup", e))?;

        let (_, effective_limit) = pagination::coerce(page, limit);
        let effective_min = if disable_api_fallback {
            0
        } else {
            self.policy.min_db_results.min(effective_limit)
        };

        if set.len() < effective_min {
            let missing = effective_min - set.len();
            log::info!("Need {} more articles, fetching from API...", missing);

            let api_result = self
                .feed
                .fetch_general_feed(missing)
                .await
                .map_err(|e| self.wrap("feed backfill", e))?;

            self.store
                .upsert_many(&api_result.articles, self.policy.bypass_recency_filter)
                .await
                .map_err(|e| self.wrap("article ingestion", e))?;

            // Counts and page boundaries for every cached set may now be
            // wrong, so flush everything rather than point-delete.
            self.cache.flush_all();

            set = self
                .recent_window()
                .await
                .map_err(|e| self.wrap("post-backfill lookup", e))?;
        }

        self.cache
            .set(FEED_CACHE_KEY, &set, Some(self.feed_ttl_secs))?;
        Ok(self.page_from_set(&set, page, limit))
    }

    /// Serve a keyword search, cached per keyword.
    pub async fn get_by_keyword(&self, keyword: &str, page: i64, limit: i64) -> Result<ArticlePage> {
        if keyword.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "Keyword parameter is required for searching news",
            ));
        }

        let cache_key = search_cache_key(keyword);
        if let Some(cached) = self.cache.get::<Vec<Article>>(&cache_key) {
            log::info!("Serving search \"{}\" from cache", keyword);
            return Ok(self.page_from_set(&cached, page, limit));
        }

        let mut set = self
            .keyword_window(keyword)
            .await
            .map_err(|e| self.wrap("article search", e))?;

        let (_, effective_limit) = pagination::coerce(page, limit);
        let effective_min = self.policy.min_db_results.min(effective_limit);

        if set.len() < effective_min {
            let missing = effective_min - set.len();
            log::info!(
                "Need {} more articles for \"{}\", fetching from API...",
                missing,
                keyword
            );

            let api_result = self
                .feed
                .fetch_by_keyword(keyword, missing)
                .await
                .map_err(|e| self.wrap("keyword backfill", e))?;

            self.store
                .upsert_many(&api_result.articles, self.policy.bypass_recency_filter)
                .await
                .map_err(|e| self.wrap("article ingestion", e))?;

            self.cache.flush_all();

            set = self
                .keyword_window(keyword)
                .await
                .map_err(|e| self.wrap("post-backfill search", e))?;
        }

        self.cache.set(&cache_key, &set, Some(self.feed_ttl_secs))?;
        Ok(self.page_from_set(&set, page, limit))
    }

    /// Point lookup by id; a miss is a normal outcome, not an error.
    pub async fn get_article_by_id(&self, id: i64) -> Result<Option<Article>> {
        self.store.get_by_id(id).await
    }

    /// The full qualifying recent set (up to the count cap), so a cached
    /// copy can be sliced for any page/limit combination.
    async fn recent_window(&self) -> Result<Vec<Article>> {
        let page = self
            .store
            .fetch_recent(
                self.policy.max_age_hours,
                1,
                self.policy.total_count_cap as i64,
            )
            .await?;
        Ok(page.articles)
    }

    /// The full keyword match set (up to the count cap).
    async fn keyword_window(&self, keyword: &str) -> Result<Vec<Article>> {
        let page = self
            .store
            .search_by_keyword(keyword, 1, self.policy.total_count_cap as i64)
            .await?;
        Ok(page.articles)
    }

    /// Slice an article set into the requested page with capped counts.
    fn page_from_set(&self, set: &[Article], page: i64, limit: i64) -> ArticlePage {
        let slice = paginate_capped(set, page, limit, self.policy.total_count_cap);
        ArticlePage {
            total_count: slice.total_count,
            total_pages: slice.total_pages,
            current_page: slice.current_page,
            articles: slice.items,
        }
    }

    /// Log a lower-level failure with its operation context and rethrow it
    /// as a refresh error that preserves the original message. Client-input
    /// errors pass through untouched.
    fn wrap(&self, context: &str, err: AppError) -> AppError {
        if err.is_client_error() {
            return err;
        }
        log::error!("{} failed: {}", context, err);
        AppError::refresh(context, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};

    use crate::models::{RawArticle, RawFeedResult};

    fn article(id: i64, url: &str, age_hours: i64) -> Article {
        Article {
            id,
            title: format!("Article {id}"),
            description: Some(format!("about {url}")),
            url: url.to_string(),
            url_to_image: None,
            published_at: Utc::now() - Duration::hours(age_hours),
            author_name: "Unknown".to_string(),
            source_name: "Unknown".to_string(),
        }
    }

    fn raw(url: &str) -> RawArticle {
        RawArticle {
            title: Some(format!("Raw at {url}")),
            url: Some(url.to_string()),
            published_at: Some(Utc::now().to_rfc3339()),
            ..RawArticle::default()
        }
    }

    /// In-memory store that counts calls.
    #[derive(Default)]
    struct MemStore {
        articles: Mutex<Vec<Article>>,
        fetch_recent_calls: AtomicUsize,
        search_calls: AtomicUsize,
        upsert_calls: AtomicUsize,
    }

    impl MemStore {
        fn seeded(articles: Vec<Article>) -> Self {
            Self {
                articles: Mutex::new(articles),
                ..Self::default()
            }
        }

        fn snapshot(&self) -> Vec<Article> {
            let mut all = self.articles.lock().unwrap().clone();
            all.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            all
        }
    }

    #[async_trait]
    impl ArticleStore for MemStore {
        async fn fetch_recent(
            &self,
            max_age_hours: u32,
            page: i64,
            limit: i64,
        ) -> crate::error::Result<ArticlePage> {
            self.fetch_recent_calls.fetch_add(1, Ordering::SeqCst);
            let cutoff = Utc::now() - Duration::hours(max_age_hours as i64);
            let qualifying: Vec<_> = self
                .snapshot()
                .into_iter()
                .filter(|a| a.published_at >= cutoff)
                .collect();
            let slice = paginate_capped(&qualifying, page, limit, 100);
            Ok(ArticlePage {
                total_count: slice.total_count,
                total_pages: slice.total_pages,
                current_page: slice.current_page,
                articles: slice.items,
            })
        }

        async fn search_by_keyword(
            &self,
            keyword: &str,
            page: i64,
            limit: i64,
        ) -> crate::error::Result<ArticlePage> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            let needle = keyword.to_lowercase();
            let matching: Vec<_> = self
                .snapshot()
                .into_iter()
                .filter(|a| a.title.to_lowercase().contains(&needle))
                .collect();
            let slice = paginate_capped(&matching, page, limit, 100);
            Ok(ArticlePage {
                total_count: slice.total_count,
                total_pages: slice.total_pages,
                current_page: slice.current_page,
                articles: slice.items,
            })
        }

        async fn get_by_id(&self, id: i64) -> crate::error::Result<Option<Article>> {
            Ok(self.snapshot().into_iter().find(|a| a.id == id))
        }

        async fn upsert_many(
            &self,
            raw: &[RawArticle],
            _bypass: bool,
        ) -> crate::error::Result<usize> {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            let mut articles = self.articles.lock().unwrap();
            let mut written = 0;
            for item in raw {
                let Some(url) = item.url.as_deref() else { continue };
                if articles.iter().any(|a| a.url == url) {
                    continue;
                }
                let id = articles.len() as i64 + 1;
                let published = item.published_at_utc().unwrap_or_else(Utc::now);
                let mut stored = article(id, url, 0);
                stored.title = item.title.clone().unwrap_or_default();
                stored.published_at = published;
                articles.push(stored);
                written += 1;
            }
            Ok(written)
        }

        async fn max_published_at(&self) -> crate::error::Result<Option<DateTime<Utc>>> {
            Ok(self.snapshot().first().map(|a| a.published_at))
        }

        async fn count_all(&self) -> crate::error::Result<i64> {
            Ok(self.articles.lock().unwrap().len() as i64)
        }
    }

    /// Scripted provider that counts calls and records requested sizes.
    struct ScriptedFeed {
        articles: Vec<RawArticle>,
        fail_with_auth: bool,
        calls: AtomicUsize,
        last_requested: AtomicUsize,
    }

    impl ScriptedFeed {
        fn returning(articles: Vec<RawArticle>) -> Self {
            Self {
                articles,
                fail_with_auth: false,
                calls: AtomicUsize::new(0),
                last_requested: AtomicUsize::new(0),
            }
        }

        fn failing_auth() -> Self {
            Self {
                articles: Vec::new(),
                fail_with_auth: true,
                calls: AtomicUsize::new(0),
                last_requested: AtomicUsize::new(0),
            }
        }

        fn respond(&self, desired: usize) -> crate::error::Result<RawFeedResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_requested.store(desired, Ordering::SeqCst);
            if self.fail_with_auth {
                return Err(AppError::Auth);
            }
            Ok(RawFeedResult {
                status: "ok".to_string(),
                total_results: Some(self.articles.len() as u64),
                articles: self.articles.clone(),
            })
        }
    }

    #[async_trait]
    impl FeedProvider for ScriptedFeed {
        async fn fetch_general_feed(
            &self,
            desired_count: usize,
        ) -> crate::error::Result<RawFeedResult> {
            self.respond(desired_count)
        }

        async fn fetch_by_keyword(
            &self,
            _keyword: &str,
            desired_count: usize,
        ) -> crate::error::Result<RawFeedResult> {
            self.respond(desired_count)
        }
    }

    fn service(
        store: Arc<MemStore>,
        feed: Arc<ScriptedFeed>,
        cache: Arc<FreshnessCache>,
    ) -> NewsService {
        NewsService::new(
            store,
            feed,
            cache,
            NewsConfig::default(),
            &CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_store_and_feed() {
        let store = Arc::new(MemStore::default());
        let feed = Arc::new(ScriptedFeed::returning(vec![]));
        let cache = Arc::new(FreshnessCache::default());

        let warm: Vec<Article> = (0..8).map(|i| article(i, &format!("https://c/{i}"), i)).collect();
        cache.set(FEED_CACHE_KEY, &warm, None).unwrap();

        let svc = service(store.clone(), feed.clone(), cache);
        let page = svc.get_feed(1, 5, false).await.unwrap();

        assert_eq!(page.articles.len(), 5);
        assert_eq!(page.total_count, 8);
        assert_eq!(store.fetch_recent_calls.load(Ordering::SeqCst), 0);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_slices_any_page() {
        let cache = Arc::new(FreshnessCache::default());
        let warm: Vec<Article> = (0..25).map(|i| article(i, &format!("https://c/{i}"), i)).collect();
        cache.set(FEED_CACHE_KEY, &warm, None).unwrap();

        let svc = service(
            Arc::new(MemStore::default()),
            Arc::new(ScriptedFeed::returning(vec![])),
            cache,
        );
        let page = svc.get_feed(2, 10, false).await.unwrap();

        assert_eq!(page.articles.len(), 10);
        assert_eq!(page.articles[0].id, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
    }

    #[tokio::test]
    async fn test_sufficient_db_avoids_api_and_caches_result() {
        let seeded: Vec<_> = (0..8).map(|i| article(i, &format!("https://d/{i}"), i)).collect();
        let store = Arc::new(MemStore::seeded(seeded));
        let feed = Arc::new(ScriptedFeed::returning(vec![]));
        let cache = Arc::new(FreshnessCache::default());

        let svc = service(store.clone(), feed.clone(), cache.clone());
        let page = svc.get_feed(1, 10, false).await.unwrap();

        assert_eq!(page.total_count, 8);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
        assert!(cache.get::<Vec<Article>>(FEED_CACHE_KEY).is_some());
    }

    #[tokio::test]
    async fn test_backfill_triggers_exactly_once_for_the_shortfall() {
        // 4 qualifying articles, MIN_DB_RESULTS = 6, limit >= 6: missing = 2
        let seeded: Vec<_> = (0..4).map(|i| article(i, &format!("https://d/{i}"), i)).collect();
        let store = Arc::new(MemStore::seeded(seeded));
        let feed = Arc::new(ScriptedFeed::returning(vec![
            raw("https://api/1"),
            raw("https://api/2"),
        ]));
        let cache = Arc::new(FreshnessCache::default());

        let svc = service(store.clone(), feed.clone(), cache);
        let page = svc.get_feed(1, 10, false).await.unwrap();

        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.last_requested.load(Ordering::SeqCst), 2);
        assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.total_count, 6);
        // two lookups: pre- and post-backfill
        assert_eq!(store.fetch_recent_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backfill_flushes_stale_cache_then_recaches() {
        let store = Arc::new(MemStore::default());
        let feed = Arc::new(ScriptedFeed::returning(vec![raw("https://api/1")]));
        let cache = Arc::new(FreshnessCache::default());

        // A stale unrelated entry that must not survive the backfill
        cache.set("search:quarks", &vec![article(99, "https://stale", 0)], None).unwrap();

        let svc = service(store, feed, cache.clone());
        svc.get_feed(1, 10, false).await.unwrap();

        assert!(cache.get::<Vec<Article>>("search:quarks").is_none());
        assert!(cache.get::<Vec<Article>>(FEED_CACHE_KEY).is_some());
    }

    #[tokio::test]
    async fn test_disable_api_fallback_never_calls_feed() {
        let store = Arc::new(MemStore::default());
        let feed = Arc::new(ScriptedFeed::returning(vec![raw("https://api/1")]));
        let cache = Arc::new(FreshnessCache::default());

        let svc = service(store.clone(), feed.clone(), cache);
        let page = svc.get_feed(1, 10, true).await.unwrap();

        assert!(page.articles.is_empty());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_masked_and_cache_untouched() {
        let store = Arc::new(MemStore::default());
        let feed = Arc::new(ScriptedFeed::failing_auth());
        let cache = Arc::new(FreshnessCache::default());
        cache.set("search:quarks", &vec![article(1, "https://s", 0)], None).unwrap();

        let svc = service(store, feed, cache.clone());
        let err = svc.get_feed(1, 10, false).await.unwrap_err();

        assert!(err.to_string().contains("Invalid API key"));
        // failure path neither flushes nor writes the cache
        assert!(cache.get::<Vec<Article>>("search:quarks").is_some());
        assert!(cache.get::<Vec<Article>>(FEED_CACHE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_empty_keyword_fails_before_any_access() {
        let store = Arc::new(MemStore::default());
        let feed = Arc::new(ScriptedFeed::returning(vec![]));
        let cache = Arc::new(FreshnessCache::default());

        let svc = service(store.clone(), feed.clone(), cache.clone());
        let err = svc.get_by_keyword("  ", 1, 10).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(store.search_calls.load(Ordering::SeqCst), 0);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[tokio::test]
    async fn test_keyword_results_cached_per_keyword() {
        let seeded: Vec<_> = (0..6)
            .map(|i| {
                let mut a = article(i, &format!("https://d/{i}"), i);
                a.title = format!("neutrino result {i}");
                a
            })
            .collect();
        let store = Arc::new(MemStore::seeded(seeded));
        let feed = Arc::new(ScriptedFeed::returning(vec![]));
        let cache = Arc::new(FreshnessCache::default());

        let svc = service(store.clone(), feed.clone(), cache.clone());
        svc.get_by_keyword("neutrino", 1, 10).await.unwrap();

        assert!(cache.get::<Vec<Article>>("search:neutrino").is_some());
        assert!(cache.get::<Vec<Article>>(FEED_CACHE_KEY).is_none());

        // second call is served from cache
        svc.get_by_keyword("neutrino", 1, 10).await.unwrap();
        assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_keyword_backfill_uses_keyword_source() {
        let store = Arc::new(MemStore::default());
        let feed = Arc::new(ScriptedFeed::returning(vec![
            raw("https://api/k1"),
            raw("https://api/k2"),
        ]));
        let cache = Arc::new(FreshnessCache::default());

        let svc = service(store.clone(), feed.clone(), cache);
        svc.get_by_keyword("Raw", 1, 10).await.unwrap();

        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.last_requested.load(Ordering::SeqCst), 6);
        assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_article_by_id_miss_is_none() {
        let store = Arc::new(MemStore::seeded(vec![article(7, "https://d/7", 1)]));
        let svc = service(
            store,
            Arc::new(ScriptedFeed::returning(vec![])),
            Arc::new(FreshnessCache::default()),
        );

        assert!(svc.get_article_by_id(7).await.unwrap().is_some());
        assert!(svc.get_article_by_id(8).await.unwrap().is_none());
    }
}
