// src/services/feed.rs

//! External news provider client.
//!
//! Both public operations route through one request executor that issues
//! the HTTP call with a bounded timeout, classifies the response itself
//! (statuses never raise transport errors), and retries only the 429
//! rate-limit case — an explicit bounded loop with a doubling delay, so the
//! retry ceiling is auditable.
//!
//! Error classification:
//! - 401: invalid credentials, never retried
//! - 429: retried up to `max_attempts` with exponential backoff
//! - other non-200: upstream error carrying the status
//! - 200 with a body that is not `{"status":"ok","articles":[..]}`:
//!   upstream "Unexpected response format"
//!
//! An empty `articles` array on success is valid (logged as a warning).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::FeedConfig;
use crate::error::{AppError, Result};
use crate::models::RawFeedResult;

/// A source of raw provider articles.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Fetch up to `desired_count` general science-news articles.
    async fn fetch_general_feed(&self, desired_count: usize) -> Result<RawFeedResult>;

    /// Fetch up to `desired_count` articles matching `keyword`.
    async fn fetch_by_keyword(&self, keyword: &str, desired_count: usize)
    -> Result<RawFeedResult>;
}

/// HTTP client for the news provider API.
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_attempts: u32,
    backoff_base: Duration,
}

impl HttpFeedClient {
    /// Build a client from configuration plus the resolved API key.
    pub fn new(config: &FeedConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    /// Issue a GET against `endpoint`, classify the response, and validate
    /// the body shape. `context` describes the request purpose for logs.
    async fn fetch_articles(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<RawFeedResult> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut delay = self.backoff_base;

        for attempt in 1..=self.max_attempts {
            log::info!("Fetching {} from News API (attempt {})...", context, attempt);

            let response = self
                .client
                .get(&url)
                .query(&[("apiKey", self.api_key.as_str())])
                .query(params)
                .send()
                .await
                .map_err(|e| {
                    log::error!("Error fetching {}: {}", context, e);
                    AppError::upstream(context, e)
                })?;

            let status = response.status();

            if status.as_u16() == 401 {
                log::error!("Invalid API key. Check your NEWS_API_KEY.");
                return Err(AppError::Auth);
            }

            if status.as_u16() == 429 {
                if attempt < self.max_attempts {
                    log::warn!(
                        "Rate limited fetching {}; retrying in {:?} ({}/{})",
                        context,
                        delay,
                        attempt,
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    continue;
                }
                log::error!(
                    "Rate limit persisted after {} attempts fetching {}",
                    self.max_attempts,
                    context
                );
                return Err(AppError::upstream(
                    context,
                    format!("API rate limit exceeded after {} attempts", self.max_attempts),
                ));
            }

            if !status.is_success() {
                log::error!("API error ({}): {}", context, status);
                return Err(AppError::upstream(
                    context,
                    format!("API responded with {}", status.as_u16()),
                ));
            }

            let body: Value = response.json().await.map_err(|e| {
                log::error!("Error reading response for {}: {}", context, e);
                AppError::upstream(context, e)
            })?;

            if body.get("status").and_then(Value::as_str) != Some("ok")
                || !body.get("articles").is_some_and(Value::is_array)
            {
                log::error!("Malformed API response for {}", context);
                return Err(AppError::upstream(context, "Unexpected response format"));
            }

            let result: RawFeedResult = serde_json::from_value(body)?;
            if result.articles.is_empty() {
                log::warn!("No articles returned from News API for {}.", context);
            }
            return Ok(result);
        }

        unreachable!("retry loop returns on every path")
    }
}

#[async_trait]
impl FeedProvider for HttpFeedClient {
    async fn fetch_general_feed(&self, desired_count: usize) -> Result<RawFeedResult> {
        self.fetch_articles(
            "top-headlines",
            &[
                ("country", "us".to_string()),
                ("category", "science".to_string()),
                ("pageSize", desired_count.to_string()),
            ],
            "science news",
        )
        .await
    }

    async fn fetch_by_keyword(
        &self,
        keyword: &str,
        desired_count: usize,
    ) -> Result<RawFeedResult> {
        if keyword.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "Keyword parameter is required for searching news",
            ));
        }

        let context = format!("search keyword: \"{keyword}\" with pageSize: {desired_count}");
        self.fetch_articles(
            "everything",
            &[
                ("q", keyword.to_string()),
                ("language", "en".to_string()),
                ("pageSize", desired_count.to_string()),
            ],
            &context,
        )
        .await
    }
}
