// src/services/mod.rs

//! Service layer for the newsdesk core.
//!
//! - External feed client (`HttpFeedClient`) — talks to the news provider,
//!   classifies its error modes, retries rate limits with bounded backoff
//! - Refresh orchestrator (`NewsService`) — per-request cache/DB/API
//!   sourcing policy and cache coherency

mod feed;
mod news;

pub use feed::{FeedProvider, HttpFeedClient};
pub use news::{FEED_CACHE_KEY, NewsService};
