// src/lib.rs

//! Newsdesk Core Library
//!
//! The news-refresh orchestration and caching layer behind a science-news
//! bookmarking backend: decides per request whether to serve from cache,
//! the relational store, or the external news provider, persists fetched
//! articles without duplication, and keeps cache state coherent.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
