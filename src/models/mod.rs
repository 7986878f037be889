// src/models/mod.rs

//! Domain models for the newsdesk core.

mod article;
mod page;

pub use article::{Article, RawArticle, RawFeedResult, RawSource};
pub use page::ArticlePage;
