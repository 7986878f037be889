// src/models/page.rs

//! Page-ready result set.

use serde::{Deserialize, Serialize};

use super::Article;

/// A paginated article result set, ready for the response layer.
///
/// `total_count` is capped (at 100 by default policy) so worst-case
/// pagination metadata stays bounded regardless of true row count;
/// `total_pages` is always computed from the capped count and is 0 when
/// the set is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub total_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub articles: Vec<Article>,
}

impl ArticlePage {
    /// Number of articles in this page slice.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether this page slice holds no articles.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
