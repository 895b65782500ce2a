use serde::{Deserialize, Serialize};

use super::Tab;

/// A single piece of content as returned by the recommendation service
///
/// Items are immutable once received; `item_id` is the identity key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultItem {
    pub item_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail_url: String,
    /// Model score, present on recommendation results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_score: Option<f64>,
    /// Relevance score, present on search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
}

/// Ordered list of items plus where they came from
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub items: Vec<ResultItem>,
    pub source_tab: Tab,
    /// Algorithm tag reported by the recommender
    pub algorithm: Option<String>,
    /// Query that produced a search result set
    pub query: Option<String>,
}

impl ResultSet {
    /// Creates an empty result set owned by `tab`
    pub fn empty(tab: Tab) -> Self {
        Self {
            items: Vec::new(),
            source_tab: tab,
            algorithm: None,
            query: None,
        }
    }

    pub fn recommendations(items: Vec<ResultItem>, algorithm: String) -> Self {
        Self {
            items,
            source_tab: Tab::Recommendations,
            algorithm: Some(algorithm),
            query: None,
        }
    }

    pub fn search(items: Vec<ResultItem>, query: String) -> Self {
        Self {
            items,
            source_tab: Tab::Search,
            algorithm: None,
            query: Some(query),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks an item up by its identity key
    pub fn find(&self, item_id: &str) -> Option<&ResultItem> {
        self.items.iter().find(|item| item.item_id == item_id)
    }
}

/// Detail view of one item with its nearest neighbours
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDetail {
    pub item: ResultItem,
    #[serde(default)]
    pub similar_items: Vec<ResultItem>,
}
