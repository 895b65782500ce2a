use serde::{Deserialize, Serialize};

/// Who the user is pretending to be and what content they want to see
///
/// Only explicit user intents change these fields; every fetch reads them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionContext {
    /// Free-text user id used to personalise results
    pub user_id: String,
    /// Content-type filter; empty means no filter
    pub content_type_filter: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, content_type_filter: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            content_type_filter: content_type_filter.into(),
        }
    }

    /// Trimmed user id, or `None` when there is nothing to personalise with
    pub fn user(&self) -> Option<&str> {
        let trimmed = self.user_id.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Active filter, or `None` when unfiltered
    ///
    /// The value is passed through as-is; the backend owns validation.
    pub fn content_type(&self) -> Option<&str> {
        (!self.content_type_filter.is_empty()).then_some(self.content_type_filter.as_str())
    }
}

/// Which search backend mode to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Simple,
    Ai,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Simple => "simple",
            SearchType::Ai => "ai",
        }
    }
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(SearchType::Simple),
            "ai" => Ok(SearchType::Ai),
            other => Err(format!("unknown search type: {}", other)),
        }
    }
}

/// A submitted search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    pub query: String,
    pub search_type: SearchType,
}

impl SearchSpec {
    /// Builds a search from raw input; `None` when the query is blank
    pub fn new(query: &str, search_type: SearchType) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        Some(Self {
            query: query.to_string(),
            search_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_is_trimmed_and_blank_is_none() {
        assert_eq!(SessionContext::new("  demo_user_1 ", "").user(), Some("demo_user_1"));
        assert_eq!(SessionContext::new("   ", "").user(), None);
        assert_eq!(SessionContext::default().user(), None);
    }

    #[test]
    fn test_content_type_passes_through_unvalidated() {
        let session = SessionContext::new("u", "not-a-real-type");
        assert_eq!(session.content_type(), Some("not-a-real-type"));
        assert_eq!(SessionContext::new("u", "").content_type(), None);
    }

    #[test]
    fn test_search_spec_rejects_blank_queries() {
        assert_eq!(SearchSpec::new("", SearchType::Simple), None);
        assert_eq!(SearchSpec::new(" \t\n ", SearchType::Ai), None);

        let spec = SearchSpec::new("  trending videos ", SearchType::Ai).unwrap();
        assert_eq!(spec.query, "trending videos");
        assert_eq!(spec.search_type, SearchType::Ai);
    }

    #[test]
    fn test_search_type_parsing() {
        assert_eq!("AI".parse::<SearchType>(), Ok(SearchType::Ai));
        assert_eq!("simple".parse::<SearchType>(), Ok(SearchType::Simple));
        assert!("fuzzy".parse::<SearchType>().is_err());
        assert_eq!(serde_json::to_string(&SearchType::Ai).unwrap(), "\"ai\"");
    }
}
