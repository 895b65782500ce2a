//! Fixtures shared by the controller's unit tests.

use chrono::Utc;

use crate::models::{AbAssignment, RecommendationPage, ResultItem, SearchPage};

pub fn item(item_id: &str) -> ResultItem {
    ResultItem {
        item_id: item_id.to_string(),
        title: format!("Title {}", item_id),
        description: String::new(),
        content_type: "video".to_string(),
        category: "Entertainment".to_string(),
        rating: 4.0,
        view_count: 100,
        tags: vec!["trending".to_string()],
        thumbnail_url: String::new(),
        ml_score: None,
        search_score: None,
    }
}

pub fn recommendation_page(n: usize, algorithm: &str) -> RecommendationPage {
    RecommendationPage {
        recommendations: (0..n).map(|i| item(&format!("rec_{}", i))).collect(),
        algorithm: algorithm.to_string(),
    }
}

pub fn search_page(n: usize) -> SearchPage {
    SearchPage {
        results: (0..n).map(|i| item(&format!("hit_{}", i))).collect(),
        query: None,
        search_type: None,
        total_results: Some(n as u64),
    }
}

pub fn assignment(arm: &str) -> AbAssignment {
    AbAssignment {
        arm: arm.to_string(),
        bucket: "treatment".to_string(),
        experiment_name: "ML vs Popularity Algorithm Test".to_string(),
        experiment_id: "recommendation_algorithm_v1".to_string(),
        user_id: "demo_user_1".to_string(),
        timestamp: Utc::now(),
    }
}
