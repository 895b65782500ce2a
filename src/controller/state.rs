use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{
    AbAssignment, ItemDetail, RecommendationPage, ResultItem, ResultSet, SearchPage, SearchType,
    SessionContext, StatsSnapshot, Tab,
};

use super::{
    generation::QueryKind,
    notifications::{NotificationKind, NotificationQueue, NotificationTiming},
};

/// Busy indicators, one per query kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub recommendations: bool,
    pub search: bool,
    pub stats: bool,
    pub ab_arm: bool,
    pub item_detail: bool,
}

impl LoadingFlags {
    pub fn get(&self, kind: QueryKind) -> bool {
        match kind {
            QueryKind::Recommendations => self.recommendations,
            QueryKind::Search => self.search,
            QueryKind::Stats => self.stats,
            QueryKind::AbArm => self.ab_arm,
            QueryKind::ItemDetail => self.item_detail,
        }
    }

    fn set(&mut self, kind: QueryKind, value: bool) {
        match kind {
            QueryKind::Recommendations => self.recommendations = value,
            QueryKind::Search => self.search = value,
            QueryKind::Stats => self.stats = value,
            QueryKind::AbArm => self.ab_arm = value,
            QueryKind::ItemDetail => self.item_detail = value,
        }
    }
}

/// Item open in the detail panel
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item: ResultItem,
    pub detail: Option<ItemDetail>,
    pub opened_at: Instant,
}

/// Everything the view renders, as one immutable record
///
/// Transitions never touch `self`; each returns the next state, which the controller
/// publishes as a fresh snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryState {
    pub session: SessionContext,
    pub active_tab: Tab,
    pub search_type: SearchType,
    pub last_search_query: Option<String>,
    pub recommendations: ResultSet,
    pub search_results: ResultSet,
    pub loading: LoadingFlags,
    pub stats: Option<StatsSnapshot>,
    pub ab_assignment: Option<AbAssignment>,
    pub error: Option<String>,
    pub notifications: NotificationQueue,
    pub selected: Option<SelectedItem>,
}

impl DiscoveryState {
    pub fn new(session: SessionContext, timing: NotificationTiming) -> Self {
        Self {
            session,
            active_tab: Tab::Recommendations,
            search_type: SearchType::default(),
            last_search_query: None,
            recommendations: ResultSet::empty(Tab::Recommendations),
            search_results: ResultSet::empty(Tab::Search),
            loading: LoadingFlags::default(),
            stats: None,
            ab_assignment: None,
            error: None,
            notifications: NotificationQueue::new(timing),
            selected: None,
        }
    }

    pub fn result_set(&self, tab: Tab) -> &ResultSet {
        match tab {
            Tab::Recommendations => &self.recommendations,
            Tab::Search => &self.search_results,
        }
    }

    /// Result set for whichever tab is showing
    pub fn active_results(&self) -> &ResultSet {
        self.result_set(self.active_tab)
    }

    fn update(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        f(&mut next);
        next
    }

    // ------------------------------------------------------------------
    // Session & navigation
    // ------------------------------------------------------------------

    pub fn with_tab(&self, tab: Tab) -> Self {
        self.update(|s| s.active_tab = tab)
    }

    pub fn with_user(&self, user_id: &str) -> Self {
        self.update(|s| s.session.user_id = user_id.to_string())
    }

    pub fn with_filter(&self, content_type: &str) -> Self {
        self.update(|s| s.session.content_type_filter = content_type.to_string())
    }

    pub fn with_search_type(&self, search_type: SearchType) -> Self {
        self.update(|s| s.search_type = search_type)
    }

    pub fn with_search_submitted(&self, query: &str) -> Self {
        self.update(|s| {
            s.active_tab = Tab::Search;
            s.last_search_query = Some(query.to_string());
        })
    }

    pub fn with_selected(&self, selected: Option<SelectedItem>) -> Self {
        self.update(|s| s.selected = selected)
    }

    // ------------------------------------------------------------------
    // Fetch lifecycle
    // ------------------------------------------------------------------

    /// Marks `kind` busy; a new recommendations or search request also clears the banner
    pub fn with_dispatched(&self, kind: QueryKind) -> Self {
        self.update(|s| {
            s.loading.set(kind, true);
            if matches!(kind, QueryKind::Recommendations | QueryKind::Search) {
                s.error = None;
            }
        })
    }

    pub fn with_recommendations(&self, page: RecommendationPage) -> Self {
        self.update(|s| {
            s.loading.recommendations = false;
            s.error = None;
            s.recommendations = ResultSet::recommendations(page.recommendations, page.algorithm);
        })
    }

    pub fn with_search_results(&self, query: String, page: SearchPage) -> Self {
        self.update(|s| {
            s.loading.search = false;
            s.error = None;
            s.search_results = ResultSet::search(page.results, query);
        })
    }

    /// Replaces the stats snapshot wholesale
    pub fn with_stats(&self, stats: StatsSnapshot) -> Self {
        self.update(|s| {
            s.loading.stats = false;
            s.stats = Some(stats);
        })
    }

    pub fn with_assignment(&self, assignment: AbAssignment) -> Self {
        self.update(|s| {
            s.loading.ab_arm = false;
            s.ab_assignment = Some(assignment);
        })
    }

    /// Attaches detail to the open item; ignored if a different item is open by now
    pub fn with_item_detail(&self, detail: ItemDetail) -> Self {
        self.update(|s| {
            s.loading.item_detail = false;
            if let Some(selected) = s.selected.as_mut() {
                if selected.item.item_id == detail.item.item_id {
                    selected.detail = Some(detail);
                }
            }
        })
    }

    /// Applies a failed fetch to its own failure domain only
    pub fn with_fetch_failure(&self, kind: QueryKind, message: &str) -> Self {
        self.update(|s| {
            s.loading.set(kind, false);
            match kind {
                QueryKind::Recommendations => {
                    s.recommendations = ResultSet::empty(Tab::Recommendations);
                    s.error = Some(format!("Failed to load recommendations: {}", message));
                }
                QueryKind::Search => {
                    s.search_results = ResultSet::empty(Tab::Search);
                    s.error = Some(format!("Search failed: {}", message));
                }
                // Last good snapshot stays on screen
                QueryKind::Stats => {}
                QueryKind::AbArm => s.ab_assignment = None,
                QueryKind::ItemDetail => {}
            }
        })
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn with_notification(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> (Self, Uuid) {
        let mut next = self.clone();
        let id = next.notifications.push(message, kind, now);
        (next, id)
    }

    /// Drops toast `id` along with any other toast whose lifetime is over at `now`
    pub fn with_expired_notifications(&self, id: Uuid, now: Instant) -> Self {
        self.update(|s| {
            s.notifications.remove(id);
            s.notifications.expire(now);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::test_support::{item, recommendation_page, search_page};
    use std::time::Duration;

    fn initial() -> DiscoveryState {
        DiscoveryState::new(
            SessionContext::new("demo_user_1", ""),
            NotificationTiming::default(),
        )
    }

    #[test]
    fn test_initial_state() {
        let state = initial();
        assert_eq!(state.active_tab, Tab::Recommendations);
        assert!(state.recommendations.is_empty());
        assert!(state.search_results.is_empty());
        assert_eq!(state.error, None);
        assert_eq!(state.loading, LoadingFlags::default());
        assert!(state.notifications.is_empty());
    }

    #[test]
    fn test_transitions_leave_original_untouched() {
        let state = initial();
        let next = state.with_tab(Tab::Search).with_filter("music");

        assert_eq!(state.active_tab, Tab::Recommendations);
        assert_eq!(state.session.content_type_filter, "");
        assert_eq!(next.active_tab, Tab::Search);
        assert_eq!(next.session.content_type_filter, "music");
    }

    #[test]
    fn test_switching_tabs_keeps_both_result_sets() {
        let state = initial()
            .with_recommendations(recommendation_page(5, "xgboost_ml"))
            .with_search_submitted("jazz")
            .with_search_results("jazz".to_string(), search_page(2));

        let back = state.with_tab(Tab::Recommendations);
        assert_eq!(back.active_results().len(), 5);
        assert_eq!(back.search_results.len(), 2);
        assert_eq!(back.with_tab(Tab::Search).active_results().len(), 2);
    }

    #[test]
    fn test_failure_is_isolated_to_its_kind() {
        let state = initial()
            .with_recommendations(recommendation_page(4, "popularity_based"))
            .with_stats(StatsSnapshot {
                total_users: 10,
                ..Default::default()
            })
            .with_dispatched(QueryKind::Search);

        let failed = state.with_fetch_failure(QueryKind::Search, "search returned status 500");
        assert_eq!(
            failed.error.as_deref(),
            Some("Search failed: search returned status 500")
        );
        assert!(!failed.loading.search);
        assert_eq!(failed.recommendations.len(), 4);
        assert_eq!(failed.stats.as_ref().map(|s| s.total_users), Some(10));

        let stats_failed = state.with_fetch_failure(QueryKind::Stats, "timeout");
        assert_eq!(stats_failed.error, None);
        assert_eq!(stats_failed.stats.as_ref().map(|s| s.total_users), Some(10));
    }

    #[test]
    fn test_recommendation_failure_clears_list_and_sets_banner() {
        let state = initial().with_recommendations(recommendation_page(3, "xgboost_ml"));
        let failed = state.with_fetch_failure(QueryKind::Recommendations, "Network error");

        assert!(failed.recommendations.is_empty());
        assert_eq!(
            failed.error.as_deref(),
            Some("Failed to load recommendations: Network error")
        );

        let retried = failed.with_dispatched(QueryKind::Recommendations);
        assert_eq!(retried.error, None);
        assert!(retried.loading.recommendations);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_sweeps_overdue_toasts() {
        let start = Instant::now();
        let (state, first) = initial().with_notification("Liked", NotificationKind::Success, start);
        let (state, _) = state.with_notification(
            "Shared",
            NotificationKind::Success,
            start + Duration::from_millis(10),
        );
        let (state, _) = state.with_notification(
            "Bookmarked",
            NotificationKind::Success,
            start + Duration::from_secs(2),
        );

        // First toast's timer fires late; the second is overdue by then too
        let swept = state.with_expired_notifications(first, start + Duration::from_millis(3500));
        let left: Vec<&str> = swept.notifications.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(left, vec!["Bookmarked"]);

        // A second expiry for the same id changes nothing
        let again = swept.with_expired_notifications(first, start + Duration::from_millis(3500));
        assert_eq!(again.notifications, swept.notifications);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_detail_only_applies_to_open_item() {
        let opened = initial().with_selected(Some(SelectedItem {
            item: item("item_1"),
            detail: None,
            opened_at: Instant::now(),
        }));

        let other = opened.with_item_detail(ItemDetail {
            item: item("item_2"),
            similar_items: vec![],
        });
        assert_eq!(other.selected.as_ref().unwrap().detail, None);

        let matching = opened.with_item_detail(ItemDetail {
            item: item("item_1"),
            similar_items: vec![item("item_9")],
        });
        let detail = matching.selected.unwrap().detail.unwrap();
        assert_eq!(detail.similar_items.len(), 1);
    }
}
