use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::models::{InteractionEvent, InteractionType, ResultItem, SearchSpec, SearchType, Tab};

use super::{Controller, SelectedItem};

/// User intents coming from the view layer
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Search(String),
    SearchTypeChange(SearchType),
    UserChange(String),
    ContentTypeChange(String),
    ChangeTab(Tab),
    Refresh,
    ItemClick(ResultItem),
    CloseItem,
    Interaction {
        item_id: String,
        interaction_type: InteractionType,
        context: Map<String, Value>,
    },
}

impl Controller {
    pub fn dispatch(&mut self, intent: Intent) {
        tracing::debug!(?intent, "Handling intent");

        match intent {
            Intent::Search(query) => self.submit_search(&query),
            Intent::SearchTypeChange(search_type) => self.change_search_type(search_type),
            Intent::UserChange(user_id) => self.change_user(&user_id),
            Intent::ContentTypeChange(content_type) => self.change_filter(&content_type),
            Intent::ChangeTab(tab) => self.change_tab(tab),
            Intent::Refresh => self.refresh(),
            Intent::ItemClick(item) => self.open_item(item),
            Intent::CloseItem => self.close_item(),
            Intent::Interaction {
                item_id,
                interaction_type,
                context,
            } => self.emit_interaction(&item_id, interaction_type, context),
        }
    }

    /// Switches to the search tab and searches with the current mode; blank input is ignored
    pub fn submit_search(&mut self, query: &str) {
        let Some(spec) = SearchSpec::new(query, self.state.search_type) else {
            tracing::debug!("Ignoring empty search");
            return;
        };

        let next = self.state.with_search_submitted(&spec.query);
        self.replace(next);
        self.fetch_search(&spec);
    }

    pub fn change_tab(&mut self, tab: Tab) {
        if self.state.active_tab == tab {
            return;
        }
        let next = self.state.with_tab(tab);
        self.replace(next);
    }

    /// Updates the filter only; it applies from the next fetch onwards
    pub fn change_filter(&mut self, content_type: &str) {
        let next = self.state.with_filter(content_type);
        self.replace(next);
    }

    pub fn change_search_type(&mut self, search_type: SearchType) {
        let next = self.state.with_search_type(search_type);
        self.replace(next);
    }

    /// Updates the user id, re-fetching user-scoped data if it actually changed
    pub fn change_user(&mut self, user_id: &str) {
        let previous = self.state.session.user().map(str::to_string);
        let next = self.state.with_user(user_id);
        self.replace(next);

        if self.state.session.user().map(str::to_string) == previous {
            return;
        }

        tracing::info!(
            user_id = %self.state.session.user_id,
            "User changed, reloading user-scoped data"
        );
        self.fetch_recommendations();
        self.fetch_ab_arm();
    }

    /// Re-issues the active tab's query plus stats and experiment arm
    pub fn refresh(&mut self) {
        match self.state.active_tab {
            Tab::Recommendations => self.fetch_recommendations(),
            Tab::Search => {
                let spec = self
                    .state
                    .last_search_query
                    .as_deref()
                    .and_then(|query| SearchSpec::new(query, self.state.search_type));
                if let Some(spec) = spec {
                    self.fetch_search(&spec);
                }
            }
        }
        self.fetch_stats();
        self.fetch_ab_arm();
    }

    /// Opens the detail panel for `item`, recording a click
    pub fn open_item(&mut self, item: ResultItem) {
        if self.state.selected.is_some() {
            self.close_item();
        }

        let results = self.state.active_results();
        let mut context = Map::new();
        context.insert(
            "source".to_string(),
            Value::String(results.source_tab.as_str().to_string()),
        );
        if let Some(algorithm) = &results.algorithm {
            context.insert("algorithm".to_string(), Value::String(algorithm.clone()));
        }

        let item_id = item.item_id.clone();
        let next = self.state.with_selected(Some(SelectedItem {
            item,
            detail: None,
            opened_at: Instant::now(),
        }));
        self.replace(next);

        self.emit_interaction(&item_id, InteractionType::Click, context);
        self.fetch_item_detail(&item_id);
    }

    /// Closes the detail panel, recording a view with the time it was open
    pub fn close_item(&mut self) {
        let Some(selected) = self.state.selected.clone() else {
            return;
        };
        let next = self.state.with_selected(None);
        self.replace(next);

        let Some(user_id) = self.state.session.user() else {
            return;
        };
        let event = InteractionEvent::new(
            user_id,
            &selected.item.item_id,
            InteractionType::View,
            Map::new(),
        )
        .with_dwell(selected.opened_at.elapsed().as_secs());
        self.emitter.emit(event);
    }

    /// Records an interaction for the current user; nothing is sent without one
    pub fn emit_interaction(
        &mut self,
        item_id: &str,
        interaction_type: InteractionType,
        context: Map<String, Value>,
    ) {
        let Some(user_id) = self.state.session.user() else {
            tracing::debug!(item_id, "Skipping interaction: empty user id");
            return;
        };
        let event = InteractionEvent::new(user_id, item_id, interaction_type, context);
        self.emitter.emit(event);
    }
}
