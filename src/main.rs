use std::sync::Arc;

use anyhow::Context;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use discovery_controller::{
    config::Config,
    controller::{Controller, DiscoveryState, Intent, NotificationKind},
    models::{InteractionType, SearchType, Tab},
    services::providers::{DiscoveryApi, HttpDiscoveryApi},
};

const HELP: &str = "\
commands:
  search <query>          search with the current mode
  mode simple|ai          switch search mode
  user <id>               change user (reloads recommendations)
  filter [content type]   set or clear the content-type filter
  tab rec|search          switch result tab
  refresh                 reload the active tab, stats and experiment arm
  open <n> | close        open or close result n
  like|bookmark|share|purchase <n>
  quit";

enum Command {
    Intent(Intent),
    Help,
    Quit,
    Invalid(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    tracing::info!(api_url = %config.api_url, user_id = %config.user_id, "Starting discovery console");

    let api = Arc::new(HttpDiscoveryApi::new(config.api_url.clone()));
    tracing::debug!(provider = api.name(), "Recommendation client ready");
    match api.health().await {
        Ok(health) if health.is_healthy() => tracing::info!("Recommendation service healthy"),
        Ok(health) => tracing::warn!(services = ?health.services, "Recommendation service degraded"),
        Err(e) => tracing::warn!(error = %e, "Health check failed"),
    }

    let controller = Controller::new(api, &config);
    let view = controller.subscribe();
    let mut snapshots = controller.subscribe();

    let (intent_tx, intent_rx) = mpsc::channel(32);
    let driver = tokio::spawn(controller.run(intent_rx));

    let renderer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let state = snapshots.borrow_and_update().clone();
            render(&state);
        }
    });

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = parse_command(&line, &view.borrow());
        match command {
            Command::Intent(intent) => intent_tx
                .send(intent)
                .await
                .context("Controller stopped")?,
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Invalid(reason) => println!("? {}", reason),
        }
    }

    drop(intent_tx);
    driver.await.context("Controller task panicked")?;
    renderer.abort();

    Ok(())
}

fn parse_command(line: &str, state: &DiscoveryState) -> Command {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match verb {
        "" => Command::Invalid("empty command".to_string()),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "search" => Command::Intent(Intent::Search(rest.to_string())),
        "mode" => match rest.parse::<SearchType>() {
            Ok(search_type) => Command::Intent(Intent::SearchTypeChange(search_type)),
            Err(e) => Command::Invalid(e),
        },
        "user" => Command::Intent(Intent::UserChange(rest.to_string())),
        "filter" => Command::Intent(Intent::ContentTypeChange(rest.to_string())),
        "tab" => match rest {
            "rec" | "recommendations" => Command::Intent(Intent::ChangeTab(Tab::Recommendations)),
            "search" => Command::Intent(Intent::ChangeTab(Tab::Search)),
            other => Command::Invalid(format!("unknown tab '{}'", other)),
        },
        "refresh" => Command::Intent(Intent::Refresh),
        "close" => Command::Intent(Intent::CloseItem),
        "open" => match pick(state, rest) {
            Ok(index) => Command::Intent(Intent::ItemClick(
                state.active_results().items[index].clone(),
            )),
            Err(reason) => Command::Invalid(reason),
        },
        other => {
            let Ok(interaction_type) = other.parse::<InteractionType>() else {
                return Command::Invalid(format!("unknown command '{}'", other));
            };
            match pick(state, rest) {
                Ok(index) => {
                    let results = state.active_results();
                    let mut context = Map::new();
                    context.insert(
                        "source".to_string(),
                        Value::String(results.source_tab.as_str().to_string()),
                    );
                    Command::Intent(Intent::Interaction {
                        item_id: results.items[index].item_id.clone(),
                        interaction_type,
                        context,
                    })
                }
                Err(reason) => Command::Invalid(reason),
            }
        }
    }
}

/// Resolves a 1-based position in the visible list
fn pick(state: &DiscoveryState, arg: &str) -> Result<usize, String> {
    let position: usize = arg
        .parse()
        .map_err(|_| format!("expected a result number, got '{}'", arg))?;
    let len = state.active_results().len();
    if position == 0 || position > len {
        return Err(format!("no result {} ({} shown)", position, len));
    }
    Ok(position - 1)
}

fn render(state: &DiscoveryState) {
    let results = state.active_results();
    let loading = match state.active_tab {
        Tab::Recommendations => state.loading.recommendations,
        Tab::Search => state.loading.search,
    };
    let busy = if loading { " (loading)" } else { "" };

    println!();
    println!(
        "== {} | user: {} | filter: {} | mode: {}{}",
        state.active_tab,
        state.session.user_id,
        if state.session.content_type_filter.is_empty() {
            "all"
        } else {
            state.session.content_type_filter.as_str()
        },
        state.search_type.as_str(),
        busy
    );

    if let Some(assignment) = &state.ab_assignment {
        println!("   experiment: {} ({})", assignment.arm, assignment.bucket);
    }
    if let Some(stats) = &state.stats {
        println!(
            "   {} users, {} items, {} interactions, {} active today",
            stats.total_users, stats.total_items, stats.total_interactions, stats.active_users_24h
        );
    }
    if let Some(error) = &state.error {
        println!("!! {}", error);
    }

    match (&results.algorithm, &results.query) {
        (Some(algorithm), _) => println!("   algorithm: {}", algorithm),
        (_, Some(query)) => println!("   results for '{}'", query),
        _ => {}
    }
    for (i, item) in results.items.iter().enumerate() {
        println!(
            "{:>3}. {} [{} / {}] rating {:.1}",
            i + 1,
            item.title,
            item.content_type,
            item.category,
            item.rating
        );
    }

    if let Some(selected) = &state.selected {
        println!("-- {} --", selected.item.title);
        if !selected.item.description.is_empty() {
            println!("   {}", selected.item.description);
        }
        if let Some(detail) = &selected.detail {
            let similar: Vec<&str> = detail.similar_items.iter().map(|i| i.title.as_str()).collect();
            println!("   similar: {}", similar.join(", "));
        }
    }

    let now = Instant::now();
    let timing = state.notifications.timing();
    for notification in state.notifications.iter() {
        if notification.phase(now, timing).is_none() {
            continue;
        }
        let marker = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "!!",
        };
        println!("[{}] {}", marker, notification.message);
    }
}
