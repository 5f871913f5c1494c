//! Command-line demo for the cat list.
//!
//! Loads the first page (showing the cache first), loads one more page,
//! applies an optional search term from the command line and prints the
//! result along with a favorites summary.
//!
//! ```text
//! cat-list [search text]
//! ```

use anyhow::Context;
use cat_list::derive::{self, ListSnapshot, ViewFilter};
use cat_list::{
    CatApiClient, CatListAction, CatListConfig, CatListEnvironment, CatListReducer, FileCatStore,
    ListState,
};
use catalog_core::environment::SystemClock;
use catalog_core::ports::CatStore;
use catalog_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cat_list=info,catalog_runtime=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    catalog_runtime::metrics::describe_store_metrics();

    let config = CatListConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        base_url = %config.api.base_url,
        page_size = config.page_size,
        cache = %config.cache_path.display(),
        "Starting cat list"
    );

    let cache = Arc::new(
        FileCatStore::open(&config.cache_path)
            .await
            .context("failed to open cache")?,
    );
    let fetcher = Arc::new(CatApiClient::new(&config.api).context("failed to build API client")?);
    let env = CatListEnvironment::new(fetcher, cache.clone(), Arc::new(SystemClock));
    let store = Store::new(ListState::new(config.page_size), CatListReducer::new(), env);

    println!("=== Cat List ===\n");

    let mut handle = store.send_cascading(CatListAction::Initialize).await?;
    handle.wait_with_timeout(SETTLE_TIMEOUT).await?;

    let mut handle = store.send_cascading(CatListAction::LoadMore).await?;
    handle.wait_with_timeout(SETTLE_TIMEOUT).await?;

    let search: Vec<String> = std::env::args().skip(1).collect();
    if !search.is_empty() {
        store
            .send(CatListAction::SearchTextChanged {
                text: search.join(" "),
            })
            .await?;
    }

    // Mark the first visible cat so the summary has something to show
    let first = store
        .state(|s| derive::visible_cats(s, ViewFilter::All).first().map(|cat| cat.uuid))
        .await;
    if let Some(id) = first {
        store.send(CatListAction::ToggleFavorite { id }).await?;
    }

    let snapshot = store.state(|s| ListSnapshot::capture(s, ViewFilter::All)).await;
    print_snapshot(&snapshot);

    let summary = store.state(derive::favorites_summary).await;
    println!("\nFavorites: {}", summary.count);
    if let Some(years) = summary.average_lifespan {
        println!("  average lifespan: {years:.1} years");
    }
    for (origin, count) in &summary.origins {
        println!("  {origin}: {count}");
    }

    store.shutdown(SETTLE_TIMEOUT).await?;
    cache.flush().await.context("failed to write cache")?;

    println!("\n=== Done ===");
    Ok(())
}

fn print_snapshot(snapshot: &ListSnapshot) {
    if let Some(alert) = &snapshot.error_alert {
        println!("! {}{}", alert.message, if alert.retryable { " (retry available)" } else { "" });
    }

    if !snapshot.search_text.is_empty() {
        println!("Search: {:?}", snapshot.search_text);
    }

    println!("{} cats ({:?})", snapshot.cats.len(), snapshot.phase);
    for cat in &snapshot.cats {
        let marker = if cat.is_favorite { "★" } else { " " };
        let origin = cat
            .first_breed()
            .and_then(|breed| breed.origin.as_deref())
            .unwrap_or("-");
        println!("  [{marker}] {:<24} {origin}", cat.display_name());
    }

    if let Some(years) = snapshot.average_lifespan {
        println!("Average lifespan: {years:.1} years");
    }
}
