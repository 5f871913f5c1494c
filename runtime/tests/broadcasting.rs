//! Integration tests for Store action broadcasting
//!
//! Observers see every action an effect feeds back, which is how a UI layer
//! follows page results without polling state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use catalog_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use catalog_runtime::{Store, StoreError};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum PageAction {
    /// Ask for a page
    Request { page: u32 },
    /// Page arrived
    Loaded { page: u32, size: usize },
    /// Page request failed
    Failed { page: u32 },
}

#[derive(Debug, Clone, Default)]
struct PageState {
    loaded: Vec<u32>,
}

#[derive(Clone)]
struct PageEnvironment;

#[derive(Clone)]
struct PageReducer;

impl Reducer for PageReducer {
    type State = PageState;
    type Action = PageAction;
    type Environment = PageEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PageAction::Request { page } if page == 0 => {
                smallvec![async_effect! { Some(PageAction::Failed { page }) }]
            },
            PageAction::Request { page } => smallvec![async_effect! {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Some(PageAction::Loaded { page, size: 20 })
            }],
            PageAction::Loaded { page, .. } => {
                state.loaded.push(page);
                SmallVec::new()
            },
            PageAction::Failed { .. } => SmallVec::new(),
        }
    }
}

fn page_store() -> Store<PageState, PageAction, PageEnvironment, PageReducer> {
    // Store debug logs show up under `--nocapture`
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();

    Store::new(PageState::default(), PageReducer, PageEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_subscriber_sees_effect_actions() {
    let store = page_store();
    let mut rx = store.subscribe_actions();

    let _ = store.send(PageAction::Request { page: 1 }).await.unwrap();

    let observed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(observed, PageAction::Loaded { page: 1, size: 20 });
}

#[tokio::test]
async fn test_sent_actions_are_not_broadcast() {
    let store = page_store();
    let mut rx = store.subscribe_actions();

    let _ = store.send(PageAction::Loaded { page: 7, size: 1 }).await.unwrap();

    assert!(rx.try_recv().is_err());
    assert_eq!(store.state(|s| s.loaded.clone()).await, vec![7]);
}

#[tokio::test]
async fn test_send_and_wait_for_returns_terminal_action() {
    let store = page_store();

    let result = store
        .send_and_wait_for(
            PageAction::Request { page: 0 },
            |a| matches!(a, PageAction::Loaded { .. } | PageAction::Failed { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(result, PageAction::Failed { page: 0 });
}

#[tokio::test]
async fn test_send_and_wait_for_times_out() {
    let store = page_store();

    let result = store
        .send_and_wait_for(
            PageAction::Request { page: 2 },
            |a| matches!(a, PageAction::Failed { .. }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn test_concurrent_requests_all_land() {
    let store = page_store();

    let handles: Vec<_> = (1..=5)
        .map(|page| {
            let store = store.clone();
            tokio::spawn(async move {
                let mut handle = store.send(PageAction::Request { page }).await.unwrap();
                handle.wait().await;
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let mut loaded = store.state(|s| s.loaded.clone()).await;
    loaded.sort_unstable();
    assert_eq!(loaded, vec![1, 2, 3, 4, 5]);
}
