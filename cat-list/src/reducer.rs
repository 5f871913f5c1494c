//! Reducer for the cat list.
//!
//! Every transition of [`ListState`] happens here, one action at a time.
//! Talking to the outside world is left to the effects this reducer returns:
//! page requests feed their result back as `FetchSucceeded`/`FetchFailed`,
//! cache writes run in the background and never feed anything back.

use crate::types::{CatDetail, CatListAction, ErrorAlert, ListState};
use catalog_core::model::{Cat, CatId};
use catalog_core::ports::{CatFetcher, CatStore};
use catalog_core::{
    SmallVec, async_effect, background_effect, effect::Effect, environment::Clock,
    reducer::Reducer, smallvec,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Environment dependencies for the cat list reducer
#[derive(Clone)]
pub struct CatListEnvironment {
    /// Remote paginated source
    pub fetcher: Arc<dyn CatFetcher>,
    /// Local cache and favorite store
    pub cache: Arc<dyn CatStore>,
    /// Clock for refresh timestamps
    pub clock: Arc<dyn Clock>,
}

impl CatListEnvironment {
    /// Creates a new `CatListEnvironment`
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn CatFetcher>,
        cache: Arc<dyn CatStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            clock,
        }
    }
}

/// Reducer for the cat list
#[derive(Clone, Debug, Default)]
pub struct CatListReducer;

impl CatListReducer {
    /// Creates a new `CatListReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Request `page` and feed the outcome back
    fn fetch_page(env: &CatListEnvironment, page: u32, limit: u32) -> Effect<CatListAction> {
        let fetcher = Arc::clone(&env.fetcher);
        async_effect! {
            match fetcher.fetch_page(page, limit).await {
                Ok(cats) => Some(CatListAction::FetchSucceeded { cats }),
                Err(error) => Some(CatListAction::FetchFailed { error }),
            }
        }
    }

    /// Write the cache to disk once the preceding write finished
    fn flush_cache(env: &CatListEnvironment) -> Effect<CatListAction> {
        let cache = Arc::clone(&env.cache);
        background_effect! {
            if let Err(error) = cache.flush().await {
                tracing::warn!(%error, "Failed to flush cache");
            }
        }
    }

    /// Save a page to the cache, then flush; failures are logged and dropped
    fn persist_cats(env: &CatListEnvironment, cats: Vec<Cat>) -> Effect<CatListAction> {
        let cache = Arc::clone(&env.cache);
        let upsert = background_effect! {
            let count = cats.len();
            if let Err(error) = cache.upsert_cats(cats).await {
                tracing::warn!(%error, count, "Failed to cache page");
            }
        };
        Effect::chain(vec![upsert, Self::flush_cache(env)])
    }

    /// Persist a favorite toggle, then flush; failures are logged and dropped
    fn persist_toggle(env: &CatListEnvironment, id: CatId) -> Effect<CatListAction> {
        let cache = Arc::clone(&env.cache);
        let toggle = background_effect! {
            if let Err(error) = cache.toggle_favorite(id).await {
                tracing::warn!(%error, %id, "Failed to persist favorite toggle");
            }
        };
        Effect::chain(vec![toggle, Self::flush_cache(env)])
    }

    /// Stamp the derived favorite flag from the favorite set
    fn stamp_favorite(state: &ListState, mut cat: Cat) -> Cat {
        cat.is_favorite = state.favorite_ids.contains(&cat.uuid);
        cat
    }

    /// Drop later occurrences of a surrogate id, keeping order
    fn unique(cats: Vec<Cat>) -> Vec<Cat> {
        let mut seen = HashSet::with_capacity(cats.len());
        cats.into_iter().filter(|cat| seen.insert(cat.uuid)).collect()
    }

    fn initialize(state: &mut ListState, env: &CatListEnvironment) -> SmallVec<[Effect<CatListAction>; 4]> {
        if state.has_loaded_initial {
            tracing::debug!("Initial load already started, ignoring");
            return SmallVec::new();
        }

        let favorites = env.cache.favorite_cats().unwrap_or_else(|error| {
            tracing::warn!(%error, "Failed to read cached favorites");
            Vec::new()
        });
        state
            .favorite_ids
            .extend(favorites.iter().map(|cat| cat.uuid));

        let cached = env.cache.all_cats().unwrap_or_else(|error| {
            tracing::warn!(%error, "Failed to read cached cats");
            Vec::new()
        });
        let cached: Vec<Cat> = cached
            .into_iter()
            .map(|cat| Self::stamp_favorite(state, cat))
            .collect();
        state.cats = Self::unique(cached);

        state.is_loading = true;
        state.has_loaded_initial = true;

        tracing::debug!(
            cached = state.cats.len(),
            favorites = state.favorite_ids.len(),
            page = state.current_page,
            "Initial load started"
        );

        smallvec![Self::fetch_page(env, state.current_page, state.page_size)]
    }

    fn fetch_succeeded(
        state: &mut ListState,
        cats: Vec<Cat>,
        env: &CatListEnvironment,
    ) -> SmallVec<[Effect<CatListAction>; 4]> {
        state.is_loading = false;
        state.is_loading_more = false;

        let incoming: Vec<Cat> = cats
            .into_iter()
            .map(|cat| Self::stamp_favorite(state, cat))
            .collect();
        let received = incoming.len();

        if state.current_page == 1 {
            state.cats = Self::unique(incoming.clone());
        } else {
            let mut present: HashSet<CatId> = state.cats.iter().map(|cat| cat.uuid).collect();
            state.cats.extend(
                incoming
                    .iter()
                    .filter(|cat| present.insert(cat.uuid))
                    .cloned(),
            );
        }

        tracing::debug!(
            page = state.current_page,
            received,
            total = state.cats.len(),
            "Page applied"
        );

        state.current_page = state.current_page.saturating_add(1);
        state.can_load_more = received > 0;
        state.last_refreshed_at = Some(env.clock.now());

        if incoming.is_empty() {
            SmallVec::new()
        } else {
            smallvec![Self::persist_cats(env, incoming)]
        }
    }

    fn toggle_favorite(
        state: &mut ListState,
        id: CatId,
        env: &CatListEnvironment,
    ) -> SmallVec<[Effect<CatListAction>; 4]> {
        let now_favorite = if state.favorite_ids.remove(&id) {
            false
        } else {
            state.favorite_ids.insert(id);
            true
        };

        if let Some(cat) = state.cats.iter_mut().find(|cat| cat.uuid == id) {
            cat.is_favorite = now_favorite;
        }

        if let Some(detail) = state.selected.as_mut().filter(|d| d.cat.uuid == id) {
            detail.is_favorite = now_favorite;
            detail.cat.is_favorite = now_favorite;
        }

        tracing::debug!(%id, now_favorite, "Favorite toggled");

        smallvec![Self::persist_toggle(env, id)]
    }
}

impl Reducer for CatListReducer {
    type State = ListState;
    type Action = CatListAction;
    type Environment = CatListEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Intents ==========
            CatListAction::Initialize => Self::initialize(state, env),

            CatListAction::LoadMore => {
                if !state.accepts_load_more() {
                    tracing::trace!(
                        can_load_more = state.can_load_more,
                        is_loading = state.is_loading,
                        is_loading_more = state.is_loading_more,
                        "LoadMore dropped"
                    );
                    return SmallVec::new();
                }

                state.is_loading_more = true;
                smallvec![Self::fetch_page(env, state.current_page, state.page_size)]
            },

            CatListAction::Retry => {
                state.current_page = 1;
                state.error_alert = None;
                state.is_loading = true;
                smallvec![Self::fetch_page(env, 1, state.page_size)]
            },

            CatListAction::DismissError => {
                state.error_alert = None;
                SmallVec::new()
            },

            CatListAction::ToggleFavorite { id } => Self::toggle_favorite(state, id, env),

            CatListAction::SearchTextChanged { text } => {
                state.search_text = text;
                SmallVec::new()
            },

            CatListAction::SelectCat { id } => {
                match state.get(&id).cloned() {
                    Some(cat) => {
                        let is_favorite = state.favorite_ids.contains(&id);
                        state.selected = Some(CatDetail { cat, is_favorite });
                    },
                    None => tracing::debug!(%id, "Selected cat is not loaded, ignoring"),
                }
                SmallVec::new()
            },

            CatListAction::ClearSelection => {
                state.selected = None;
                SmallVec::new()
            },

            // ========== Port results ==========
            CatListAction::FetchSucceeded { cats } => Self::fetch_succeeded(state, cats, env),

            CatListAction::FetchFailed { error } => {
                tracing::warn!(%error, page = state.current_page, "Page request failed");
                state.is_loading = false;
                state.is_loading_more = false;
                state.error_alert = Some(ErrorAlert::from_network(&error));
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ListPhase;
    use catalog_core::ports::NetworkError;
    use catalog_testing::{
        InMemoryCatStore, ReducerTest, ScriptedFetcher, assertions, fixtures, test_clock,
    };

    fn env_with_cache(cache: InMemoryCatStore) -> CatListEnvironment {
        CatListEnvironment::new(
            Arc::new(ScriptedFetcher::new()),
            Arc::new(cache),
            Arc::new(test_clock()),
        )
    }

    fn create_test_env() -> CatListEnvironment {
        env_with_cache(InMemoryCatStore::new())
    }

    /// State after the first page arrived
    fn loaded_state(cats: Vec<Cat>) -> ListState {
        let mut state = ListState::new(20);
        state.has_loaded_initial = true;
        state.is_loading = true;
        let _ = CatListReducer::fetch_succeeded(&mut state, cats, &create_test_env());
        state
    }

    fn uuids(state: &ListState) -> Vec<CatId> {
        state.cats.iter().map(|cat| cat.uuid).collect()
    }

    #[test]
    fn test_initialize_shows_cache_and_requests_first_page() {
        let a = fixtures::siamese_cat(1);
        let b = fixtures::persian_cat(2);
        let cache = InMemoryCatStore::seeded(vec![a.clone(), b.clone()], &[b.uuid]);

        ReducerTest::new(CatListReducer::new())
            .with_env(env_with_cache(cache))
            .given_state(ListState::new(20))
            .when_action(CatListAction::Initialize)
            .then_state(move |state| {
                assert_eq!(uuids(state), vec![a.uuid, b.uuid]);
                assert!(state.is_favorite(&b.uuid));
                assert!(state.get(&b.uuid).unwrap().is_favorite);
                assert!(!state.get(&a.uuid).unwrap().is_favorite);
                assert!(state.is_loading);
                assert!(state.has_loaded_initial);
                assert_eq!(state.phase(), ListPhase::LoadingInitial);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_second_initialize_is_noop() {
        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(ListState::new(20))
            .when_action(CatListAction::Initialize)
            .when_action(CatListAction::Initialize)
            .then_state(|state| assert!(state.is_loading))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_initialize_survives_unreadable_cache() {
        let cache = InMemoryCatStore::seeded(vec![fixtures::siamese_cat(1)], &[]);
        cache.fail_reads(true);

        ReducerTest::new(CatListReducer::new())
            .with_env(env_with_cache(cache))
            .given_state(ListState::new(20))
            .when_action(CatListAction::Initialize)
            .then_state(|state| {
                assert!(state.cats.is_empty());
                assert!(state.error_alert.is_none());
                assert!(state.is_loading);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_first_page_replaces_later_page_appends() {
        let cache = InMemoryCatStore::seeded(
            vec![fixtures::siamese_cat(1), fixtures::siamese_cat(2)],
            &[],
        );
        let (c, d, e) = (
            fixtures::persian_cat(3),
            fixtures::persian_cat(4),
            fixtures::persian_cat(5),
        );
        let expected = vec![c.uuid, d.uuid, e.uuid];

        ReducerTest::new(CatListReducer::new())
            .with_env(env_with_cache(cache))
            .given_state(ListState::new(20))
            .when_action(CatListAction::Initialize)
            .when_action(CatListAction::FetchSucceeded { cats: vec![c, d] })
            .when_action(CatListAction::FetchSucceeded { cats: vec![e] })
            .then_state(move |state| {
                assert_eq!(uuids(state), expected);
                assert_eq!(state.current_page, 3);
                assert!(!state.is_loading);
                assert!(state.last_refreshed_at.is_some());
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 2))
            .run();
    }

    #[test]
    fn test_append_skips_known_surrogates() {
        let x = fixtures::siamese_cat(7);
        let expected = vec![x.uuid];

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(vec![x.clone()]))
            .when_action(CatListAction::FetchSucceeded { cats: vec![x] })
            .then_state(move |state| {
                assert_eq!(uuids(state), expected);
                assert_eq!(state.current_page, 3);
            })
            .run();
    }

    #[test]
    fn test_shared_external_id_does_not_merge_records() {
        let first = fixtures::siamese_cat(1);
        // Distinct record that reuses the first one's external id
        let mut second = fixtures::persian_cat(2);
        second.id = first.id.clone();
        let expected = vec![first.uuid, second.uuid];

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(vec![first]))
            .when_action(CatListAction::FetchSucceeded {
                cats: vec![second.clone()],
            })
            .then_state(move |state| {
                assert_eq!(uuids(state), expected);
                assert_eq!(state.get(&second.uuid).unwrap().breeds, second.breeds);
            })
            .run();
    }

    #[test]
    fn test_shared_external_id_within_first_page_keeps_both() {
        let first = fixtures::siamese_cat(1);
        let mut second = fixtures::persian_cat(2);
        second.id = first.id.clone();
        let expected = vec![first.uuid, second.uuid];

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(ListState::new(20))
            .when_action(CatListAction::FetchSucceeded {
                cats: vec![first, second],
            })
            .then_state(move |state| assert_eq!(uuids(state), expected))
            .then_effects(|effects| assertions::assert_effects_count(effects, 2))
            .run();
    }

    #[test]
    fn test_records_without_external_id_stay_distinct() {
        let first = Cat::new(None, Some("https://cdn/a.jpg".to_string()));
        let second = Cat::new(None, Some("https://cdn/a.jpg".to_string()));

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(vec![first]))
            .when_action(CatListAction::FetchSucceeded {
                cats: vec![second],
            })
            .then_state(|state| assert_eq!(state.cats.len(), 2))
            .run();
    }

    #[test]
    fn test_empty_page_exhausts_pagination() {
        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(fixtures::page(1, 3)))
            .when_action(CatListAction::FetchSucceeded { cats: vec![] })
            .when_action(CatListAction::LoadMore)
            .then_state(|state| {
                assert!(!state.can_load_more);
                assert!(!state.is_loading_more);
                assert_eq!(state.cats.len(), 3);
                assert_eq!(state.phase(), ListPhase::Exhausted);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_load_more_requests_current_page_once() {
        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(fixtures::page(1, 2)))
            .when_action(CatListAction::LoadMore)
            .then_state(|state| {
                assert!(state.is_loading_more);
                assert_eq!(state.phase(), ListPhase::LoadingMore);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(fixtures::page(1, 2)))
            .when_action(CatListAction::LoadMore)
            .when_action(CatListAction::LoadMore)
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_load_more_ignored_while_initial_load_runs() {
        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(ListState::new(20))
            .when_action(CatListAction::Initialize)
            .when_action(CatListAction::LoadMore)
            .then_state(|state| assert!(!state.is_loading_more))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_failure_keeps_cats_and_raises_retryable_alert() {
        let cats = fixtures::page(1, 4);
        let expected: Vec<CatId> = cats.iter().map(|cat| cat.uuid).collect();

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(cats))
            .when_action(CatListAction::LoadMore)
            .when_action(CatListAction::FetchFailed {
                error: NetworkError::Transport("timed out".to_string()),
            })
            .then_state(move |state| {
                assert_eq!(uuids(state), expected);
                assert!(!state.is_loading_more);
                let alert = state.error_alert.as_ref().unwrap();
                assert!(alert.retryable);
                assert!(alert.message.contains("timed out"));
                assert_eq!(state.current_page, 2);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_retry_resets_cursor_and_keeps_cats() {
        let mut state = loaded_state(fixtures::page(1, 2));
        state.error_alert = Some(ErrorAlert {
            message: "boom".to_string(),
            retryable: true,
        });
        state.current_page = 4;

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(CatListAction::Retry)
            .then_state(|state| {
                assert_eq!(state.current_page, 1);
                assert!(state.error_alert.is_none());
                assert!(state.is_loading);
                assert_eq!(state.cats.len(), 2);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_dismiss_error_leaves_list_alone() {
        let mut state = loaded_state(fixtures::page(1, 2));
        state.error_alert = Some(ErrorAlert {
            message: "boom".to_string(),
            retryable: true,
        });

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(CatListAction::DismissError)
            .then_state(|state| {
                assert!(state.error_alert.is_none());
                assert_eq!(state.current_page, 2);
                assert_eq!(state.phase(), ListPhase::Ready);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_toggle_twice_restores_favorites_and_order() {
        let cats = fixtures::page(1, 3);
        let target = cats[1].uuid;
        let before = loaded_state(cats);
        let expected = before.clone();

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(before)
            .when_action(CatListAction::ToggleFavorite { id: target })
            .when_action(CatListAction::ToggleFavorite { id: target })
            .then_state(move |state| {
                assert_eq!(state.favorite_ids, expected.favorite_ids);
                assert_eq!(state.cats, expected.cats);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 2))
            .run();
    }

    #[test]
    fn test_toggle_updates_open_detail_in_lockstep() {
        let cats = fixtures::page(1, 2);
        let target = cats[0].uuid;

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(cats))
            .when_action(CatListAction::SelectCat { id: target })
            .when_action(CatListAction::ToggleFavorite { id: target })
            .then_state(move |state| {
                let detail = state.selected.as_ref().unwrap();
                assert!(detail.is_favorite);
                assert!(detail.cat.is_favorite);
                assert!(state.get(&target).unwrap().is_favorite);
                assert_eq!(state.selected_id(), Some(target));
            })
            .run();
    }

    #[test]
    fn test_toggle_of_other_cat_leaves_detail_alone() {
        let cats = fixtures::page(1, 2);
        let (shown, other) = (cats[0].uuid, cats[1].uuid);

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(cats))
            .when_action(CatListAction::SelectCat { id: shown })
            .when_action(CatListAction::ToggleFavorite { id: other })
            .then_state(|state| {
                assert!(!state.selected.as_ref().unwrap().is_favorite);
            })
            .run();
    }

    #[test]
    fn test_select_unknown_cat_is_ignored() {
        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(fixtures::page(1, 2)))
            .when_action(CatListAction::SelectCat {
                id: fixtures::cat_id(99),
            })
            .then_state(|state| assert!(state.selected.is_none()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_clear_selection() {
        let cats = fixtures::page(1, 1);
        let id = cats[0].uuid;

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(cats))
            .when_action(CatListAction::SelectCat { id })
            .when_action(CatListAction::ClearSelection)
            .then_state(|state| assert!(state.selected.is_none()))
            .run();
    }

    #[test]
    fn test_search_text_does_not_touch_cats() {
        let cats = fixtures::page(1, 3);

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(loaded_state(cats))
            .when_action(CatListAction::SearchTextChanged {
                text: "no such breed".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.search_text, "no such breed");
                assert_eq!(state.cats.len(), 3);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_page_arriving_stamps_favorites() {
        let cat = fixtures::siamese_cat(1);
        let mut state = ListState::new(20);
        state.favorite_ids.insert(cat.uuid);

        ReducerTest::new(CatListReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(CatListAction::FetchSucceeded { cats: vec![cat] })
            .then_state(|state| assert!(state.cats[0].is_favorite))
            .run();
    }
}
