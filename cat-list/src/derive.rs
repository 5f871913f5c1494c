//! Read-only views computed from [`ListState`].
//!
//! Nothing here mutates state. The UI calls these on every render, so they
//! borrow instead of cloning where they can.

use crate::types::{ErrorAlert, ListPhase, ListState};
use catalog_core::model::Cat;
use std::collections::BTreeMap;

/// Which slice of the list the UI shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewFilter {
    /// Every loaded cat, narrowed by the search text
    #[default]
    All,
    /// Favorites only; search text is not applied
    Favorites,
}

/// Cats to display, in stored order
#[must_use]
pub fn visible_cats(state: &ListState, filter: ViewFilter) -> Vec<&Cat> {
    match filter {
        ViewFilter::Favorites => favorite_cats(state),
        ViewFilter::All => {
            let needle = state.search_text.as_str();
            if needle.is_empty() {
                state.cats.iter().collect()
            } else {
                state
                    .cats
                    .iter()
                    .filter(|cat| matches_search(cat, needle))
                    .collect()
            }
        },
    }
}

/// Whether the first breed's name, origin or temperament contains `needle`,
/// ignoring case. Cats without breeds never match.
#[must_use]
pub fn matches_search(cat: &Cat, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let Some(breed) = cat.first_breed() else {
        return false;
    };

    [
        Some(breed.name.as_str()),
        breed.origin.as_deref(),
        breed.temperament.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Loaded cats that are in the favorite set, in stored order
#[must_use]
pub fn favorite_cats(state: &ListState) -> Vec<&Cat> {
    state
        .cats
        .iter()
        .filter(|cat| state.favorite_ids.contains(&cat.uuid))
        .collect()
}

/// Years from a free-text lifespan such as `"12 - 15"` or `"14"`.
///
/// One number gives that number; two or more give the midpoint of the first
/// and the last. Text without numbers gives `None`.
#[must_use]
pub fn parse_lifespan(text: &str) -> Option<f64> {
    let numbers: Vec<f64> = text
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<f64>().ok())
        .collect();

    match numbers.as_slice() {
        [] => None,
        [single] => Some(*single),
        [first, .., last] => Some((first + last) / 2.0),
    }
}

/// Lifespan of a cat's first breed, when it has a parseable one
#[must_use]
pub fn cat_lifespan(cat: &Cat) -> Option<f64> {
    cat.first_breed()
        .and_then(|breed| breed.life_span.as_deref())
        .and_then(parse_lifespan)
}

/// Mean lifespan over the cats that have one
#[must_use]
pub fn average_lifespan<'a, I>(cats: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Cat>,
{
    let (sum, count) = cats
        .into_iter()
        .filter_map(cat_lifespan)
        .fold((0.0_f64, 0_u32), |(sum, count), years| (sum + years, count + 1));

    (count > 0).then(|| sum / f64::from(count))
}

/// Aggregate figures for the favorites tab
#[derive(Clone, Debug, PartialEq)]
pub struct FavoritesSummary {
    /// Number of loaded favorites
    pub count: usize,
    /// Mean first-breed lifespan across favorites
    pub average_lifespan: Option<f64>,
    /// Favorites per breed origin; cats without an origin are left out
    pub origins: BTreeMap<String, usize>,
}

/// Summarize the loaded favorites
#[must_use]
pub fn favorites_summary(state: &ListState) -> FavoritesSummary {
    let favorites = favorite_cats(state);

    let mut origins = BTreeMap::new();
    for origin in favorites
        .iter()
        .filter_map(|cat| cat.first_breed().and_then(|breed| breed.origin.clone()))
    {
        *origins.entry(origin).or_insert(0) += 1;
    }

    FavoritesSummary {
        count: favorites.len(),
        average_lifespan: average_lifespan(favorites.iter().copied()),
        origins,
    }
}

/// Point-in-time view of the list for rendering
#[derive(Clone, Debug, PartialEq)]
pub struct ListSnapshot {
    /// Cats to display, with favorite flags stamped
    pub cats: Vec<Cat>,
    /// Which slice `cats` is
    pub filter: ViewFilter,
    /// Current search text
    pub search_text: String,
    /// Derived phase
    pub phase: ListPhase,
    /// Whether a spinner should show for the first page
    pub is_loading: bool,
    /// Whether a footer spinner should show
    pub is_loading_more: bool,
    /// Whether scrolling to the end should ask for more
    pub can_load_more: bool,
    /// Error to show, if any
    pub error_alert: Option<ErrorAlert>,
    /// Mean lifespan of the visible cats
    pub average_lifespan: Option<f64>,
}

impl ListSnapshot {
    /// Capture the current view of `state`
    #[must_use]
    pub fn capture(state: &ListState, filter: ViewFilter) -> Self {
        let visible = visible_cats(state, filter);
        let average_lifespan = average_lifespan(visible.iter().copied());
        let cats = visible
            .into_iter()
            .map(|cat| {
                let mut cat = cat.clone();
                cat.is_favorite = state.favorite_ids.contains(&cat.uuid);
                cat
            })
            .collect();

        Self {
            cats,
            filter,
            search_text: state.search_text.clone(),
            phase: state.phase(),
            is_loading: state.is_loading,
            is_loading_more: state.is_loading_more,
            can_load_more: state.can_load_more,
            error_alert: state.error_alert.clone(),
            average_lifespan,
        }
    }

    /// Whether there is nothing to show
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cats.is_empty()
    }
}
