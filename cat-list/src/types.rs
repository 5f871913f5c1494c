//! State and action types for the cat list.
//!
//! The list owns three pieces of data that come from different places:
//! cats loaded page by page from the remote API, cats restored from the local
//! cache, and the set of favorites the user toggled. [`ListState`] keeps all
//! three in one place; [`CatListAction`] is everything that can change it.

use catalog_core::model::{Cat, CatId};
use catalog_core::ports::NetworkError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default number of cats per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// User-visible error with a retry affordance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAlert {
    /// Human-readable description of what failed
    pub message: String,
    /// Whether the UI should offer a retry
    pub retryable: bool,
}

impl ErrorAlert {
    /// Retryable alert for a failed page request
    #[must_use]
    pub fn from_network(error: &NetworkError) -> Self {
        Self {
            message: error.to_string(),
            retryable: true,
        }
    }
}

/// The cat open in the detail view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatDetail {
    /// Copy of the selected cat
    pub cat: Cat,
    /// Favorite flag shown in the detail view, kept in lockstep with the list
    pub is_favorite: bool,
}

/// Phase of the list, derived from the loading and error flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListPhase {
    /// Nothing requested yet
    Idle,
    /// First page (or a retry) in flight
    LoadingInitial,
    /// A later page in flight
    LoadingMore,
    /// Loaded, more pages available
    Ready,
    /// Loaded, the last request returned an empty page
    Exhausted,
    /// The last request failed
    Errored,
}

/// State of one cat list scope
#[derive(Clone, Debug, PartialEq)]
pub struct ListState {
    /// Loaded cats in page order, unique by surrogate id
    pub cats: Vec<Cat>,
    /// Authoritative favorite set
    pub favorite_ids: HashSet<CatId>,
    /// Next page to request (1-based)
    pub current_page: u32,
    /// Cats per page, fixed for the session
    pub page_size: u32,
    /// First page or retry in flight
    pub is_loading: bool,
    /// Later page in flight
    pub is_loading_more: bool,
    /// False once a page comes back empty
    pub can_load_more: bool,
    /// Guards against a second initial load
    pub has_loaded_initial: bool,
    /// Current search query
    pub search_text: String,
    /// Error shown to the user
    pub error_alert: Option<ErrorAlert>,
    /// Cat open in the detail view
    pub selected: Option<CatDetail>,
    /// When the last page arrived
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl ListState {
    /// Fresh state for a session with the given page size
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            cats: Vec::new(),
            favorite_ids: HashSet::new(),
            current_page: 1,
            page_size: page_size.max(1),
            is_loading: false,
            is_loading_more: false,
            can_load_more: true,
            has_loaded_initial: false,
            search_text: String::new(),
            error_alert: None,
            selected: None,
            last_refreshed_at: None,
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> ListPhase {
        if self.error_alert.is_some() {
            ListPhase::Errored
        } else if self.is_loading {
            ListPhase::LoadingInitial
        } else if self.is_loading_more {
            ListPhase::LoadingMore
        } else if !self.has_loaded_initial {
            ListPhase::Idle
        } else if self.can_load_more {
            ListPhase::Ready
        } else {
            ListPhase::Exhausted
        }
    }

    /// Whether a `LoadMore` would be accepted right now
    #[must_use]
    pub const fn accepts_load_more(&self) -> bool {
        self.can_load_more && !self.is_loading && !self.is_loading_more
    }

    /// Loaded cat by surrogate id
    #[must_use]
    pub fn get(&self, id: &CatId) -> Option<&Cat> {
        self.cats.iter().find(|cat| &cat.uuid == id)
    }

    /// Whether a cat with this surrogate id is loaded
    #[must_use]
    pub fn contains(&self, id: &CatId) -> bool {
        self.get(id).is_some()
    }

    /// Whether a surrogate id is in the favorite set
    #[must_use]
    pub fn is_favorite(&self, id: &CatId) -> bool {
        self.favorite_ids.contains(id)
    }

    /// Surrogate id of the cat open in the detail view
    #[must_use]
    pub fn selected_id(&self) -> Option<CatId> {
        self.selected.as_ref().map(|detail| detail.cat.uuid)
    }
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Everything that can happen to a cat list
#[derive(Clone, Debug, PartialEq)]
pub enum CatListAction {
    // ========== Intents ==========
    /// Show cached cats and request the first page (once per scope)
    Initialize,
    /// Request the next page
    LoadMore,
    /// Start over from page 1 after a failure
    Retry,
    /// Close the error alert without retrying
    DismissError,
    /// Flip the favorite mark of a cat
    ToggleFavorite {
        /// Surrogate id of the cat
        id: CatId,
    },
    /// Update the search query
    SearchTextChanged {
        /// New query text
        text: String,
    },
    /// Open a cat in the detail view
    SelectCat {
        /// Surrogate id of the cat
        id: CatId,
    },
    /// Close the detail view
    ClearSelection,

    // ========== Port results ==========
    /// A page request succeeded
    FetchSucceeded {
        /// Cats on the page, in server order
        cats: Vec<Cat>,
    },
    /// A page request failed
    FetchFailed {
        /// Why it failed
        error: NetworkError,
    },
}
