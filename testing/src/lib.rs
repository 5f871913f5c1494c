//! # Catalog Testing
//!
//! Testing utilities and helpers for the cat catalog.
//!
//! This crate provides:
//! - Mock implementations of the environment traits and ports
//! - Cat and breed fixtures with deterministic surrogate ids
//! - A Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use catalog_testing::{InMemoryCatStore, ScriptedFetcher, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn first_page_replaces_cache() {
//!     let fetcher = Arc::new(ScriptedFetcher::new().then_page(vec![fixtures::siamese_cat(1)]));
//!     let cache = Arc::new(InMemoryCatStore::new());
//!     let env = CatListEnvironment::new(fetcher, cache, Arc::new(test_clock()));
//!     // ...
//! }
//! ```

use catalog_core::environment::Clock;
use chrono::{DateTime, Utc};

mod cat_store;
mod fetcher;
pub mod fixtures;

pub use cat_store::InMemoryCatStore;
pub use fetcher::ScriptedFetcher;
pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until [`FixedClock::advance`] moves it.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_testing::mocks::FixedClock;
    /// use catalog_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = test_clock();
        let before = clock.now();

        clock.advance(chrono::Duration::minutes(5));

        assert_eq!(clock.now() - before, chrono::Duration::minutes(5));
    }
}
