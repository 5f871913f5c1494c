//! Scripted remote fetch port.

use catalog_core::model::Cat;
use catalog_core::ports::{CatFetcher, NetworkError, PortFuture};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fetch port that replays a script of responses in order.
///
/// Each call pops the next scripted response; once the script runs out every
/// call returns an empty page, which the list reads as "no more pages".
/// Requested `(page, limit)` pairs are recorded for assertions.
///
/// # Example
///
/// ```
/// use catalog_testing::{ScriptedFetcher, fixtures};
///
/// let fetcher = ScriptedFetcher::new()
///     .then_page(vec![fixtures::siamese_cat(1)])
///     .then_page(vec![]);
/// assert!(fetcher.requests().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Vec<Cat>, NetworkError>>>,
    requests: Mutex<Vec<(u32, u32)>>,
    latency: Option<Duration>,
}

impl ScriptedFetcher {
    /// Fetcher with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful page
    #[must_use]
    pub fn then_page(self, cats: Vec<Cat>) -> Self {
        self.push(Ok(cats));
        self
    }

    /// Queue a failure
    #[must_use]
    pub fn then_fail(self, error: NetworkError) -> Self {
        self.push(Err(error));
        self
    }

    /// Delay every response by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response after construction
    pub fn push(&self, response: Result<Vec<Cat>, NetworkError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// Every `(page, limit)` requested so far, in call order
    #[must_use]
    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pages requested so far, in call order
    #[must_use]
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requests().into_iter().map(|(page, _)| page).collect()
    }
}

impl CatFetcher for ScriptedFetcher {
    fn fetch_page(&self, page: u32, limit: u32) -> PortFuture<'_, Result<Vec<Cat>, NetworkError>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((page, limit));

        let response = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        let latency = self.latency;

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            response
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_replays_script_then_empty_pages() {
        let fetcher = ScriptedFetcher::new()
            .then_page(vec![fixtures::siamese_cat(1)])
            .then_fail(NetworkError::Transport("offline".to_string()));

        assert_eq!(fetcher.fetch_page(1, 10).await.unwrap().len(), 1);
        assert!(fetcher.fetch_page(2, 10).await.is_err());
        assert!(fetcher.fetch_page(3, 10).await.unwrap().is_empty());
        assert_eq!(fetcher.requests(), vec![(1, 10), (2, 10), (3, 10)]);
    }
}
