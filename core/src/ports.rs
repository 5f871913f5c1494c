//! Ports consumed by the list state machine.
//!
//! - [`CatFetcher`]: remote paginated source of cats. Stateless per call.
//! - [`CatStore`]: local durable cache of cats and the favorite set.
//!
//! # Implementations
//!
//! - `CatApiClient` and `FileCatStore` (in the `cat-list` crate): production
//! - `ScriptedFetcher` and `InMemoryCatStore` (in `catalog-testing`): tests
//!
//! # Dyn Compatibility
//!
//! Async methods return a boxed `Send` future instead of using `async fn`
//! so both ports can be held as `Arc<dyn ...>` and captured by effects.

use crate::model::{Cat, CatId};
use futures::future::BoxFuture;
use thiserror::Error;

/// Boxed future returned by port methods
pub type PortFuture<'a, T> = BoxFuture<'a, T>;

/// Failures of the remote fetch port.
///
/// Causes are carried as strings so the error can travel inside actions,
/// which must be `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request could not be built (bad URL, zero page or limit)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request was sent but failed (connection, timeout, non-2xx status)
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Decoding failed: {0}")]
    Decode(String),
}

/// Failures of the persistence port.
///
/// These never reach the user; the list core logs them and moves on.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache contents could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the cache was poisoned by a panicking writer
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Remote paginated source of cats.
///
/// # Contract
///
/// - Returns cats in stable server order.
/// - An empty page means there are no further pages; that is not an error.
/// - Every returned cat already carries a freshly minted surrogate identity.
pub trait CatFetcher: Send + Sync {
    /// Fetch one page (1-based) of at most `limit` cats
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] if the request cannot be built, the
    /// transport fails, or the body cannot be decoded.
    fn fetch_page(&self, page: u32, limit: u32) -> PortFuture<'_, Result<Vec<Cat>, NetworkError>>;
}

/// Durable cache of cats and of the favorite set.
///
/// Reads are synchronous point-in-time snapshots so the list can show cached
/// content before any network round trip. Writes are asynchronous and must
/// be serialized by the implementation, since favorite toggles and bulk page
/// saves can race.
pub trait CatStore: Send + Sync {
    /// Insert or update cats keyed by surrogate identity
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write fails.
    fn upsert_cats(&self, cats: Vec<Cat>) -> PortFuture<'_, Result<(), PersistenceError>>;

    /// Snapshot of every cached cat, flagged with its favorite state
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the cache cannot be read.
    fn all_cats(&self) -> Result<Vec<Cat>, PersistenceError>;

    /// Snapshot of the cached cats that are marked favorite
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the cache cannot be read.
    fn favorite_cats(&self) -> Result<Vec<Cat>, PersistenceError>;

    /// Flip the favorite mark of a surrogate identity
    ///
    /// Two calls restore the original state. The id does not need to be
    /// cached yet.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write fails.
    fn toggle_favorite(&self, id: CatId) -> PortFuture<'_, Result<(), PersistenceError>>;

    /// Make pending changes durable
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the changes cannot be written.
    fn flush(&self) -> PortFuture<'_, Result<(), PersistenceError>>;
}
