//! In-memory persistence port.

use catalog_core::model::{Cat, CatId};
use catalog_core::ports::{CatStore, PersistenceError, PortFuture};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Contents {
    cats: Vec<Cat>,
    favorites: HashSet<CatId>,
}

/// In-memory `CatStore` for fast, deterministic tests.
///
/// Cats keep their insertion order. Reads and writes can be switched to fail
/// to exercise the list's "persistence errors are background noise" path,
/// and every write is counted.
#[derive(Debug, Default)]
pub struct InMemoryCatStore {
    contents: RwLock<Contents>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
    toggles: AtomicUsize,
    flushes: AtomicUsize,
}

impl InMemoryCatStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with cached cats and favorites
    #[must_use]
    pub fn seeded(cats: Vec<Cat>, favorites: &[CatId]) -> Self {
        let store = Self::new();
        {
            let mut contents = store.write_contents();
            for cat in cats {
                Self::upsert_one(&mut contents, cat);
            }
            contents.favorites.extend(favorites.iter().copied());
        }
        store
    }

    /// Make every read fail with an I/O error
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with an I/O error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `upsert_cats` calls, failed ones included
    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Number of `toggle_favorite` calls, failed ones included
    #[must_use]
    pub fn toggle_calls(&self) -> usize {
        self.toggles.load(Ordering::SeqCst)
    }

    /// Number of `flush` calls, failed ones included
    #[must_use]
    pub fn flush_calls(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Favorite ids currently stored
    #[must_use]
    pub fn favorite_ids(&self) -> HashSet<CatId> {
        self.read_contents().favorites.clone()
    }

    /// Number of cached cats
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_contents().cats.len()
    }

    /// Whether the cache holds no cats
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_contents(&self) -> RwLockReadGuard<'_, Contents> {
        self.contents
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_contents(&self) -> RwLockWriteGuard<'_, Contents> {
        self.contents
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn upsert_one(contents: &mut Contents, cat: Cat) {
        match contents.cats.iter_mut().find(|c| c.uuid == cat.uuid) {
            Some(existing) => *existing = cat,
            None => contents.cats.push(cat),
        }
    }

    fn check(flag: &AtomicBool) -> Result<(), PersistenceError> {
        if flag.load(Ordering::SeqCst) {
            Err(PersistenceError::Io(std::io::Error::other("injected failure")))
        } else {
            Ok(())
        }
    }

    fn flagged(contents: &Contents, cat: &Cat) -> Cat {
        let mut cat = cat.clone();
        cat.is_favorite = contents.favorites.contains(&cat.uuid);
        cat
    }
}

impl CatStore for InMemoryCatStore {
    fn upsert_cats(&self, cats: Vec<Cat>) -> PortFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            Self::check(&self.fail_writes)?;
            let mut contents = self.write_contents();
            for cat in cats {
                Self::upsert_one(&mut contents, cat);
            }
            Ok(())
        })
    }

    fn all_cats(&self) -> Result<Vec<Cat>, PersistenceError> {
        Self::check(&self.fail_reads)?;
        let contents = self.read_contents();
        Ok(contents
            .cats
            .iter()
            .map(|cat| Self::flagged(&contents, cat))
            .collect())
    }

    fn favorite_cats(&self) -> Result<Vec<Cat>, PersistenceError> {
        Ok(self
            .all_cats()?
            .into_iter()
            .filter(|cat| cat.is_favorite)
            .collect())
    }

    fn toggle_favorite(&self, id: CatId) -> PortFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            self.toggles.fetch_add(1, Ordering::SeqCst);
            Self::check(&self.fail_writes)?;
            let mut contents = self.write_contents();
            if !contents.favorites.remove(&id) {
                contents.favorites.insert(id);
            }
            Ok(())
        })
    }

    fn flush(&self) -> PortFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Self::check(&self.fail_writes)
        })
    }
}
