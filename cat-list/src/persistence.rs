//! File-backed [`CatStore`].
//!
//! The cache is a single JSON document with three independent collections:
//! cats keyed by surrogate id (each listing its breed ids), breeds keyed by
//! breed id, and the favorite set. Nothing points back from a breed to its
//! cats, so a breed shared by many cats is stored once.
//!
//! Reads are served from an in-memory snapshot. Writes update the snapshot
//! and mark it dirty; [`CatStore::flush`] writes the document to a temp file
//! next to the target and renames it into place.

use catalog_core::model::{Breed, Cat, CatId};
use catalog_core::ports::{CatStore, PersistenceError, PortFuture};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;

/// Layout version written to the cache file
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// A cached cat, with breeds referenced by id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct CachedCat {
    uuid: CatId,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    breed_ids: Vec<String>,
}

/// On-disk document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    /// Insertion order is the order cats are returned in
    #[serde(default)]
    cats: Vec<CachedCat>,
    #[serde(default)]
    breeds: BTreeMap<String, Breed>,
    #[serde(default)]
    favorites: BTreeSet<CatId>,
}

impl CacheFile {
    fn empty() -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            ..Self::default()
        }
    }

    fn upsert(&mut self, cat: Cat) {
        let breed_ids = cat.breeds.iter().map(|breed| breed.id.clone()).collect();
        for breed in cat.breeds {
            self.breeds.insert(breed.id.clone(), breed);
        }

        let cached = CachedCat {
            uuid: cat.uuid,
            id: cat.id,
            url: cat.url,
            width: cat.width,
            height: cat.height,
            breed_ids,
        };

        match self.cats.iter_mut().find(|c| c.uuid == cached.uuid) {
            Some(existing) => *existing = cached,
            None => self.cats.push(cached),
        }
    }

    fn hydrate(&self, cached: &CachedCat) -> Cat {
        Cat {
            uuid: cached.uuid,
            id: cached.id.clone(),
            url: cached.url.clone(),
            width: cached.width,
            height: cached.height,
            breeds: cached
                .breed_ids
                .iter()
                .filter_map(|id| self.breeds.get(id).cloned())
                .collect(),
            is_favorite: self.favorites.contains(&cached.uuid),
        }
    }
}

/// JSON file cache of cats and favorites
#[derive(Debug)]
pub struct FileCatStore {
    path: PathBuf,
    snapshot: RwLock<CacheFile>,
    dirty: AtomicBool,
    /// Serializes flushes so two writers never race on the temp file
    write_gate: Mutex<()>,
}

impl FileCatStore {
    /// Open the cache at `path`, starting empty if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the file exists but cannot be
    /// read, or [`PersistenceError::Serialization`] if it is not a valid
    /// cache document.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();

        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<CacheFile>(&bytes)
                .map_err(|e| PersistenceError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cache file yet, starting empty");
                CacheFile::empty()
            },
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            cats = contents.cats.len(),
            favorites = contents.favorites.len(),
            "Cache opened"
        );

        Ok(Self::from_contents(path, contents))
    }

    /// Empty cache that will be written to `path` on the first flush
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::from_contents(path.into(), CacheFile::empty())
    }

    fn from_contents(path: PathBuf, contents: CacheFile) -> Self {
        Self {
            path,
            snapshot: RwLock::new(contents),
            dirty: AtomicBool::new(false),
            write_gate: Mutex::new(()),
        }
    }

    /// Location of the cache file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are writes not yet flushed
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CacheFile>, PersistenceError> {
        self.snapshot.read().map_err(|_| PersistenceError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CacheFile>, PersistenceError> {
        self.snapshot.write().map_err(|_| PersistenceError::Poisoned)
    }

    fn serialize(&self) -> Result<Vec<u8>, PersistenceError> {
        let mut document = self.read()?.clone();
        document.version = CACHE_FORMAT_VERSION;
        document.saved_at = Some(Utc::now());
        serde_json::to_vec_pretty(&document).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    async fn write_file(&self) -> Result<(), PersistenceError> {
        let _gate = self.write_gate.lock().await;

        // Clear first so a write landing during the flush re-marks it
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let result = async {
            let bytes = self.serialize()?;

            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }

            let mut tmp = self.path.clone().into_os_string();
            tmp.push(".tmp");
            let tmp = PathBuf::from(tmp);

            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &self.path).await?;

            tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Cache flushed");
            Ok::<(), PersistenceError>(())
        }
        .await;

        if result.is_err() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        result
    }
}

impl CatStore for FileCatStore {
    fn upsert_cats(&self, cats: Vec<Cat>) -> PortFuture<'_, Result<(), PersistenceError>> {
        async move {
            {
                let mut contents = self.write()?;
                for cat in cats {
                    contents.upsert(cat);
                }
            }
            self.dirty.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn all_cats(&self) -> Result<Vec<Cat>, PersistenceError> {
        let contents = self.read()?;
        Ok(contents
            .cats
            .iter()
            .map(|cached| contents.hydrate(cached))
            .collect())
    }

    fn favorite_cats(&self) -> Result<Vec<Cat>, PersistenceError> {
        let contents = self.read()?;
        Ok(contents
            .cats
            .iter()
            .filter(|cached| contents.favorites.contains(&cached.uuid))
            .map(|cached| contents.hydrate(cached))
            .collect())
    }

    fn toggle_favorite(&self, id: CatId) -> PortFuture<'_, Result<(), PersistenceError>> {
        async move {
            {
                let mut contents = self.write()?;
                if !contents.favorites.remove(&id) {
                    contents.favorites.insert(id);
                }
            }
            self.dirty.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn flush(&self) -> PortFuture<'_, Result<(), PersistenceError>> {
        self.write_file().boxed()
    }
}
