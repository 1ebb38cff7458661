//! # Collections
//!
//! A collection is an ordered list of typed documents behind a single
//! `RwLock`. When opened against a data directory every successful mutation
//! rewrites `<dir>/<collection>.json` (temp file, fsync, rename) before the
//! write lock is released. A mutation whose write fails is rolled back in
//! memory, so memory and disk never diverge.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};

/// A record stored in a [`Collection`]
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, also the file stem on disk
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
}

pub struct Collection<T: Document> {
    docs: RwLock<Vec<T>>,
    path: Option<PathBuf>,
}

impl<T: Document> Collection<T> {
    pub fn in_memory() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open the collection, loading `<dir>/<name>.json` if it exists.
    pub fn open(dir: Option<&Path>) -> StoreResult<Self> {
        let Some(dir) = dir else {
            return Ok(Self::in_memory());
        };

        let path = dir.join(format!("{}.json", T::COLLECTION));
        let docs = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<Vec<T>>(&content).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        debug!(collection = T::COLLECTION, documents = docs.len(), "collection loaded");

        Ok(Self {
            docs: RwLock::new(docs),
            path: Some(path),
        })
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<T>>> {
        self.docs
            .read()
            .map_err(|_| StoreError::Poisoned(T::COLLECTION))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<T>>> {
        self.docs
            .write()
            .map_err(|_| StoreError::Poisoned(T::COLLECTION))
    }

    fn not_found(id: Uuid) -> StoreError {
        StoreError::NotFound {
            collection: T::COLLECTION,
            id,
        }
    }

    /// Rewrite the backing file from the current contents.
    fn persist(&self, docs: &[T]) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(docs).map_err(|source| StoreError::Serialize {
            collection: T::COLLECTION,
            source,
        })?;

        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(&json).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;

        Ok(())
    }

    pub fn insert(&self, doc: T) -> StoreResult<T> {
        self.insert_unique(doc, |_| false, "")
    }

    /// Insert unless an existing document satisfies `conflicts`.
    ///
    /// The check and the insert happen under the same write lock.
    pub fn insert_unique<F>(&self, doc: T, conflicts: F, message: &str) -> StoreResult<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut docs = self.write()?;

        if docs.iter().any(|existing| conflicts(existing)) {
            return Err(StoreError::Conflict(message.to_string()));
        }

        docs.push(doc.clone());
        if let Err(e) = self.persist(&docs) {
            docs.pop();
            return Err(e);
        }

        Ok(doc)
    }

    pub fn get(&self, id: Uuid) -> StoreResult<Option<T>> {
        Ok(self.read()?.iter().find(|d| d.id() == id).cloned())
    }

    /// Like [`get`](Self::get) but a missing document is an error.
    pub fn require(&self, id: Uuid) -> StoreResult<T> {
        self.get(id)?.ok_or_else(|| Self::not_found(id))
    }

    pub fn find<F>(&self, predicate: F) -> StoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.read()?.iter().filter(|d| predicate(d)).cloned().collect())
    }

    pub fn find_one<F>(&self, predicate: F) -> StoreResult<Option<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.read()?.iter().find(|d| predicate(d)).cloned())
    }

    pub fn list(&self) -> StoreResult<Vec<T>> {
        Ok(self.read()?.clone())
    }

    pub fn count<F>(&self, predicate: F) -> StoreResult<usize>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.read()?.iter().filter(|d| predicate(d)).count())
    }

    /// Mutate one document in place.
    ///
    /// If `f` returns an error, or persisting fails, the document is restored
    /// to its previous value.
    pub fn update<F, R, E>(&self, id: Uuid, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut docs = self.write()?;
        let index = docs
            .iter()
            .position(|d| d.id() == id)
            .ok_or_else(|| Self::not_found(id))?;

        let previous = docs[index].clone();
        let result = match f(&mut docs[index]) {
            Ok(r) => r,
            Err(e) => {
                docs[index] = previous;
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&docs) {
            docs[index] = previous;
            return Err(e.into());
        }

        Ok(result)
    }

    /// Mutate every document matching `predicate`; returns how many matched.
    pub fn update_where<P, F>(&self, predicate: P, mut f: F) -> StoreResult<usize>
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let mut docs = self.write()?;
        let snapshot = docs.clone();

        let mut touched = 0;
        for doc in docs.iter_mut().filter(|d| predicate(d)) {
            f(doc);
            touched += 1;
        }

        if touched == 0 {
            return Ok(0);
        }

        if let Err(e) = self.persist(&docs) {
            *docs = snapshot;
            return Err(e);
        }

        Ok(touched)
    }

    pub fn delete(&self, id: Uuid) -> StoreResult<T> {
        let mut docs = self.write()?;
        let index = docs
            .iter()
            .position(|d| d.id() == id)
            .ok_or_else(|| Self::not_found(id))?;

        let removed = docs.remove(index);
        if let Err(e) = self.persist(&docs) {
            docs.insert(index, removed);
            return Err(e);
        }

        Ok(removed)
    }

    /// Remove every document matching `predicate`; returns how many were removed.
    pub fn delete_where<P>(&self, predicate: P) -> StoreResult<usize>
    where
        P: Fn(&T) -> bool,
    {
        let mut docs = self.write()?;
        let before = docs.len();
        let snapshot = docs.clone();

        docs.retain(|d| !predicate(d));
        let removed = before - docs.len();
        if removed == 0 {
            return Ok(0);
        }

        if let Err(e) = self.persist(&docs) {
            *docs = snapshot;
            return Err(e);
        }

        Ok(removed)
    }
}
