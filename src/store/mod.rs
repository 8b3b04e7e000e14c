//! Flat JSON-file stores.
//!
//! Each store keeps its records in memory as the source of truth and
//! rewrites the whole backing file (a pretty-printed JSON array) after
//! every mutation.
//!
//! # Submodules
//!
//! - [`articles`]: fetched articles, deduplicated by URL
//! - [`pages`]: rendered HTML pages, mirrored to one flat file each
//! - [`topics`]: the topic registry, seeded with defaults on first run
//!
//! # Locking
//!
//! [`JsonCollection::lock`] hands out a [`CollectionGuard`] that holds the
//! store's mutex for the whole read-modify-write cycle. Changes made
//! through the guard are kept only if [`CollectionGuard::commit`] succeeds;
//! a failed write or a guard dropped without committing restores the
//! previous in-memory state, so memory never runs ahead of disk.

pub mod articles;
pub mod pages;
pub mod topics;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::error::{NewsdeskError, Result};
use crate::models::{Article, HtmlPage, Topic};

pub use articles::{ArticleQuery, ArticleStore};
pub use pages::{PageFilter, PageStore, extract_title};
pub use topics::{TopicInput, TopicRegistry};

/// A record with a store-assigned integer id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send {
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

impl Record for Article {
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for HtmlPage {
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for Topic {
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[derive(Debug, Clone)]
struct State<T> {
    items: Vec<T>,
    // High-water mark: ids are never handed out twice, even after deletes.
    next_id: u64,
}

/// An in-memory list of records persisted as a JSON array.
#[derive(Debug)]
pub struct JsonCollection<T> {
    path: PathBuf,
    state: Mutex<State<T>>,
}

impl<T: Record> JsonCollection<T> {
    /// Load the collection from `path`.
    ///
    /// A missing file is an empty collection. An unreadable or unparsable
    /// file is logged and also treated as empty; the next commit overwrites it.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load_items::<T>(&path).await;
        let next_id = items.iter().map(Record::id).max().unwrap_or(0) + 1;
        info!(path = %path.display(), count = items.len(), "Loaded JSON store");
        Self {
            path,
            state: Mutex::new(State { items, next_id }),
        }
    }

    /// Acquire exclusive access for a read-modify-write cycle.
    pub async fn lock(&self) -> CollectionGuard<'_, T> {
        CollectionGuard {
            path: &self.path,
            state: self.state.lock().await,
            backup: None,
        }
    }

    /// Clone of every record, in insertion order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.state.lock().await.items.clone()
    }

    pub async fn get(&self, id: u64) -> Option<T> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }
}

/// Exclusive, transactional view of a [`JsonCollection`].
pub struct CollectionGuard<'a, T: Record> {
    path: &'a Path,
    state: MutexGuard<'a, State<T>>,
    backup: Option<State<T>>,
}

impl<T: Record> CollectionGuard<'_, T> {
    pub fn items(&self) -> &[T] {
        &self.state.items
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        let pos = self.state.items.iter().position(|item| item.id() == id)?;
        self.touch();
        Some(&mut self.state.items[pos])
    }

    /// Assign the next id to `item` and append it.
    pub fn insert(&mut self, mut item: T) -> &T {
        self.touch();
        let id = self.state.next_id;
        self.state.next_id += 1;
        item.set_id(id);
        self.state.items.push(item);
        let last = self.state.items.len() - 1;
        &self.state.items[last]
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        let pos = self.state.items.iter().position(|item| item.id() == id)?;
        self.touch();
        Some(self.state.items.remove(pos))
    }

    /// Persist the current contents. On failure the pre-lock state is restored.
    pub async fn commit(&mut self) -> Result<()> {
        match write_items(self.path, &self.state.items).await {
            Ok(()) => {
                self.backup = None;
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to persist store; rolling back");
                if let Some(backup) = self.backup.take() {
                    *self.state = backup;
                }
                Err(e)
            }
        }
    }

    fn touch(&mut self) {
        if self.backup.is_none() {
            self.backup = Some(self.state.clone());
        }
    }
}

impl<T: Record> Drop for CollectionGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            warn!(path = %self.path.display(), "Discarding uncommitted store changes");
            *self.state = backup;
        }
    }
}

async fn load_items<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(items) => items,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to parse store; starting empty");
                Vec::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Store file absent; starting empty");
            Vec::new()
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read store; starting empty");
            Vec::new()
        }
    }
}

/// Write `items` to `<path>.tmp`, then rename over `path`.
async fn write_items<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(items)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| NewsdeskError::io(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| NewsdeskError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| NewsdeskError::io(path, e))?;
    debug!(path = %path.display(), count = items.len(), "Persisted store");
    Ok(())
}
