//! Keyed, invalidation-driven cache for folder trees and image listings.
//!
//! Settled entries live in an LRU keyed by [`CacheKey`]; running fetches are
//! tracked beside it so eviction never loses one. A read on a fresh entry
//! returns immediately; anything else joins or starts the single in-flight
//! fetch for that key. Fetches run on their own task and store their result
//! even if every reader has gone away.

use crate::error::{AppError, Result};
use crate::models::{FolderNode, Image};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache key namespace: `folderTree` and `images:{folderId|null}:{searchTerm}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    FolderTree,
    Images {
        folder_id: Option<String>,
        search: String,
    },
}

impl CacheKey {
    pub fn images(folder_id: Option<&str>, search: &str) -> Self {
        CacheKey::Images {
            folder_id: folder_id.map(str::to_string),
            search: search.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::FolderTree => write!(f, "folderTree"),
            CacheKey::Images { folder_id, search } => write!(
                f,
                "images:{}:{}",
                folder_id.as_deref().unwrap_or("null"),
                search
            ),
        }
    }
}

/// Selects the keys affected by an invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    Exact(CacheKey),
    /// Matches every key whose textual form starts with the prefix.
    Prefix(String),
}

impl KeySelector {
    /// Every image listing.
    pub fn all_images() -> Self {
        KeySelector::Prefix("images:".to_string())
    }

    /// Every listing of one folder (`None` = root), whatever the search term.
    pub fn images_in(folder_id: Option<&str>) -> Self {
        KeySelector::Prefix(format!("images:{}:", folder_id.unwrap_or("null")))
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            KeySelector::Exact(exact) => exact == key,
            KeySelector::Prefix(prefix) => key.to_string().starts_with(prefix.as_str()),
        }
    }
}

impl From<CacheKey> for KeySelector {
    fn from(key: CacheKey) -> Self {
        KeySelector::Exact(key)
    }
}

/// Cached payload of either resource class.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    FolderTree(Arc<Vec<FolderNode>>),
    Images(Arc<Vec<Image>>),
}

impl Resource {
    pub fn into_folder_tree(self) -> Result<Arc<Vec<FolderNode>>> {
        match self {
            Resource::FolderTree(nodes) => Ok(nodes),
            Resource::Images(_) => Err(AppError::Shape(
                "cached image listing found under folder tree key".to_string(),
            )),
        }
    }

    pub fn into_images(self) -> Result<Arc<Vec<Image>>> {
        match self {
            Resource::Images(images) => Ok(images),
            Resource::FolderTree(_) => Err(AppError::Shape(
                "cached folder tree found under image listing key".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Fresh,
    Stale,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Resource>>>;

struct InFlight {
    ticket: u64,
    result: SharedFetch,
}

/// Settled data for a key. A key being fetched is tracked in `Inner::in_flight`.
struct CacheEntry {
    data: Option<Resource>,
    fresh: bool,
    fetched_at: Option<DateTime<Utc>>,
}

struct Inner {
    /// Bounded; evicting an entry never loses a running fetch.
    entries: LruCache<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, InFlight>,
    next_ticket: u64,
}

impl Inner {
    fn mark_stale(&mut self, key: &CacheKey) {
        match self.entries.peek_mut(key) {
            Some(entry) => entry.fresh = false,
            None => {
                self.entries.put(
                    key.clone(),
                    CacheEntry {
                        data: None,
                        fresh: false,
                        fetched_at: None,
                    },
                );
            }
        }
    }
}

/// Process-wide query cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
}

impl QueryCache {
    /// Creates a cache holding at most `capacity` settled keys (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
                next_ticket: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State stays consistent across a panic in another holder; keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns fresh data for `key`, fetching it with `fetch` when needed.
    ///
    /// Concurrent reads of a key that is already being fetched wait for that
    /// fetch instead of calling `fetch` again.
    pub async fn read<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Resource>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Resource>> + Send + 'static,
    {
        let pending = {
            let mut inner = self.lock();

            if let Some(entry) = inner.entries.get(&key) {
                if let Some(data) = entry.data.as_ref().filter(|_| entry.fresh) {
                    debug!("Cache HIT: {}", key);
                    return Ok(data.clone());
                }
            }

            match inner.in_flight.get(&key) {
                Some(in_flight) => {
                    debug!("Cache JOIN: {}", key);
                    in_flight.result.clone()
                }
                None => {
                    debug!("Cache MISS: {}", key);
                    let ticket = inner.next_ticket;
                    inner.next_ticket += 1;
                    let result = self.spawn_fetch(key.clone(), ticket, fetch());
                    inner.in_flight.insert(
                        key,
                        InFlight {
                            ticket,
                            result: result.clone(),
                        },
                    );
                    result
                }
            }
        };

        pending.await
    }

    /// Runs the fetch on its own task and stores the outcome when it lands.
    fn spawn_fetch<Fut>(&self, key: CacheKey, ticket: u64, fetch: Fut) -> SharedFetch
    where
        Fut: Future<Output = Result<Resource>> + Send + 'static,
    {
        let cache = self.clone();
        let task = async_std::task::spawn(async move {
            let result = fetch.await;
            cache.complete(&key, ticket, &result);
            result
        });
        task.boxed().shared()
    }

    /// Records a finished fetch unless it was detached by invalidation or teardown.
    fn complete(&self, key: &CacheKey, ticket: u64, result: &Result<Resource>) {
        let mut inner = self.lock();
        if inner.in_flight.get(key).map(|f| f.ticket) != Some(ticket) {
            debug!("Cache DISCARD: {} (detached while in flight)", key);
            return;
        }
        inner.in_flight.remove(key);

        match result {
            Ok(data) => {
                inner.entries.put(
                    key.clone(),
                    CacheEntry {
                        data: Some(data.clone()),
                        fresh: true,
                        fetched_at: Some(Utc::now()),
                    },
                );
                debug!("Cache PUT: {}", key);
            }
            Err(e) => {
                inner.mark_stale(key);
                debug!("Cache fetch failed for {}: {}", key, e);
            }
        }
    }

    /// Marks every matching entry stale and detaches any in-flight fetch.
    ///
    /// Returns how many keys were affected.
    pub fn invalidate(&self, selector: impl Into<KeySelector>) -> usize {
        let selector = selector.into();
        let mut inner = self.lock();

        let keys: HashSet<CacheKey> = inner
            .entries
            .iter()
            .map(|(key, _)| key)
            .chain(inner.in_flight.keys())
            .filter(|key| selector.matches(key))
            .cloned()
            .collect();
        for key in &keys {
            inner.in_flight.remove(key);
            inner.mark_stale(key);
        }
        let count = keys.len();
        debug!("Cache INVALIDATE {:?}: {} keys", selector, count);
        count
    }

    /// Drops every entry. Fetches still in flight will not be stored.
    pub fn clear_all(&self) {
        let mut inner = self.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.in_flight.clear();
        debug!("Cache CLEAR: dropped {} entries", dropped);
    }

    pub fn status(&self, key: &CacheKey) -> Option<EntryStatus> {
        let inner = self.lock();
        if inner.in_flight.contains_key(key) {
            return Some(EntryStatus::Pending);
        }
        inner.entries.peek(key).map(|entry| {
            if entry.fresh {
                EntryStatus::Fresh
            } else {
                EntryStatus::Stale
            }
        })
    }

    pub fn fetched_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.lock().entries.peek(key).and_then(|entry| entry.fetched_at)
    }

    /// Cached data without fetching, whatever its status.
    pub fn peek(&self, key: &CacheKey) -> Option<Resource> {
        self.lock().entries.peek(key).and_then(|entry| entry.data.clone())
    }

    /// Number of keys held, settled or in flight.
    pub fn len(&self) -> usize {
        let inner = self.lock();
        let pending_only = inner
            .in_flight
            .keys()
            .filter(|key| !inner.entries.contains(*key))
            .count();
        inner.entries.len() + pending_only
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Image listing keys whose cached data contains the image.
    pub fn keys_containing_image(&self, image_id: &str) -> Vec<CacheKey> {
        self.lock()
            .entries
            .iter()
            .filter_map(|(key, entry)| match &entry.data {
                Some(Resource::Images(images)) if images.iter().any(|i| i.id == image_id) => {
                    Some(key.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Keys with a fetch currently running.
    pub fn keys_in_flight(&self) -> Vec<CacheKey> {
        self.lock().in_flight.keys().cloned().collect()
    }
}
