//! State management for the folder vault client.
//!
//! [`AppState`] is the explicitly constructed context shared by every
//! service. Locks are taken tree-before-selection and never held across an
//! `.await`.

use crate::api::{Backend, HttpBackend};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::error::{AppError, Result};
use crate::models::FolderNode;
use crate::query_cache::QueryCache;
use log::info;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod folder_tree;
pub mod selection;
pub mod session;

pub use folder_tree::{ExpansionState, FolderTree, TreeNode, TreeRow};
pub use selection::{Selection, SelectionState};
pub use session::SessionState;

/// Locks a state mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Folder tree arena plus the expansion flags and diagnostics that belong to it.
#[derive(Debug, Default)]
pub struct TreeState {
    pub tree: FolderTree,
    pub expansion: ExpansionState,
    /// Snapshot the arena was built from; identity tells whether it changed.
    source: Option<Arc<Vec<FolderNode>>>,
    /// Most recent malformed tree payload, kept for diagnostics.
    pub last_shape_error: Option<AppError>,
}

impl TreeState {
    /// Rebuilds the arena if `snapshot` differs from the one already applied.
    ///
    /// Returns true when the tree was rebuilt.
    pub fn apply_snapshot(&mut self, snapshot: Arc<Vec<FolderNode>>) -> bool {
        if self
            .source
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &snapshot))
        {
            return false;
        }
        self.tree = FolderTree::from_snapshot(&snapshot);
        self.expansion.retain_present(&self.tree);
        self.source = Some(snapshot);
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn reset(&mut self) {
        *self = TreeState::default();
    }
}

/// Application-wide state container.
#[derive(Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub backend: Arc<dyn Backend>,
    pub session: Arc<Mutex<SessionState>>,
    pub cache: QueryCache,
    pub tree: Arc<Mutex<TreeState>>,
    pub selection: Arc<Mutex<SelectionState>>,
}

impl AppState {
    /// Creates a context around an existing backend and credential store.
    pub fn init(
        config: ClientConfig,
        backend: Arc<dyn Backend>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let cache = QueryCache::new(config.cache_capacity);
        Self {
            config,
            backend,
            session: Arc::new(Mutex::new(SessionState::new(credentials))),
            cache,
            tree: Arc::new(Mutex::new(TreeState::default())),
            selection: Arc::new(Mutex::new(SelectionState::new())),
        }
    }

    /// Creates a context talking HTTP to `config.base_url`.
    ///
    /// The token is persisted to `config.credential_path` when set.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let credentials: Arc<dyn CredentialStore> = match &config.credential_path {
            Some(path) => Arc::new(FileCredentialStore::new(path.clone())),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        let backend = Arc::new(HttpBackend::new(&config, credentials.clone())?);
        Ok(Self::init(config, backend, credentials))
    }

    /// Drops every cached entry, the tree and its expansion flags, the search
    /// term, and selects root. Nothing from the previous identity survives.
    pub fn teardown(&self) {
        self.cache.clear_all();
        lock(&self.tree).reset();
        lock(&self.selection).clear();
        info!("Client state torn down");
    }
}
