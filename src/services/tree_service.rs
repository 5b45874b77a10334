//! Service for the folder tree: cached snapshots and expansion flags.

use crate::api::{Backend, payload};
use crate::error::{AppError, Result};
use crate::models::FolderNode;
use crate::query_cache::{CacheKey, QueryCache, Resource};
use crate::state::{AppState, FolderTree, SelectionState, TreeRow, TreeState, lock};
use log::warn;
use std::sync::{Arc, Mutex};

/// Fetches the tree and degrades malformed payloads to an empty tree.
async fn fetch_tree(backend: Arc<dyn Backend>, tree: Arc<Mutex<TreeState>>) -> Result<Resource> {
    let body = backend.folder_tree().await?;
    let nodes = match payload::folder_tree(body) {
        Ok(nodes) => nodes,
        Err(e @ AppError::Shape(_)) => {
            warn!("Malformed folder tree response, showing an empty tree: {}", e);
            lock(&tree).last_shape_error = Some(e);
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    Ok(Resource::FolderTree(Arc::new(nodes)))
}

/// Service for reading the folder hierarchy.
#[derive(Clone)]
pub struct TreeService {
    backend: Arc<dyn Backend>,
    cache: QueryCache,
    tree: Arc<Mutex<TreeState>>,
    selection: Arc<Mutex<SelectionState>>,
}

impl TreeService {
    pub fn new(state: &AppState) -> Self {
        Self {
            backend: state.backend.clone(),
            cache: state.cache.clone(),
            tree: state.tree.clone(),
            selection: state.selection.clone(),
        }
    }

    /// Returns the folder tree, fetching it if the cached one is missing or stale.
    ///
    /// A new snapshot rebuilds the arena, prunes expansion flags and
    /// reconciles the selection.
    pub async fn snapshot(&self) -> Result<Vec<FolderNode>> {
        let backend = self.backend.clone();
        let tree = self.tree.clone();
        let nodes = self
            .cache
            .read(CacheKey::FolderTree, move || fetch_tree(backend, tree))
            .await?
            .into_folder_tree()?;
        Ok(self.apply(nodes))
    }

    fn apply(&self, nodes: Arc<Vec<FolderNode>>) -> Vec<FolderNode> {
        // A result the cache no longer holds (invalidated or torn down while
        // in flight) is returned to the caller but not installed.
        let current = matches!(
            self.cache.peek(&CacheKey::FolderTree),
            Some(Resource::FolderTree(cached)) if Arc::ptr_eq(&cached, &nodes)
        );
        if !current {
            return FolderTree::from_snapshot(&nodes).to_nested();
        }

        let mut tree = lock(&self.tree);
        if tree.apply_snapshot(nodes) {
            lock(&self.selection).reconcile(&tree.tree);
        }
        tree.tree.to_nested()
    }

    /// Flips expansion of a folder. Returns the new flag.
    pub fn toggle_expansion(&self, id: &str) -> bool {
        let mut guard = lock(&self.tree);
        let state = &mut *guard;
        state.expansion.toggle(id, &state.tree)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        lock(&self.tree).expansion.is_expanded(id)
    }

    /// Flattened tree of the last applied snapshot, honouring expansion.
    pub fn visible_rows(&self) -> Vec<TreeRow> {
        let state = lock(&self.tree);
        state.tree.visible_rows(&state.expansion)
    }

    /// Root-to-folder path of `(id, name)` pairs in the last applied snapshot.
    pub fn breadcrumb(&self, id: &str) -> Vec<(String, String)> {
        lock(&self.tree).tree.breadcrumb(id)
    }

    pub fn last_shape_error(&self) -> Option<AppError> {
        lock(&self.tree).last_shape_error.clone()
    }
}
