//! Active folder and search term driving the image listing.

use super::FolderTree;
use crate::query_cache::CacheKey;
use log::info;

/// The folder the listing and uploads target. `folder_id: None` is the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub folder_id: Option<String>,
    pub folder_name: String,
}

impl Selection {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.folder_id.is_none()
    }
}

/// Selection plus the search term; together they form the listing key.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selection: Selection,
    search_term: String,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a folder. Unknown ids are accepted until the next reconciliation.
    pub fn select(&mut self, folder_id: Option<String>, folder_name: Option<String>) {
        self.selection = match folder_id {
            Some(id) => Selection {
                folder_id: Some(id),
                folder_name: folder_name.unwrap_or_default(),
            },
            None => Selection::root(),
        };
    }

    pub fn current(&self) -> &Selection {
        &self.selection
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.trim().to_string();
    }

    pub fn reset(&mut self) {
        self.selection = Selection::root();
    }

    /// Selects root and drops the search term.
    pub fn clear(&mut self) {
        self.reset();
        self.search_term.clear();
    }

    /// Cache key of the listing for the current selection and search term.
    pub fn images_key(&self) -> CacheKey {
        CacheKey::images(self.selection.folder_id.as_deref(), &self.search_term)
    }

    /// Falls back to root when the selected folder is missing from `tree`.
    ///
    /// Also refreshes the stored name from the tree. Returns true if the
    /// selection was reset.
    pub fn reconcile(&mut self, tree: &FolderTree) -> bool {
        let Some(id) = self.selection.folder_id.as_deref() else {
            return false;
        };
        match tree.get(id) {
            Some(node) => {
                if self.selection.folder_name != node.name {
                    self.selection.folder_name = node.name.clone();
                }
                false
            }
            None => {
                info!("Selected folder {} no longer exists, selecting root", id);
                self.reset();
                true
            }
        }
    }
}
