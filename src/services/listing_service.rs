//! Service for the active folder, the search term and the image listing they select.

use crate::api::{Backend, ImageQuery, payload};
use crate::error::{AppError, Result};
use crate::models::Image;
use crate::query_cache::{CacheKey, QueryCache, Resource};
use crate::state::{AppState, Selection, SelectionState, TreeState, lock};
use log::{debug, warn};
use std::sync::{Arc, Mutex};

async fn fetch_images(backend: Arc<dyn Backend>, query: ImageQuery) -> Result<Resource> {
    let body = backend.list_images(&query).await?;
    let images = match payload::image_list(body) {
        Ok(images) => images,
        Err(AppError::Shape(message)) => {
            warn!("Malformed image listing, showing no images: {}", message);
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    Ok(Resource::Images(Arc::new(images)))
}

/// Service for selecting folders and reading their images.
#[derive(Clone)]
pub struct ListingService {
    backend: Arc<dyn Backend>,
    cache: QueryCache,
    tree: Arc<Mutex<TreeState>>,
    selection: Arc<Mutex<SelectionState>>,
}

impl ListingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            backend: state.backend.clone(),
            cache: state.cache.clone(),
            tree: state.tree.clone(),
            selection: state.selection.clone(),
        }
    }

    /// Selects a folder, or root when `folder_id` is `None`.
    ///
    /// A missing name is looked up in the loaded tree. Ids the tree does not
    /// know yet are kept until the next snapshot reconciles them.
    pub fn select(&self, folder_id: Option<&str>, folder_name: Option<&str>) {
        let tree = lock(&self.tree);
        let name = match (folder_id, folder_name) {
            (_, Some(name)) => Some(name.to_string()),
            (Some(id), None) => tree.tree.get(id).map(|node| node.name.clone()),
            (None, None) => None,
        };
        let mut selection = lock(&self.selection);
        selection.select(folder_id.map(str::to_string), name);
        debug!("Selected {}", selection.images_key());
    }

    pub fn current(&self) -> Selection {
        lock(&self.selection).current().clone()
    }

    pub fn set_search_term(&self, term: &str) {
        lock(&self.selection).set_search_term(term);
    }

    pub fn search_term(&self) -> String {
        lock(&self.selection).search_term().to_string()
    }

    /// Listing key for the current selection and search term.
    pub fn images_key(&self) -> CacheKey {
        lock(&self.selection).images_key()
    }

    /// Images of the current selection, from cache when fresh.
    pub async fn images(&self) -> Result<Arc<Vec<Image>>> {
        let key = self.images_key();
        let query = match &key {
            CacheKey::Images { folder_id, search } => ImageQuery {
                folder_id: folder_id.clone(),
                search: search.clone(),
            },
            CacheKey::FolderTree => ImageQuery::default(),
        };
        let backend = self.backend.clone();
        self.cache
            .read(key, move || fetch_images(backend, query))
            .await?
            .into_images()
    }
}
