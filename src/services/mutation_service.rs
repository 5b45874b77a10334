//! Service for folder and image mutations.
//!
//! Every mutation validates locally, calls the backend, checks the response
//! and only then invalidates the cache entries it affects. A failure at any
//! step leaves the cache untouched.

use crate::api::{Backend, ImageUpload, payload};
use crate::error::Result;
use crate::models::{FolderNode, Image};
use crate::query_cache::{CacheKey, KeySelector, QueryCache};
use crate::state::{AppState, SelectionState, TreeState, lock};
use crate::validation::{validate_folder_name, validate_image_upload};
use log::info;
use std::sync::{Arc, Mutex};

/// Image content picked for upload.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Service for changing folders and images.
#[derive(Clone)]
pub struct MutationService {
    backend: Arc<dyn Backend>,
    cache: QueryCache,
    tree: Arc<Mutex<TreeState>>,
    selection: Arc<Mutex<SelectionState>>,
}

impl MutationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            backend: state.backend.clone(),
            cache: state.cache.clone(),
            tree: state.tree.clone(),
            selection: state.selection.clone(),
        }
    }

    /// Creates a folder under `parent_id`, or at the top level.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<FolderNode> {
        let name = validate_folder_name(name)?;
        let body = self.backend.create_folder(&name, parent_id).await?;
        let folder = payload::folder(body)?;

        self.invalidate_folder_views();
        info!("Created folder {} ({})", folder.name, folder.id);
        Ok(folder)
    }

    /// Renames a folder, keeping the selection's display name in step.
    pub async fn rename_folder(&self, id: &str, name: &str) -> Result<FolderNode> {
        let name = validate_folder_name(name)?;
        let body = self.backend.rename_folder(id, &name).await?;
        let folder = payload::folder(body)?;

        {
            let mut selection = lock(&self.selection);
            if selection.current().folder_id.as_deref() == Some(id) {
                selection.select(Some(id.to_string()), Some(folder.name.clone()));
            }
        }
        self.cache.invalidate(CacheKey::FolderTree);
        info!("Renamed folder {} to {}", id, folder.name);
        Ok(folder)
    }

    /// Deletes a folder.
    ///
    /// A selection on the folder or anything beneath it falls back to root.
    pub async fn delete_folder(&self, id: &str) -> Result<()> {
        let body = self.backend.delete_folder(id).await?;
        payload::acknowledgement(&body)?;

        {
            let tree = lock(&self.tree);
            let mut selection = lock(&self.selection);
            let orphaned = selection
                .current()
                .folder_id
                .as_deref()
                .is_some_and(|selected| selected == id || tree.tree.is_within(selected, id));
            if orphaned {
                info!("Selected folder was deleted, selecting root");
                selection.reset();
            }
        }
        self.invalidate_folder_views();
        info!("Deleted folder {}", id);
        Ok(())
    }

    /// Uploads an image into `folder_id`.
    pub async fn upload_image(
        &self,
        name: &str,
        folder_id: Option<&str>,
        blob: ImageBlob,
    ) -> Result<Image> {
        let mime_type = validate_image_upload(name, folder_id, &blob.bytes)?;
        let upload = ImageUpload {
            name: name.trim().to_string(),
            folder_id: folder_id.map(str::to_string),
            file_name: blob.file_name,
            mime_type: mime_type.to_string(),
            bytes: blob.bytes,
        };
        let body = self.backend.upload_image(upload).await?;
        let image = payload::image(body)?;

        let current = lock(&self.selection).images_key();
        self.cache.invalidate(KeySelector::images_in(folder_id));
        self.cache.invalidate(KeySelector::images_in(None));
        self.cache.invalidate(current);
        info!("Uploaded image {} ({})", image.name, image.id);
        Ok(image)
    }

    /// Deletes an image from every listing that showed it.
    pub async fn delete_image(&self, id: &str) -> Result<()> {
        let body = self.backend.delete_image(id).await?;
        payload::acknowledgement(&body)?;

        // A listing still loading may have read the image before the delete.
        let in_flight = self
            .cache
            .keys_in_flight()
            .into_iter()
            .filter(|key| matches!(key, CacheKey::Images { .. }));
        for key in self.cache.keys_containing_image(id).into_iter().chain(in_flight) {
            self.cache.invalidate(key);
        }
        let current = lock(&self.selection).images_key();
        self.cache.invalidate(KeySelector::images_in(None));
        self.cache.invalidate(current);
        info!("Deleted image {}", id);
        Ok(())
    }

    fn invalidate_folder_views(&self) {
        self.cache.invalidate(CacheKey::FolderTree);
        self.cache.invalidate(KeySelector::all_images());
    }
}
