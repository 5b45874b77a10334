//! In-memory backend for tests.
//!
//! Keeps a folder tree body and a flat image list, counts calls per
//! endpoint, can fail the next call of an endpoint and can hold the next
//! image listing until released.

use crate::api::{Backend, ImageQuery, ImageUpload};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::error::{AppError, Result};
use crate::state::{AppState, lock};
use async_std::channel::{self, Receiver, Sender};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Token whose payload is `{"id":"1"}`.
pub const TOKEN_USER_1: &str = "x.eyJpZCI6IjEifQ.y";

#[derive(Default)]
pub struct MockBackend {
    tree: Mutex<Value>,
    images: Mutex<Vec<Value>>,
    images_override: Mutex<Option<Value>>,
    failures: Mutex<HashMap<&'static str, u16>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    listing_gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    next_id: Mutex<usize>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *lock(&backend.tree) = json!([]);
        Arc::new(backend)
    }

    pub fn set_tree(&self, body: Value) {
        *lock(&self.tree) = body;
    }

    pub fn add_image(&self, id: &str, name: &str, folder: Option<&str>) {
        lock(&self.images).push(json!({
            "_id": id,
            "name": name,
            "folder": folder,
            "imageUrl": format!("https://cdn.test/{}", id),
        }));
    }

    /// Returns `body` verbatim from every image listing.
    pub fn override_images(&self, body: Value) {
        *lock(&self.images_override) = Some(body);
    }

    /// Makes the next call of `endpoint` fail with `status`.
    pub fn fail_next(&self, endpoint: &'static str, status: u16) {
        lock(&self.failures).insert(endpoint, status);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        lock(&self.calls).get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Holds the next image listing after it has read its data.
    ///
    /// The first receiver fires when the listing call starts; sending on the
    /// returned sender lets it finish.
    pub fn hold_next_listing(&self) -> (Receiver<()>, Sender<()>) {
        let (started_tx, started_rx) = channel::bounded(1);
        let (release_tx, release_rx) = channel::bounded(1);
        *lock(&self.listing_gate) = Some((started_tx, release_rx));
        (started_rx, release_tx)
    }

    fn record(&self, endpoint: &'static str) -> Result<()> {
        *lock(&self.calls).entry(endpoint).or_insert(0) += 1;
        match lock(&self.failures).remove(endpoint) {
            Some(status) => Err(AppError::Transport {
                status: Some(status),
                message: format!("{} failed", endpoint),
            }),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut next = lock(&self.next_id);
        *next += 1;
        format!("{}-{}", prefix, next)
    }

    fn tree_nodes_mut(tree: &mut Value) -> Option<&mut Vec<Value>> {
        if tree.is_array() {
            return tree.as_array_mut();
        }
        tree.get_mut("data").and_then(Value::as_array_mut)
    }

    fn insert_folder(nodes: &mut Vec<Value>, parent_id: Option<&str>, folder: &Value) -> bool {
        let Some(parent_id) = parent_id else {
            nodes.push(folder.clone());
            return true;
        };
        for node in nodes.iter_mut() {
            if node.get("_id").and_then(Value::as_str) == Some(parent_id) {
                if node.get("children").is_none() {
                    node["children"] = json!([]);
                }
                if let Some(children) = node["children"].as_array_mut() {
                    children.push(folder.clone());
                }
                return true;
            }
            if let Some(children) = node.get_mut("children").and_then(Value::as_array_mut) {
                if Self::insert_folder(children, Some(parent_id), folder) {
                    return true;
                }
            }
        }
        false
    }

    fn remove_folder(nodes: &mut Vec<Value>, id: &str) -> bool {
        let before = nodes.len();
        nodes.retain(|node| node.get("_id").and_then(Value::as_str) != Some(id));
        if nodes.len() != before {
            return true;
        }
        nodes.iter_mut().any(|node| {
            node.get_mut("children")
                .and_then(Value::as_array_mut)
                .is_some_and(|children| Self::remove_folder(children, id))
        })
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn folder_tree(&self) -> Result<Value> {
        self.record("folder_tree")?;
        Ok(lock(&self.tree).clone())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Value> {
        self.record("create_folder")?;
        let folder = json!({
            "_id": self.next_id("folder"),
            "name": name,
            "parentFolder": parent_id,
            "children": [],
        });
        let mut tree = lock(&self.tree);
        if let Some(nodes) = Self::tree_nodes_mut(&mut tree) {
            Self::insert_folder(nodes, parent_id, &folder);
        }
        Ok(json!({ "success": true, "data": folder }))
    }

    async fn rename_folder(&self, id: &str, name: &str) -> Result<Value> {
        self.record("rename_folder")?;
        Ok(json!({ "success": true, "data": { "_id": id, "name": name } }))
    }

    async fn delete_folder(&self, id: &str) -> Result<Value> {
        self.record("delete_folder")?;
        let mut tree = lock(&self.tree);
        if let Some(nodes) = Self::tree_nodes_mut(&mut tree) {
            Self::remove_folder(nodes, id);
        }
        Ok(json!({ "success": true }))
    }

    async fn list_images(&self, query: &ImageQuery) -> Result<Value> {
        self.record("list_images")?;
        let body = match lock(&self.images_override).clone() {
            Some(body) => body,
            None => {
                let data: Vec<Value> = lock(&self.images)
                    .iter()
                    .filter(|image| {
                        query.folder_id.as_deref().is_none_or(|folder| {
                            image.get("folder").and_then(Value::as_str) == Some(folder)
                        })
                    })
                    .filter(|image| {
                        image
                            .get("name")
                            .and_then(Value::as_str)
                            .is_some_and(|name| name.contains(query.search.as_str()))
                    })
                    .cloned()
                    .collect();
                json!({ "success": true, "data": data })
            }
        };

        let gate = lock(&self.listing_gate).take();
        if let Some((started, release)) = gate {
            let _ = started.send(()).await;
            let _ = release.recv().await;
        }
        Ok(body)
    }

    async fn upload_image(&self, upload: ImageUpload) -> Result<Value> {
        self.record("upload_image")?;
        let id = self.next_id("image");
        self.add_image(&id, &upload.name, upload.folder_id.as_deref());
        Ok(json!({
            "success": true,
            "data": {
                "_id": id,
                "name": upload.name,
                "folder": upload.folder_id,
                "imageUrl": format!("https://cdn.test/{}", id),
            }
        }))
    }

    async fn delete_image(&self, id: &str) -> Result<Value> {
        self.record("delete_image")?;
        lock(&self.images).retain(|image| image.get("_id").and_then(Value::as_str) != Some(id));
        Ok(json!({ "success": true }))
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout")
    }
}

/// Context around `backend` with an in-memory credential store.
pub fn state_with(backend: Arc<MockBackend>) -> AppState {
    state_with_credentials(backend, Arc::new(MemoryCredentialStore::new()))
}

pub fn state_with_credentials(
    backend: Arc<MockBackend>,
    credentials: Arc<dyn CredentialStore>,
) -> AppState {
    AppState::init(ClientConfig::default(), backend, credentials)
}
