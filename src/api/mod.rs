//! Backend collaborator: the folder/image REST API as seen by the client core.
//!
//! Implementations return raw JSON bodies; [`payload`] turns them into
//! models and decides which shapes are tolerated.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod http;
pub mod payload;

pub use http::HttpBackend;

/// Query parameters for the image listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageQuery {
    pub folder_id: Option<String>,
    pub search: String,
}

/// Multipart form for a new image.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub name: String,
    pub folder_id: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Transport to the folder/image service.
///
/// Transport-level failures are reported as `AppError::Transport`; any body
/// returned with a success status is handed back untouched.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /folders/tree`
    async fn folder_tree(&self) -> Result<Value>;
    /// `POST /folders {name, parentFolder}`
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Value>;
    /// `PUT /folders/:id {name}`
    async fn rename_folder(&self, id: &str, name: &str) -> Result<Value>;
    /// `DELETE /folders/:id`
    async fn delete_folder(&self, id: &str) -> Result<Value>;
    /// `GET /images?folder=&search=`
    async fn list_images(&self, query: &ImageQuery) -> Result<Value>;
    /// `POST /images` (multipart)
    async fn upload_image(&self, upload: ImageUpload) -> Result<Value>;
    /// `DELETE /images/:id`
    async fn delete_image(&self, id: &str) -> Result<Value>;
    /// `GET /auth/logout`
    async fn logout(&self) -> Result<()>;
}
