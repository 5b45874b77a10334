//! `reqwest` implementation of [`Backend`].
//!
//! reqwest needs a tokio reactor, so every request future is wrapped with
//! `async_compat::Compat` and can be awaited from the async-std executor.

use super::{Backend, ImageQuery, ImageUpload, payload};
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{AppError, Result};
use async_compat::Compat;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};
use std::sync::Arc;

/// HTTP client for the folder/image REST API.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpBackend {
    /// Creates a backend reading the bearer token from `credentials` on every request.
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(default_headers)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a request, attaching the bearer token when one is stored.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let builder = self.client.request(method, self.url(path));
        match self.credentials.load() {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                    AppError::Transport {
                        status: None,
                        message: format!("Invalid characters in token: {}", e),
                    }
                })?;
                Ok(builder.header(AUTHORIZATION, value))
            }
            None => Ok(builder),
        }
    }

    /// Sends the request and returns the JSON body of a successful response.
    ///
    /// Empty success bodies are returned as `Value::Null`.
    async fn send(&self, builder: RequestBuilder) -> Result<Value> {
        let response = Compat::new(builder.send()).await?;
        let status = response.status();
        let text = Compat::new(response.text()).await?;
        debug!("HTTP {} ({} bytes)", status, text.len());

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(payload::error_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                });
            return Err(AppError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn folder_tree(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/folders/tree")?).await
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Value> {
        let body = json!({ "name": name, "parentFolder": parent_id });
        self.send(self.request(Method::POST, "/folders")?.json(&body))
            .await
    }

    async fn rename_folder(&self, id: &str, name: &str) -> Result<Value> {
        let body = json!({ "name": name });
        self.send(
            self.request(Method::PUT, &format!("/folders/{}", id))?
                .json(&body),
        )
        .await
    }

    async fn delete_folder(&self, id: &str) -> Result<Value> {
        self.send(self.request(Method::DELETE, &format!("/folders/{}", id))?)
            .await
    }

    async fn list_images(&self, query: &ImageQuery) -> Result<Value> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(folder) = query.folder_id.as_deref() {
            params.push(("folder", folder));
        }
        if !query.search.is_empty() {
            params.push(("search", query.search.as_str()));
        }
        self.send(self.request(Method::GET, "/images")?.query(&params))
            .await
    }

    async fn upload_image(&self, upload: ImageUpload) -> Result<Value> {
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let mut form = reqwest::multipart::Form::new().text("name", upload.name);
        if let Some(folder) = upload.folder_id {
            form = form.text("folder", folder);
        }
        form = form.part("image", part);

        self.send(self.request(Method::POST, "/images")?.multipart(form))
            .await
    }

    async fn delete_image(&self, id: &str) -> Result<Value> {
        self.send(self.request(Method::DELETE, &format!("/images/{}", id))?)
            .await
    }

    async fn logout(&self) -> Result<()> {
        self.send(self.request(Method::GET, "/auth/logout")?)
            .await
            .map(|_| ())
    }
}
