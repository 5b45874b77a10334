//! Decoding of backend bodies into models.
//!
//! List endpoints are inconsistent about wrapping, so several envelopes are
//! accepted. Anything else is a shape error; callers decide whether that
//! degrades (reads) or fails (mutations).

use crate::error::{AppError, Result};
use crate::models::{FolderNode, Image};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum FolderTreeEnvelope {
    Bare(Vec<FolderNode>),
    Data { data: Vec<FolderNode> },
    Folders { folders: Vec<FolderNode> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Data { data: Vec<T> },
    Bare(Vec<T>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemEnvelope<T> {
    Data { data: T },
    Bare(T),
}

/// Short description of a body for log and error messages.
fn describe(body: &Value) -> String {
    let text = body.to_string();
    if text.len() > 120 {
        let mut end = 120;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    } else {
        text
    }
}

/// Rejects bodies that explicitly report `"success": false`.
fn check_success_flag(body: &Value) -> Result<()> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(AppError::Transport {
            status: None,
            message: error_message(body).unwrap_or_else(|| "Request was not successful".into()),
        });
    }
    Ok(())
}

/// Extracts the server's error text from an error body.
pub fn error_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Decodes the nested folder tree.
pub fn folder_tree(body: Value) -> Result<Vec<FolderNode>> {
    check_success_flag(&body)?;
    let summary = describe(&body);
    serde_json::from_value::<FolderTreeEnvelope>(body)
        .map(|envelope| match envelope {
            FolderTreeEnvelope::Bare(nodes)
            | FolderTreeEnvelope::Data { data: nodes }
            | FolderTreeEnvelope::Folders { folders: nodes } => nodes,
        })
        .map_err(|_| AppError::Shape(format!("expected folder array, got {}", summary)))
}

/// Decodes an image listing.
pub fn image_list(body: Value) -> Result<Vec<Image>> {
    check_success_flag(&body)?;
    list(body, "image")
}

fn list<T: DeserializeOwned>(body: Value, what: &str) -> Result<Vec<T>> {
    let summary = describe(&body);
    serde_json::from_value::<ListEnvelope<T>>(body)
        .map(|envelope| match envelope {
            ListEnvelope::Data { data } | ListEnvelope::Bare(data) => data,
        })
        .map_err(|_| AppError::Shape(format!("expected {} array, got {}", what, summary)))
}

fn item<T: DeserializeOwned>(body: Value, what: &str) -> Result<T> {
    check_success_flag(&body)?;
    let summary = describe(&body);
    serde_json::from_value::<ItemEnvelope<T>>(body)
        .map(|envelope| match envelope {
            ItemEnvelope::Data { data } | ItemEnvelope::Bare(data) => data,
        })
        .map_err(|_| AppError::Shape(format!("expected {}, got {}", what, summary)))
}

/// Decodes the folder returned by create and rename.
pub fn folder(body: Value) -> Result<FolderNode> {
    item(body, "folder")
}

/// Decodes the image returned by upload.
pub fn image(body: Value) -> Result<Image> {
    item(body, "image")
}

/// Checks the body of a delete call.
pub fn acknowledgement(body: &Value) -> Result<()> {
    check_success_flag(body)
}
