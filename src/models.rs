//! Data shared between the backend payloads and the client state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A folder as delivered by the folder tree endpoint.
///
/// `parent_id` is whatever the server sent; the arena in
/// [`crate::state::FolderTree`] derives the authoritative parent from nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(
        default,
        rename = "parentId",
        alias = "parentFolder",
        deserialize_with = "optional_id_string"
    )]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            children: Vec::new(),
        }
    }

    /// Builder-style helper for assembling nested fixtures and payloads.
    pub fn with_children(mut self, children: Vec<FolderNode>) -> Self {
        self.children = children;
        self
    }
}

/// An image record from the listing and upload endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub folder: Option<String>,
    #[serde(default, rename = "imageUrl")]
    pub image_url: String,
    #[serde(default, rename = "createdAt", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Identity claimed by the stored credential.
///
/// This is a client-side hint only; the backend remains the authority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, rename = "exp", deserialize_with = "numeric_date")]
    expires_at_secs: Option<i64>,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            expires_at_secs: None,
        }
    }

    /// Expiry claimed by the token, never enforced locally.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at_secs
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

/// Accepts string or numeric identifiers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        // Populated references such as `{ "_id": "..", "name": ".." }`
        Value::Object(map) => Ok(map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Unparsable timestamps are dropped instead of failing the whole record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))),
        _ => Ok(None),
    }
}

/// Treats `null` like a missing string claim.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// NumericDate claim: integer or fractional seconds. Anything else is ignored.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_i64().or_else(|| n.as_f64().map(|secs| secs.trunc() as i64))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folder_node_accepts_mongo_style_fields() {
        let node: FolderNode = serde_json::from_value(json!({
            "_id": "64a1",
            "name": "Holidays",
            "parentFolder": null,
            "children": [{ "_id": "64a2", "name": "2023", "parentFolder": "64a1" }]
        }))
        .unwrap();
        assert_eq!(node.id, "64a1");
        assert_eq!(node.parent_id, None);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].parent_id.as_deref(), Some("64a1"));
        assert!(node.children[0].children.is_empty());
    }

    #[test]
    fn numeric_ids_become_strings() {
        let node: FolderNode = serde_json::from_value(json!({ "id": 7, "name": "n" })).unwrap();
        assert_eq!(node.id, "7");
    }

    #[test]
    fn image_tolerates_bad_timestamp_and_populated_folder() {
        let image: Image = serde_json::from_value(json!({
            "_id": "i1",
            "name": "cat",
            "folder": { "_id": "f1", "name": "Pets" },
            "imageUrl": "https://cdn.example.com/cat.png",
            "createdAt": "yesterday"
        }))
        .unwrap();
        assert_eq!(image.folder.as_deref(), Some("f1"));
        assert_eq!(image.created_at, None);
    }

    #[test]
    fn identity_exposes_expiry_hint() {
        let identity: Identity =
            serde_json::from_value(json!({ "id": "1", "exp": 1_700_000_000 })).unwrap();
        assert_eq!(identity.name, "");
        assert_eq!(identity.expires_at().map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn identity_tolerates_null_claims_and_fractional_expiry() {
        let identity: Identity = serde_json::from_value(json!({
            "id": "1",
            "name": null,
            "email": "a@b.c",
            "exp": 1_700_000_000.5
        }))
        .unwrap();
        assert_eq!(identity.name, "");
        assert_eq!(identity.email, "a@b.c");
        assert_eq!(identity.expires_at().map(|t| t.timestamp()), Some(1_700_000_000));

        let identity: Identity =
            serde_json::from_value(json!({ "_id": "2", "email": null, "exp": "soon" })).unwrap();
        assert_eq!(identity.email, "");
        assert_eq!(identity.expires_at(), None);
    }
}
