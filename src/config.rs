//! Client configuration constants and runtime settings.

use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// Backend used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";

/// Image MIME types accepted for upload.
pub const SUPPORTED_IMAGE_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// Upload size limit in megabytes.
pub const MAX_FILE_SIZE_MB: usize = 10;

/// Upload size limit in bytes.
pub const MAX_FILE_SIZE_BYTES: usize = MAX_FILE_SIZE_MB * 1024 * 1024;

/// Longest folder name accepted, in characters.
pub const MAX_FOLDER_NAME_LEN: usize = 50;

/// Characters a folder name may not contain.
pub const RESERVED_FOLDER_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Number of query cache entries kept before least recently used ones are evicted.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_API_URL: &str = "FOLDER_VAULT_API_URL";
const ENV_TOKEN_FILE: &str = "FOLDER_VAULT_TOKEN_FILE";
const ENV_CACHE_CAPACITY: &str = "FOLDER_VAULT_CACHE_CAPACITY";
const ENV_TIMEOUT_SECS: &str = "FOLDER_VAULT_TIMEOUT_SECS";

/// Runtime settings for a client context.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Where the bearer token is persisted. `None` keeps it in memory only.
    pub credential_path: Option<PathBuf>,
    pub cache_capacity: usize,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            credential_path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Unparsable numeric values are ignored with a warning and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(path) = lookup(ENV_TOKEN_FILE).filter(|v| !v.trim().is_empty()) {
            config.credential_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_CACHE_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.cache_capacity = capacity,
                _ => warn!("Ignoring invalid {}: {:?}", ENV_CACHE_CAPACITY, raw),
            }
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!("Ignoring invalid {}: {:?}", ENV_TIMEOUT_SECS, raw),
            }
        }

        config
    }
}
