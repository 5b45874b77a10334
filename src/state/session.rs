//! Identity derived from the stored bearer token.

use crate::credentials::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::Identity;
use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use log::{info, warn};
use std::sync::Arc;

/// URL-safe alphabet that accepts payloads with or without padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes the payload segment of a `header.payload.signature` token.
pub fn try_decode_identity(token: &str) -> Result<Identity> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| AppError::Decode("token has no payload segment".to_string()))?;
    let bytes = PAYLOAD_ENGINE
        .decode(payload.trim())
        .map_err(|e| AppError::Decode(format!("payload is not base64url: {}", e)))?;
    serde_json::from_slice::<Identity>(&bytes)
        .map_err(|e| AppError::Decode(format!("payload is not an identity: {}", e)))
}

/// Total variant of [`try_decode_identity`].
pub fn decode_identity(token: &str) -> Option<Identity> {
    try_decode_identity(token).ok()
}

/// Holds the credential store and the identity decoded from it.
pub struct SessionState {
    credentials: Arc<dyn CredentialStore>,
    /// Token the cached identity was decoded from.
    decoded: Option<(String, Identity)>,
}

impl SessionState {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            decoded: None,
        }
    }

    /// Current identity. A token that fails to decode is discarded.
    pub fn identity(&mut self) -> Option<Identity> {
        let Some(token) = self.credentials.load() else {
            self.decoded = None;
            return None;
        };

        if let Some((cached_token, identity)) = &self.decoded {
            if *cached_token == token {
                return Some(identity.clone());
            }
        }

        match try_decode_identity(&token) {
            Ok(identity) => {
                self.decoded = Some((token, identity.clone()));
                Some(identity)
            }
            Err(e) => {
                warn!("Discarding stored credential: {}", e);
                self.decoded = None;
                if let Err(e) = self.credentials.clear() {
                    warn!("Failed to remove stored credential: {}", e);
                }
                None
            }
        }
    }

    pub fn set_credential(&mut self, token: &str) -> Result<()> {
        self.credentials.save(token.trim())?;
        self.decoded = None;
        info!("Stored new credential");
        Ok(())
    }

    pub fn clear_credential(&mut self) -> Result<()> {
        self.decoded = None;
        self.credentials.clear()?;
        info!("Cleared stored credential");
        Ok(())
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.load().is_some()
    }
}
