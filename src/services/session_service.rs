//! Service for the signed-in identity and the end of a session.

use crate::error::Result;
use crate::models::Identity;
use crate::state::{AppState, lock};
use log::{info, warn};

/// Service for reading and replacing the stored credential.
#[derive(Clone)]
pub struct SessionService {
    state: AppState,
}

impl SessionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Identity decoded from the stored token, if any.
    pub fn identity(&self) -> Option<Identity> {
        lock(&self.state.session).identity()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Stores a token issued by the login service.
    pub fn set_credential(&self, token: &str) -> Result<()> {
        lock(&self.state.session).set_credential(token)
    }

    /// Forgets the token and everything loaded with it.
    ///
    /// The context is torn down even when removing the token fails.
    pub fn clear_credential(&self) -> Result<()> {
        let result = lock(&self.state.session).clear_credential();
        self.state.teardown();
        result
    }

    /// Tells the backend the session is over, then clears the credential.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.state.backend.logout().await {
            warn!("Logout request failed, clearing local session anyway: {}", e);
        }
        self.clear_credential()?;
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
    use crate::query_cache::CacheKey;
    use crate::services::{ListingService, TreeService};
    use crate::test_support::{MockBackend, TOKEN_USER_1, state_with, state_with_credentials};
    use serde_json::json;
    use std::sync::Arc;

    #[async_std::test]
    async fn clearing_credential_tears_down_context() {
        let backend = MockBackend::new();
        backend.set_tree(json!([{ "_id": "1", "name": "A", "children": [{ "_id": "2", "name": "B" }] }]));
        backend.add_image("a", "cat", Some("1"));
        let state = state_with(backend.clone());
        let session = SessionService::new(&state);
        let tree = TreeService::new(&state);
        let listing = ListingService::new(&state);

        session.set_credential(TOKEN_USER_1).unwrap();
        assert_eq!(session.identity().map(|i| i.id).as_deref(), Some("1"));
        tree.snapshot().await.unwrap();
        tree.toggle_expansion("1");
        listing.select(Some("1"), None);
        listing.images().await.unwrap();
        assert_eq!(state.cache.len(), 2);
        listing.set_search_term("cat");

        session.clear_credential().unwrap();

        assert!(!session.is_authenticated());
        assert!(state.cache.is_empty());
        assert!(listing.current().is_root());
        assert_eq!(listing.search_term(), "");
        assert_eq!(listing.images_key().to_string(), "images:null:");
        assert!(!tree.is_expanded("1"));
        assert!(tree.visible_rows().is_empty());

        tree.snapshot().await.unwrap();
        assert_eq!(backend.calls("folder_tree"), 2);
        assert!(state.cache.peek(&CacheKey::images(Some("1"), "")).is_none());
    }

    #[async_std::test]
    async fn logout_clears_session_even_if_backend_fails() {
        let backend = MockBackend::new();
        backend.fail_next("logout", 500);
        let state = state_with_credentials(
            backend.clone(),
            Arc::new(MemoryCredentialStore::with_token(TOKEN_USER_1)),
        );
        let session = SessionService::new(&state);
        assert!(session.is_authenticated());

        session.logout().await.unwrap();
        assert_eq!(backend.calls("logout"), 1);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn garbage_token_reads_as_signed_out() {
        let store = Arc::new(MemoryCredentialStore::with_token("not-a-token"));
        let state = state_with_credentials(MockBackend::new(), store.clone());
        let session = SessionService::new(&state);

        assert_eq!(session.identity(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn credential_survives_in_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("token");

        let state = state_with_credentials(
            MockBackend::new(),
            Arc::new(FileCredentialStore::new(path.clone())),
        );
        SessionService::new(&state).set_credential(TOKEN_USER_1).unwrap();

        let reopened = state_with_credentials(
            MockBackend::new(),
            Arc::new(FileCredentialStore::new(path.clone())),
        );
        let session = SessionService::new(&reopened);
        assert_eq!(session.identity().map(|i| i.id).as_deref(), Some("1"));

        session.clear_credential().unwrap();
        assert!(!path.exists());
    }
}
