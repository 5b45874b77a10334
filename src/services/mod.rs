//! Service layer for business logic.
//!
//! Each service holds clones of the shared handles in [`crate::state::AppState`]
//! so callers can keep one per concern and move it into async tasks.

pub mod listing_service;
pub mod mutation_service;
pub mod session_service;
pub mod tree_service;

pub use listing_service::ListingService;
pub use mutation_service::{ImageBlob, MutationService};
pub use session_service::SessionService;
pub use tree_service::TreeService;
