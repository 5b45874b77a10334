//! Client core for a hierarchical image folder service.
//!
//! [`state::AppState`] is the shared context; the services in [`services`]
//! read through the [`query_cache`] and keep the folder tree, the selection
//! and the image listings consistent across mutations.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod query_cache;
pub mod services;
pub mod state;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::ClientConfig;
pub use error::{AppError, Result, ValidationError};
pub use services::{ImageBlob, ListingService, MutationService, SessionService, TreeService};
pub use state::AppState;
