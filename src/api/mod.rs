//! Typed access to the Cuide-Se REST backend.

pub mod client;
pub mod keys;
pub mod types;

mod cached_client;

pub use cached_client::MarketplaceClient;
pub use client::{ApiClient, AuthHandler};
pub use keys::ApiQueryKey;
