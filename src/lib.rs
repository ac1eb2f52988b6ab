//! Client-side data access layer for the Cuide-Se marketplace.
//!
//! This crate is the data plumbing a Cuide-Se host application (web or
//! mobile shell) is built on:
//! - [`cache`]: keyed query cache with staleness windows, invalidation,
//!   and write fencing for racing fetches
//! - [`api`]: authenticated REST client with typed marketplace operations
//!   (professional search, scheduling, reviews, profile) and the forced
//!   logout-on-401 protocol
//! - [`query`]: per-view query state (idle/loading/ready/failed) with
//!   stale-data retention across refetches
//! - [`form`]: field-level validation with touched/dirty tracking
//! - [`session`]: persisted bearer token, user, and last-active storage
//!
//! UI rendering, routing, and the backend services themselves are out of
//! scope; hosts drive this layer from their own event loop.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod form;
pub mod query;
pub mod session;

pub use api::{ApiClient, ApiQueryKey, AuthHandler, MarketplaceClient};
pub use cache::{Mutation, Operation, QueryCache};
pub use config::Config;
pub use error::{Error, Result};
pub use form::{FieldRules, FormState};
pub use query::{Query, QueryPhase};
pub use session::CredentialStore;
