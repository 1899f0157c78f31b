//! Common types module for the digitisation request system.
//!
//! This module defines the data types shared by every crate in the workspace:
//! raw commerce platform records, the projected request model, HTTP API
//! payloads and configuration validation helpers.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Raw records as returned by the commerce platform, parsed at the edge.
pub mod commerce;
/// Customer order history types.
pub mod orders;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Digitisation request domain types.
pub mod request;
/// Redacting wrapper for credentials.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Small helpers shared across crates.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use commerce::*;
pub use orders::*;
pub use registry::ImplementationRegistry;
pub use request::*;
pub use secret_string::SecretString;
pub use storage::StorageKey;
pub use utils::{current_timestamp, current_timestamp_millis, emails_match, truncate_id};
pub use validation::*;
