//! # Utilities Module
//!
//! General-purpose helpers shared by the rest of the crate.
//!
//! ## Contained Modules:
//!
//! - **`credentials`**: derives the `Authorization` header value sent to
//!   RT-CV from an API key id and its secret.

/// API key hashing and authorization header construction.
pub mod credentials;

pub use credentials::{authorization_value, hash_api_key};
