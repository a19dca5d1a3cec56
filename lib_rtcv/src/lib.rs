//! # lib_rtcv
//!
//! Client-side connector that submits scanned CVs to one or more RT-CV intake
//! servers. Each concern lives in its own feature-gated module:
//!
//! - **`configs`**: loading and validating the scraper `env.json`.
//! - **`loggers`**: `tracing` subscriber setup.
//! - **`retrieve`**: HTTP `ApiClient` with linear-backoff retries.
//! - **`utils`**: credential digesting.
//! - **`client`**: the submission client with its reference cache.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Scraper environment configuration.
#[cfg(feature = "configs")]
pub mod configs;

/// Logging setup.
#[cfg(feature = "loggers")]
pub mod loggers;

/// HTTP retrieval with retries.
#[cfg(feature = "retrieve")]
pub mod retrieve;

/// General helpers.
#[cfg(feature = "utils")]
pub mod utils;

/// The RT-CV submission client.
#[cfg(feature = "client")]
pub mod client;

// --- Public API Re-exports ---
#[cfg(feature = "client")]
pub use client::{
    CacheTtl, ClientOptions, Cv, LoginUsersRestriction, ReferenceNumber, ScraperClient,
    ScraperError, SendOutcome,
};
#[cfg(feature = "configs")]
pub use configs::env_config::{ConfigError, LoginUser, ScraperEnv, ServerCredentials};
