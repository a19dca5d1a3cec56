//! # Data Retrieval Module
//!
//! HTTP plumbing shared by every RT-CV call.
//!
//! ## Contained Modules:
//!
//! - **`backoff`**: the linear backoff [`RetryPolicy`] wrapped around every
//!   outbound attempt. Only connection-level failures are retried.
//! - **`ky_http`**: a JSON `ApiClient` built on `reqwest` and
//!   `reqwest-middleware` that injects the RT-CV headers and funnels each send
//!   through the retry policy.

/// Bounded retries with linearly increasing delays.
pub mod backoff;
/// Generic HTTP API client with retries and request tracing.
pub mod ky_http;

pub use backoff::{RetryPolicy, TransportError};
pub use ky_http::{ApiClient, ApiResponse, RequestError};
