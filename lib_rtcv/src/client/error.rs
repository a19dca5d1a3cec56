use thiserror::Error;

use crate::configs::env_config::ConfigError;
use crate::retrieve::ky_http::RequestError;

/// Why a server failed the scraper capability check.
#[derive(Debug, Error)]
pub enum CapabilityErrorKind {
    /// The key info was fetched but the scraper role is absent.
    #[error("api key does not have the scraper role")]
    MissingScraperRole,

    /// The key info could not be fetched or decoded.
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// A server is not usable for submitting CVs.
#[derive(Debug, Error)]
#[error("capability check for {location} failed: {kind}")]
pub struct CapabilityError {
    /// The server that failed.
    pub location: String,
    /// What went wrong.
    #[source]
    pub kind: CapabilityErrorKind,
}

/// A CV was not accepted by a server.
#[derive(Debug, Error)]
#[error("sending cv to {location} failed: {source}")]
pub struct SubmitError {
    /// The server that failed.
    pub location: String,
    /// Status or transport failure.
    #[source]
    pub source: RequestError,
}

impl SubmitError {
    /// HTTP status when the server answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match &self.source {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// # Scraper Error
///
/// Everything the client can report to its caller.
#[derive(Debug, Error)]
pub enum ScraperError {
    /// Configuration is malformed or does not match the scraper's needs.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `authenticate` found a server without the scraper role.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The primary server rejected the CV or could not be reached.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// An empty reference number was used.
    #[error("reference number cannot be empty")]
    InvalidReference,

    /// A cache TTL outside of 12, 24 or 72 hours was requested.
    #[error("unsupported cache ttl of {0} hours, allowed are 12, 24 and 72")]
    InvalidTtl(u32),

    /// `send_cv` was called before a successful `authenticate`.
    #[error("client is not authenticated, call authenticate first")]
    NotAuthenticated,
}
