//! # Server Connection
//!
//! One authenticated channel to one RT-CV intake server. The authorization
//! header is derived once from the API key id and the digest of the secret;
//! the secret itself is not kept.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cv::Cv;
use super::error::{CapabilityError, CapabilityErrorKind, SubmitError};
use crate::configs::env_config::{ConfigError, ServerCredentials};
use crate::retrieve::backoff::RetryPolicy;
use crate::retrieve::ky_http::ApiClient;
use crate::utils::credentials::authorization_value;

/// Role id an API key needs to submit CVs.
pub const SCRAPER_ROLE: u64 = 1;

const KEY_INFO_PATH: &str = "/api/v1/auth/keyinfo";
const SCAN_CV_PATH: &str = "/api/v1/scraper/scanCV";

/// Answer of the key introspection endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiKeyInfo {
    /// Roles granted to the key.
    pub roles: Vec<ApiRole>,
}

/// A single granted role.
#[derive(Debug, Deserialize)]
pub struct ApiRole {
    /// Numeric role id.
    pub role: u64,
}

impl ApiRole {
    /// True for the scraper role.
    pub fn is_scraper(&self) -> bool {
        self.role == SCRAPER_ROLE
    }
}

impl ApiKeyInfo {
    /// True if any granted role is the scraper role.
    pub fn has_scraper_role(&self) -> bool {
        self.roles.iter().any(ApiRole::is_scraper)
    }
}

#[derive(Serialize)]
struct ScanCvBody<'a> {
    cv: &'a Cv,
}

/// # Server Conn
///
/// Built from validated [`ServerCredentials`]. Immutable after construction.
pub struct ServerConn {
    location: String,
    client: ApiClient,
}

impl fmt::Debug for ServerConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConn").field("location", &self.location).finish()
    }
}

impl ServerConn {
    /// Creates a connection using `retry` for every request.
    pub fn new(credentials: &ServerCredentials, retry: RetryPolicy) -> Result<Self, ConfigError> {
        let authorization = authorization_value(&credentials.api_key_id, &credentials.api_key);
        let client = ApiClient::new(&credentials.server_location, Some(authorization), retry)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", credentials.server_location, e)))?;

        Ok(Self {
            location: credentials.server_location.clone(),
            client,
        })
    }

    /// The server location as configured.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Confirms the API key holds the scraper role on this server.
    pub async fn verify_scraper_role(&self) -> Result<(), CapabilityError> {
        let key_info: ApiKeyInfo =
            self.client
                .get_json(KEY_INFO_PATH)
                .await
                .map_err(|e| CapabilityError {
                    location: self.location.clone(),
                    kind: CapabilityErrorKind::Request(e),
                })?;

        if !key_info.has_scraper_role() {
            return Err(CapabilityError {
                location: self.location.clone(),
                kind: CapabilityErrorKind::MissingScraperRole,
            });
        }

        info!(location = %self.location, "api key has the scraper role");
        Ok(())
    }

    /// Submits one CV as `{"cv": ...}`. Any status of 400 or above fails.
    pub async fn send_cv(&self, cv: &Cv) -> Result<(), SubmitError> {
        self.client
            .post(SCAN_CV_PATH, &ScanCvBody { cv })
            .await
            .map_err(|source| SubmitError {
                location: self.location.clone(),
                source,
            })?;

        debug!(location = %self.location, reference = %cv.reference_number, "cv accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_scraper_role() {
        let info: ApiKeyInfo =
            serde_json::from_str(r#"{"roles":[{"role":4},{"role":1,"slug":"scraper"}]}"#).unwrap();
        assert!(info.has_scraper_role());

        let info: ApiKeyInfo = serde_json::from_str(r#"{"roles":[{"role":2}]}"#).unwrap();
        assert!(!info.has_scraper_role());
    }

    #[test]
    fn test_scan_cv_body_wraps_cv() {
        let cv = Cv::new("ref-1");
        let body = serde_json::to_value(ScanCvBody { cv: &cv }).unwrap();
        assert_eq!(body["cv"]["referenceNumber"], "ref-1");
    }

    #[test]
    fn test_debug_hides_authorization() {
        let conn = ServerConn::new(
            &ServerCredentials {
                server_location: "http://localhost:4000".to_string(),
                api_key_id: "id".to_string(),
                api_key: "secret".to_string(),
            },
            RetryPolicy::default(),
        )
        .unwrap();
        assert_eq!(format!("{:?}", conn), r#"ServerConn { location: "http://localhost:4000" }"#);
    }
}
