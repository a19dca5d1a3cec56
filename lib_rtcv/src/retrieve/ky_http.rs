//! # HTTP Retrieval Utilities
//!
//! This module provides an asynchronous API client wrapper around `reqwest`.
//! Every request carries `Content-Type: application/json` and, when configured,
//! a pre-computed `Authorization` header. Sends go through the [`RetryPolicy`],
//! so connection failures are retried while HTTP error statuses are returned
//! to the caller as-is.

use std::time::Instant;

use async_trait::async_trait;
use http::Extensions;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Request, Response, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use super::backoff::{RetryPolicy, TransportError};

/// Errors produced by [`ApiClient`].
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server answered with a status code of 400 or above.
    #[error("server responded with [{status}] {status_text}: {body}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// Canonical reason phrase.
        status_text: String,
        /// Raw response body.
        body: String,
    },

    /// The request never got a response within the retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be read.
    #[error("unable to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("unable to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be serialized.
    #[error("unable to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The base location plus path is not a valid URL.
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// The authorization value contains bytes not allowed in a header.
    #[error("authorization value is not a valid header value")]
    InvalidHeader,
}

/// A completed HTTP exchange.
#[derive(Debug)]
pub struct ApiResponse {
    /// The numeric HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub status_text: String,
    /// The headers returned by the server.
    pub headers: HeaderMap,
    /// The raw response body.
    pub body: String,
}

impl ApiResponse {
    /// True for any status below 400.
    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    /// True for any status of 400 or above.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Turns an error status into [`RequestError::Status`].
    pub fn error_for_status(self) -> Result<Self, RequestError> {
        if self.is_error() {
            return Err(RequestError::Status {
                status: self.status,
                status_text: self.status_text,
                body: self.body,
            });
        }
        Ok(self)
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        serde_json::from_str(&self.body).map_err(RequestError::Decode)
    }
}

/// Logs every attempt that leaves the client.
struct RequestTracing;

#[async_trait]
impl Middleware for RequestTracing {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let started = Instant::now();

        let result = next.run(req, extensions).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(res) => debug!(%method, %url, status = res.status().as_u16(), elapsed_ms, "request completed"),
            Err(e) => debug!(%method, %url, error = %e, elapsed_ms, "request failed"),
        }
        result
    }
}

/// # Api Client
///
/// JSON HTTP client bound to one base location.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// Base location, paths are appended to it verbatim.
    base_url: String,
    /// Pre-computed `Authorization` header, marked sensitive.
    authorization: Option<HeaderValue>,
    /// Applied to every send.
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Fails when `base_url` is not an absolute URL or `authorization` is not
    /// a valid header value.
    pub fn new(
        base_url: &str,
        authorization: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self, RequestError> {
        Url::parse(base_url).map_err(|source| RequestError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        let authorization = match authorization {
            Some(value) => {
                let mut header =
                    HeaderValue::from_str(&value).map_err(|_| RequestError::InvalidHeader)?;
                header.set_sensitive(true);
                Some(header)
            }
            None => None,
        };

        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RequestTracing)
            .build();

        Ok(Self {
            inner: client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
            retry,
        })
    }

    /// The base location without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs one logical request; the body, if any, is sent as JSON.
    ///
    /// Error statuses are not errors here, check [`ApiResponse::is_error`] or
    /// use [`ApiResponse::error_for_status`].
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        // 1. Construct the full absolute URL
        let full_url = format!("{}{}", self.base_url, path);
        let url = Url::parse(&full_url).map_err(|source| RequestError::InvalidUrl {
            url: full_url.clone(),
            source,
        })?;

        // 2. Headers sent on every call
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = &self.authorization {
            headers.insert(AUTHORIZATION, auth.clone());
        }

        // 3. Serialize the body once, it is re-sent on every attempt
        let body = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(RequestError::Encode)?),
            None => None,
        };

        // 4. Execute with retries, only failures without a response count
        let response = self
            .retry
            .retry(|| {
                let mut req = self
                    .inner
                    .request(method.clone(), url.clone())
                    .headers(headers.clone());
                if let Some(b) = &body {
                    req = req.body(b.clone());
                }
                req.send()
            })
            .await?;

        // 5. Capture the response
        let status = response.status();
        let resp_headers = response.headers().clone();
        let text = response.text().await.map_err(RequestError::Body)?;

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: resp_headers,
            body: text,
        })
    }

    /// GET `path` and decode a successful JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.request::<()>(Method::GET, path, None)
            .await?
            .error_for_status()?
            .json()
    }

    /// POST `body` to `path`, failing on any error status.
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body))
            .await?
            .error_for_status()
    }
}
