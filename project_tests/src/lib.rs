//! # Mock RT-CV Servers
//!
//! In-process stand-ins for RT-CV intake servers used by the integration
//! tests. Each mock binds `127.0.0.1:0`, serves the key introspection and
//! scan endpoints, and records every request it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use lib_rtcv::{LoginUser, ScraperEnv, ServerCredentials};

/// API key id every mock expects.
pub const TEST_KEY_ID: &str = "test-key-id";
/// API key secret every mock expects the digest of.
pub const TEST_KEY: &str = "test-key";

/// # Mock Config
///
/// Behaviour of one mock server.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Roles returned from `/api/v1/auth/keyinfo`.
    pub roles: Vec<u64>,
    /// Status returned from `/api/v1/auth/keyinfo`.
    pub keyinfo_status: StatusCode,
    /// Status returned from `/api/v1/scraper/scanCV`.
    pub scan_status: StatusCode,
    /// Delay before a scan request is recorded and answered.
    pub scan_delay: Duration,
}

impl Default for MockConfig {
    /// A healthy server holding the scraper role.
    fn default() -> Self {
        Self {
            roles: vec![1],
            keyinfo_status: StatusCode::OK,
            scan_status: StatusCode::OK,
            scan_delay: Duration::ZERO,
        }
    }
}

impl MockConfig {
    /// Key info without the scraper role.
    pub fn without_scraper_role() -> Self {
        Self { roles: vec![2, 3], ..Self::default() }
    }

    /// Rejects every scan with `status`.
    pub fn failing_scans(status: StatusCode) -> Self {
        Self { scan_status: status, ..Self::default() }
    }

    /// Answers scans only after `delay`.
    pub fn slow_scans(delay: Duration) -> Self {
        Self { scan_delay: delay, ..Self::default() }
    }
}

#[derive(Default)]
struct Recorded {
    keyinfo_hits: AtomicUsize,
    scan_hits: AtomicUsize,
    scan_bodies: Mutex<Vec<Value>>,
    auth_headers: Mutex<Vec<String>>,
}

struct MockState {
    config: MockConfig,
    recorded: Recorded,
}

impl MockState {
    fn record_auth(&self, headers: &HeaderMap) {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.recorded.auth_headers.lock().unwrap().push(value);
    }
}

async fn keyinfo(State(state): State<Arc<MockState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    state.record_auth(&headers);
    state.recorded.keyinfo_hits.fetch_add(1, Ordering::SeqCst);

    if !state.config.keyinfo_status.is_success() {
        return (state.config.keyinfo_status, Json(json!({ "error": "invalid api key" })));
    }
    let roles: Vec<Value> = state.config.roles.iter().map(|r| json!({ "role": r })).collect();
    (StatusCode::OK, Json(json!({ "roles": roles })))
}

async fn scan_cv(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !state.config.scan_delay.is_zero() {
        tokio::time::sleep(state.config.scan_delay).await;
    }
    state.record_auth(&headers);
    state.recorded.scan_bodies.lock().unwrap().push(body);
    state.recorded.scan_hits.fetch_add(1, Ordering::SeqCst);

    if !state.config.scan_status.is_success() {
        return (state.config.scan_status, Json(json!({ "error": "mock rejected cv" })));
    }
    (StatusCode::OK, Json(json!({ "success": true })))
}

/// # Mock RT-CV Server
///
/// Stops serving when dropped or after [`MockRtcvServer::shutdown`].
pub struct MockRtcvServer {
    location: String,
    state: Arc<MockState>,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockRtcvServer {
    /// Starts a mock with `config` on a random local port.
    pub async fn start(config: MockConfig) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            config,
            recorded: Recorded::default(),
        });

        let app = Router::new()
            .route("/api/v1/auth/keyinfo", get(keyinfo))
            .route("/api/v1/scraper/scanCV", post(scan_cv))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stopped.await;
                })
                .await;
        });

        Ok(Self {
            location: format!("http://{}", addr),
            state,
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Starts a healthy mock.
    pub async fn healthy() -> anyhow::Result<Self> {
        Self::start(MockConfig::default()).await
    }

    /// Base location, e.g. `http://127.0.0.1:53211`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Credentials pointing at this mock.
    pub fn credentials(&self) -> ServerCredentials {
        ServerCredentials {
            server_location: self.location.clone(),
            api_key_id: TEST_KEY_ID.to_string(),
            api_key: TEST_KEY.to_string(),
        }
    }

    /// Closes the listener and every open connection, then waits for the
    /// server task. Later requests to [`MockRtcvServer::location`] fail to connect.
    pub async fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Number of key info requests received.
    pub fn keyinfo_hits(&self) -> usize {
        self.state.recorded.keyinfo_hits.load(Ordering::SeqCst)
    }

    /// Number of scan requests received.
    pub fn scan_hits(&self) -> usize {
        self.state.recorded.scan_hits.load(Ordering::SeqCst)
    }

    /// Bodies of all scan requests, oldest first.
    pub fn scan_bodies(&self) -> Vec<Value> {
        self.state.recorded.scan_bodies.lock().unwrap().clone()
    }

    /// `Authorization` headers of all requests, oldest first.
    pub fn auth_headers(&self) -> Vec<String> {
        self.state.recorded.auth_headers.lock().unwrap().clone()
    }
}

impl Drop for MockRtcvServer {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// Credentials for a local port nothing listens on.
pub async fn unreachable_credentials() -> anyhow::Result<ServerCredentials> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(ServerCredentials {
        server_location: format!("http://{}", addr),
        api_key_id: TEST_KEY_ID.to_string(),
        api_key: TEST_KEY.to_string(),
    })
}

/// An env with one login user, `primary` and the given alternatives.
pub fn env_for(primary: ServerCredentials, alternatives: Vec<ServerCredentials>) -> ScraperEnv {
    ScraperEnv {
        login_users: vec![LoginUser {
            username: "scraper".to_string(),
            password: "hunter2".to_string(),
        }],
        primary_server: primary,
        alternative_servers: alternatives,
    }
}
