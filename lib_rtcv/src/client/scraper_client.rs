//! # Scraper Client
//!
//! Orchestrates one primary and zero or more secondary [`ServerConn`]s.
//!
//! ## Lifecycle
//! 1. [`ScraperClient::new`] validates the environment and the login-user
//!    cardinality the scraper expects.
//! 2. [`ScraperClient::authenticate`] checks the scraper role on every server
//!    concurrently. Any failure fails the whole call.
//! 3. [`ScraperClient::send_cv`] claims the reference in the cache, then sends
//!    to the primary and all secondaries concurrently. Only the primary's
//!    result is returned; secondary failures are logged and dropped.
//!
//! The reference is cached before anything is sent. If the primary then
//! fails, the same reference is still treated as sent until its entry
//! expires: duplicates are avoided at the cost of possibly never delivering
//! that CV.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::cv::{Cv, ReferenceNumber};
use super::error::ScraperError;
use super::reference_cache::{CacheTtl, Clock, ReferenceCache, SystemClock};
use super::server_conn::ServerConn;
use crate::configs::env_config::{ConfigError, LoginUser, ScraperEnv};
use crate::retrieve::backoff::RetryPolicy;

/// How many site login users a scraper needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginUsersRestriction {
    /// The scraper does not log in.
    None,
    /// Exactly one login user.
    One,
    /// At least one login user.
    OneOrMore,
}

impl LoginUsersRestriction {
    /// Checks `count` configured users against the restriction.
    pub fn check(self, count: usize) -> Result<(), ConfigError> {
        match self {
            LoginUsersRestriction::None => Ok(()),
            LoginUsersRestriction::One if count != 1 => Err(ConfigError::LoginUsers {
                expected: "exactly one",
                found: count,
            }),
            LoginUsersRestriction::OneOrMore if count == 0 => Err(ConfigError::LoginUsers {
                expected: "one or more",
                found: count,
            }),
            _ => Ok(()),
        }
    }
}

/// Tunables for [`ScraperClient::with_options`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Retry policy used by every server connection.
    pub retry: RetryPolicy,
    /// Clock driving reference expiry.
    pub clock: Arc<dyn Clock>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// What [`ScraperClient::send_cv`] did with a CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The primary server accepted the CV.
    Sent,
    /// The reference was cached, nothing was sent.
    AlreadySent,
    /// Dummy mode: cached but not sent.
    DryRun,
}

/// # Scraper Client
///
/// Exclusively owns its server connections and its reference cache.
pub struct ScraperClient {
    login_users: Vec<LoginUser>,
    primary: Arc<ServerConn>,
    secondaries: Vec<Arc<ServerConn>>,
    reference_cache: ReferenceCache,
    /// In-flight secondary submissions.
    replicas: TaskTracker,
    authenticated: AtomicBool,
    dummy_mode: bool,
}

impl ScraperClient {
    /// Builds a client with the default retry policy and the system clock.
    pub fn new(env: ScraperEnv, restriction: LoginUsersRestriction) -> Result<Self, ScraperError> {
        Self::with_options(env, restriction, ClientOptions::default())
    }

    /// Loads the environment from the standard sources and builds a client.
    pub fn from_env(restriction: LoginUsersRestriction) -> Result<Self, ScraperError> {
        Self::new(ScraperEnv::load()?, restriction)
    }

    /// Builds a client with explicit options.
    pub fn with_options(
        env: ScraperEnv,
        restriction: LoginUsersRestriction,
        options: ClientOptions,
    ) -> Result<Self, ScraperError> {
        env.validate()?;
        restriction.check(env.login_users.len())?;

        let primary = Arc::new(ServerConn::new(&env.primary_server, options.retry)?);
        let secondaries = env
            .alternative_servers
            .iter()
            .map(|server| ServerConn::new(server, options.retry).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            primary = %primary.location(),
            secondaries = secondaries.len(),
            "scraper client created"
        );

        Ok(Self {
            login_users: env.login_users,
            primary,
            secondaries,
            reference_cache: ReferenceCache::new(options.clock),
            replicas: TaskTracker::new(),
            authenticated: AtomicBool::new(false),
            dummy_mode: false,
        })
    }

    /// Suppresses all network activity. `authenticate` becomes a no-op and
    /// `send_cv` only does cache bookkeeping.
    pub fn set_dummy_mode(&mut self, enabled: bool) {
        self.dummy_mode = enabled;
    }

    /// Whether dummy mode is on.
    pub fn dummy_mode(&self) -> bool {
        self.dummy_mode
    }

    /// Whether `authenticate` has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// The primary connection followed by the secondaries.
    pub fn servers(&self) -> impl Iterator<Item = &Arc<ServerConn>> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }

    /// First configured login user for the scraped site.
    pub fn login_user(&self) -> Option<&LoginUser> {
        self.login_users.first()
    }

    /// All configured login users for the scraped site.
    pub fn login_users(&self) -> &[LoginUser] {
        &self.login_users
    }

    /// Verifies the scraper role on every server concurrently.
    ///
    /// Fails with the first [`CapabilityError`](super::error::CapabilityError)
    /// observed; results still outstanding at that point are ignored. Once
    /// authenticated, further calls return immediately.
    pub async fn authenticate(&self) -> Result<&Self, ScraperError> {
        if self.dummy_mode {
            debug!("dummy mode, skipping authentication");
            return Ok(self);
        }
        if self.is_authenticated() {
            return Ok(self);
        }

        try_join_all(self.servers().map(|server| server.verify_scraper_role())).await?;

        self.authenticated.store(true, Ordering::Release);
        info!(servers = self.secondaries.len() + 1, "authenticated with all servers");
        Ok(self)
    }

    /// Submits a CV unless its reference was already sent.
    ///
    /// The returned result is the primary server's. Secondaries are sent to
    /// in background tasks; see [`ScraperClient::wait_for_replicas`].
    pub async fn send_cv(&self, cv: &Cv) -> Result<SendOutcome, ScraperError> {
        let reference = &cv.reference_number;
        if reference.is_empty() {
            return Err(ScraperError::InvalidReference);
        }
        if !self.dummy_mode && !self.is_authenticated() {
            return Err(ScraperError::NotAuthenticated);
        }

        if !self.reference_cache.claim(reference, CacheTtl::default())? {
            debug!(%reference, "reference already sent, skipping");
            return Ok(SendOutcome::AlreadySent);
        }

        if self.dummy_mode {
            debug!(%reference, "dummy mode, not sending cv");
            return Ok(SendOutcome::DryRun);
        }

        if !self.secondaries.is_empty() {
            let shared = Arc::new(cv.clone());
            for server in &self.secondaries {
                let server = Arc::clone(server);
                let cv = Arc::clone(&shared);
                self.replicas.spawn(async move {
                    // Secondary failures never reach the caller.
                    if let Err(err) = server.send_cv(&cv).await {
                        warn!(
                            location = %server.location(),
                            reference = %cv.reference_number,
                            error = %err,
                            "secondary server did not accept cv, ignoring"
                        );
                    }
                });
            }
        }

        self.primary.send_cv(cv).await?;
        info!(%reference, "cv sent");
        Ok(SendOutcome::Sent)
    }

    /// Waits until every secondary submission spawned so far has finished.
    pub async fn wait_for_replicas(&self) {
        self.replicas.close();
        self.replicas.wait().await;
        self.replicas.reopen();
    }

    /// Number of secondary submissions still running.
    pub fn pending_replicas(&self) -> usize {
        self.replicas.len()
    }

    /// True if `reference` is cached and not expired.
    pub fn has_cached_reference(&self, reference: impl Into<ReferenceNumber>) -> bool {
        self.reference_cache.has(&reference.into())
    }

    /// Marks `reference` as sent without sending anything. `ttl` defaults to 72 hours.
    pub fn set_cached_reference(
        &self,
        reference: impl Into<ReferenceNumber>,
        ttl: Option<CacheTtl>,
    ) -> Result<(), ScraperError> {
        self.reference_cache.set(&reference.into(), ttl.unwrap_or_default())
    }
}
