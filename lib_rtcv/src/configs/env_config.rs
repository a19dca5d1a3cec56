//! # Scraper Environment Configuration
//!
//! Typed representation of the `env.json` a scraper is deployed with. The file
//! names the intake servers (one primary plus optional alternatives) and the
//! users the scraper logs in with on the site it scrapes.
//!
//! ## Lookup order
//! 1. The file named by `RTCV_SCRAPER_CLIENT_ENV_FILE`, or `env.json`.
//! 2. The raw contents of the `RTCV_SCRAPER_CLIENT_ENV` variable. A file that
//!    exists but cannot be read only fails the load when this is empty.
//! 3. `env.jsonc`, only when no custom file name was given.
//!
//! Contents are parsed as JSON5 so commented `jsonc` files load as well.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt, fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable holding an alternative config file name.
pub const ENV_FILE_VAR: &str = "RTCV_SCRAPER_CLIENT_ENV_FILE";
/// Environment variable holding the config contents directly.
pub const ENV_CONTENTS_VAR: &str = "RTCV_SCRAPER_CLIENT_ENV";

const DEFAULT_ENV_FILE: &str = "env.json";
const FALLBACK_ENV_FILE: &str = "env.jsonc";

/// Errors raised while loading or validating the scraper configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("unable to read {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The contents are not valid JSON / JSONC.
    #[error("unable to parse env config: {0}")]
    Parse(String),

    /// A field is missing or malformed.
    #[error("validating env failed: {0}")]
    Invalid(String),

    /// No configuration source was found.
    #[error("{0}")]
    NotFound(String),

    /// The number of login users does not match what the scraper expects.
    #[error("expected {expected} login user(s) but got {found}")]
    LoginUsers {
        /// Human readable expectation, e.g. "exactly one".
        expected: &'static str,
        /// Number of configured login users.
        found: usize,
    },
}

/// Credentials for one RT-CV intake server.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct ServerCredentials {
    /// Base location, e.g. `https://rtcv.example.com`.
    pub server_location: String,
    /// Public API key identifier.
    pub api_key_id: String,
    /// API key secret. Only its digest is ever sent.
    pub api_key: String,
}

impl fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCredentials")
            .field("server_location", &self.server_location)
            .field("api_key_id", &self.api_key_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ServerCredentials {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if self.server_location.is_empty() {
            return Err(ConfigError::Invalid(format!("{}.server_location is required", path)));
        }
        let scheme_ok = Url::parse(&self.server_location)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !scheme_ok {
            return Err(ConfigError::Invalid(format!(
                "{}.server_location must start with http:// or https://",
                path
            )));
        }
        if self.api_key_id.is_empty() {
            return Err(ConfigError::Invalid(format!("{}.api_key_id is required", path)));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Invalid(format!("{}.api_key is required", path)));
        }
        Ok(())
    }
}

/// A user for the site being scraped (not an RT-CV credential).
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoginUser {
    /// Site username.
    pub username: String,
    /// Site password.
    pub password: String,
}

impl fmt::Debug for LoginUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// # Scraper Env
///
/// The full scraper configuration. Optional arrays default to empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScraperEnv {
    /// Users to log in with on the scraped site.
    #[serde(default)]
    pub login_users: Vec<LoginUser>,
    /// The server whose answer decides whether a submission succeeded.
    pub primary_server: ServerCredentials,
    /// Best-effort replica servers.
    #[serde(default)]
    pub alternative_servers: Vec<ServerCredentials>,
}

impl FromStr for ScraperEnv {
    type Err = ConfigError;

    /// Parses and validates a JSON / JSONC document.
    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        let env: ScraperEnv =
            serde_json5::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        env.validate()?;
        Ok(env)
    }
}

impl ScraperEnv {

    /// Reads, parses and validates a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Loads the configuration from the standard sources, see the module docs.
    pub fn load() -> Result<Self, ConfigError> {
        let custom_file = env::var(ENV_FILE_VAR).ok().filter(|v| !v.is_empty());
        let file_name = custom_file.clone().unwrap_or_else(|| DEFAULT_ENV_FILE.to_string());

        let unreadable = match fs::read_to_string(&file_name) {
            Ok(contents) => return contents.parse(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => Some(ConfigError::Io { path: PathBuf::from(&file_name), source }),
        };

        if let Some(contents) = env::var(ENV_CONTENTS_VAR).ok().filter(|v| !v.is_empty()) {
            return contents.parse();
        }
        if let Some(err) = unreadable {
            return Err(err);
        }

        if let Some(custom) = custom_file {
            return Err(ConfigError::NotFound(format!(
                "no {} file or ${} environment variable found, cannot continue",
                custom, ENV_CONTENTS_VAR
            )));
        }

        match fs::read_to_string(FALLBACK_ENV_FILE) {
            Ok(contents) => contents.parse(),
            Err(_) => Err(ConfigError::NotFound(format!(
                "no env.json(c) file or ${} environment variable found, cannot continue. \
                 hint: an env.json for this scraper can be created on the RT-CV dashboard",
                ENV_CONTENTS_VAR
            ))),
        }
    }

    /// Checks that every required string is non-empty and every server location is an http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.primary_server.validate("primary_server")?;

        for (idx, server) in self.alternative_servers.iter().enumerate() {
            server.validate(&format!("alternative_servers[{}]", idx))?;
        }

        for (idx, user) in self.login_users.iter().enumerate() {
            if user.username.is_empty() {
                return Err(ConfigError::Invalid(format!("login_users[{}].username is required", idx)));
            }
            if user.password.is_empty() {
                return Err(ConfigError::Invalid(format!("login_users[{}].password is required", idx)));
            }
        }

        Ok(())
    }

    /// Primary first, then the alternatives in the order given.
    pub fn servers(&self) -> impl Iterator<Item = &ServerCredentials> {
        std::iter::once(&self.primary_server).chain(self.alternative_servers.iter())
    }
}
