//! # RT-CV Scraper Client
//!
//! Submits CVs to a primary intake server and any number of alternative
//! servers while suppressing repeat submissions of the same reference.
//!
//! ## Core Components:
//!
//! - **`cv`**: the record being submitted. Only the reference number is
//!   interpreted, everything else is forwarded as-is.
//! - **`reference_cache`**: time-expiring set of references already handed
//!   to the servers.
//! - **`server_conn`**: one authenticated channel to one intake server.
//! - **`scraper_client`**: orchestrates the connections, enforces the
//!   authentication precondition and the primary-authoritative fan-out.
//! - **`error`**: the error taxonomy surfaced to callers.

/// CV record model.
pub mod cv;
/// Error taxonomy of the client.
pub mod error;
/// Time-expiring deduplication cache keyed by reference number.
pub mod reference_cache;
/// The submission client.
pub mod scraper_client;
/// A connection to one intake server.
pub mod server_conn;

// --- Public API Re-exports ---
pub use cv::{Course, Cv, Education, LangLevel, Language, PersonalDetails, ReferenceNumber, WorkExperience};
pub use error::{CapabilityError, CapabilityErrorKind, ScraperError, SubmitError};
pub use reference_cache::{CacheTtl, Clock, ManualClock, ReferenceCache, SystemClock};
pub use scraper_client::{ClientOptions, LoginUsersRestriction, ScraperClient, SendOutcome};
pub use server_conn::{ApiKeyInfo, ApiRole, ServerConn, SCRAPER_ROLE};
