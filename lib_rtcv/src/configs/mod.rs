//! # Configuration Modules
//!
//! This module aggregates the configuration sources the scraper client consumes.

/// Loading and validation of the scraper `env.json` / `env.jsonc`.
pub mod env_config;
