/// Installs the global `tracing` subscriber (console + rolling JSON file).
pub mod setup;

pub use setup::{init_logging, LoggingError, LoggingOptions};
