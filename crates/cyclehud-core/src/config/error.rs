//! Configuration errors

use thiserror::Error;

/// Errors raised while loading startup configuration.
///
/// These are fatal: the relay cannot route without a catalog.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("I/O error reading '{path}': {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("Parse error in '{path}': {source}")]
    ParseError {
        path: String,
        source: serde_json::Error,
    },

    #[error("Catalog is empty: no sensor is mapped to a bus signal")]
    EmptyCatalog,

    #[error("Catalog conflict: sensor '{sensor}' maps to {message}.{signal}, which maps back to '{other}'")]
    CatalogConflict {
        sensor: String,
        message: String,
        signal: String,
        other: String,
    },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Home directory not found; set explicit paths in the configuration")]
    NoHomeDir,
}
