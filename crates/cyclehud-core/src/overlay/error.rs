//! Overlay errors

use thiserror::Error;

/// A telemetry value that cannot be shown in a field.
///
/// The field keeps its previous value when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FormatError {
    #[error("'{0}' is not a number")]
    NotNumeric(String),

    #[error("'{0}' is not a finite number")]
    NotFinite(String),

    #[error("Elapsed time '{0}' is negative")]
    NegativeTime(String),

    #[error("'{0}' is too large to display")]
    OutOfRange(String),
}
