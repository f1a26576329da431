//! # Error Types
//!
//! Validation errors for domain primitives. Component crates define their
//! own `thiserror` enums and carry these where a validation failure crosses
//! a crate boundary.

use thiserror::Error;

/// Validation failure for a domain primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier was empty or consisted only of whitespace.
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier {
        /// Which identifier type was being constructed.
        kind: &'static str,
    },

    /// An identifier contained characters that cannot appear in it.
    #[error("{kind} identifier {value:?} contains invalid characters")]
    InvalidIdentifier {
        /// Which identifier type was being constructed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostics.
        reason: String,
    },
}
