use crate::{access::Operation, store::StoreError};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// InvalidKind
///
/// Sub-classification for payloads that fail structural or semantic
/// validation.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum InvalidKind {
    #[display("missing values")]
    MissingValues,

    #[display("invalid values")]
    InvalidValues,

    #[display("unexpected type")]
    UnexpectedType,
}

///
/// ResourceError
///
/// The caller-facing error taxonomy for every factory operation.
///
/// `NotFound`, `InvalidResource` and `StaleUpdate` are expected outcomes a
/// protocol adapter maps to request-level faults. `PermissionDenied`,
/// `DuplicateResource` and `ResourceAccess` always abort the operation;
/// `ResourceAccess` in particular marks internal or persistence failures
/// that callers are not expected to handle.
///

#[derive(Debug, ThisError)]
pub enum ResourceError {
    #[error("resource not found: {selectors}")]
    NotFound { selectors: String },

    #[error("invalid or insufficient selectors")]
    InvalidSelectors,

    #[error("invalid resource ({kind}): {message}")]
    InvalidResource { kind: InvalidKind, message: String },

    #[error("stale update: persisted version is {current}, submitted {submitted}")]
    StaleUpdate { current: i64, submitted: i64 },

    #[error("permission denied: {operation} on {kind}")]
    PermissionDenied { operation: Operation, kind: String },

    #[error("duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("resource access failure: {0}")]
    ResourceAccess(String),
}

impl ResourceError {
    /// A payload that omits required data.
    pub fn missing_values(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            kind: InvalidKind::MissingValues,
            message: message.into(),
        }
    }

    /// A payload that carries semantically invalid data.
    pub fn invalid_values(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            kind: InvalidKind::InvalidValues,
            message: message.into(),
        }
    }

    /// A payload whose representation does not match the declared kind.
    pub fn unexpected_type(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            kind: InvalidKind::UnexpectedType,
            message: message.into(),
        }
    }

    /// Default failure for conversion extension points a mapper left
    /// unimplemented.
    #[must_use]
    pub fn update_not_supported() -> Self {
        Self::unexpected_type("update not supported")
    }

    /// Default failure for an unknown custom operation name.
    pub fn unsupported_operation(op: &str) -> Self {
        Self::unexpected_type(format!("unsupported operation '{op}'"))
    }

    /// Selectors that matched no visible entity.
    pub fn not_found(selectors: impl Into<String>) -> Self {
        Self::NotFound {
            selectors: selectors.into(),
        }
    }

    /// Translate a persistence failure into the uniform runtime category.
    ///
    /// This is the only crossing point for store errors; callers never see
    /// the underlying `StoreError` variants.
    #[must_use]
    pub fn from_store(err: StoreError) -> Self {
        Self::ResourceAccess(err.to_string())
    }

    /// True for the expected, caller-meaningful outcomes that must pass
    /// through the transaction boundary untouched.
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidSelectors
                | Self::InvalidResource { .. }
                | Self::StaleUpdate { .. }
        )
    }
}
