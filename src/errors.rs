use std::io;

use thiserror::Error;

/// Errors that can cross the boundary of a resource, tool, or prompt call.
///
/// The taxonomy is closed: every failure is one of these four kinds, and the
/// dispatch layer classifies them by matching on the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Malformed or missing caller input.
    #[error("{message}")]
    Validation { message: String },

    /// The requested resource, path, tool, or prompt does not exist or is
    /// inaccessible under the traversal policy (e.g. an oversized file).
    #[error("{message}")]
    NotFound { message: String },

    /// Access disallowed.
    #[error("{message}")]
    Permission { message: String },

    /// Anything unclassified.
    #[error("{message}")]
    Internal { message: String },
}

impl ContextError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short name of the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Permission { .. } => "permission",
            Self::Internal { .. } => "internal",
        }
    }

    /// The message carried by the error, without any classification prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::NotFound { message }
            | Self::Permission { message }
            | Self::Internal { message } => message,
        }
    }
}

impl From<io::Error> for ContextError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::not_found(e.to_string()),
            io::ErrorKind::PermissionDenied => Self::permission(e.to_string()),
            _ => Self::internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ContextError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("json error: {}", e))
    }
}

/// Convenience alias for results using `ContextError`.
pub type Result<T> = std::result::Result<T, ContextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: ContextError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_io_permission_maps_to_permission() {
        let err: ContextError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert!(matches!(err, ContextError::Permission { .. }));
    }

    #[test]
    fn test_other_io_maps_to_internal() {
        let err: ContextError = io::Error::other("boom").into();
        assert!(matches!(err, ContextError::Internal { .. }));
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_display_is_bare_message() {
        let err = ContextError::validation("missing required parameter: query");
        assert_eq!(err.to_string(), "missing required parameter: query");
    }
}
