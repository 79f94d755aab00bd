//! Errors surfaced to host code.

use crate::native::Status;

/// Failure of a bridge call. Every variant is reported synchronously to the
/// caller; nothing is retried or swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A parameter has the wrong type. Raised before any native call.
    #[error("{0}")]
    Type(String),

    /// A parameter is outside its domain. Raised before any native call.
    #[error("{0}")]
    Range(String),

    /// The native engine could not create the resource, or the external
    /// memory budget is exhausted.
    #[error("allocation failed: {0}")]
    Allocation(Status),

    /// A native call left a non-success status behind.
    #[error("{0}")]
    Operation(Status),

    /// The object, or the memory view over it, has been released.
    #[error("{0} has been released")]
    Detached(&'static str),
}

/// Coarse classification of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Allocation,
    Operation,
    Detached,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Type(_) | BridgeError::Range(_) => ErrorKind::Validation,
            BridgeError::Allocation(_) => ErrorKind::Allocation,
            BridgeError::Operation(_) => ErrorKind::Operation,
            BridgeError::Detached(_) => ErrorKind::Detached,
        }
    }

    /// The native status behind the error, if there is one.
    pub fn status(&self) -> Option<Status> {
        match self {
            BridgeError::Allocation(status) | BridgeError::Operation(status) => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(BridgeError::Type("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(BridgeError::Range("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(
            BridgeError::Allocation(Status::NoMemory).kind(),
            ErrorKind::Allocation
        );
        assert_eq!(
            BridgeError::Operation(Status::InvalidRestore).kind(),
            ErrorKind::Operation
        );
        assert_eq!(BridgeError::Detached("Surface").kind(), ErrorKind::Detached);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            BridgeError::Operation(Status::SurfaceFinished).to_string(),
            "the target surface has been finished"
        );
        assert_eq!(
            BridgeError::Allocation(Status::NoMemory).to_string(),
            "allocation failed: out of memory"
        );
        assert_eq!(
            BridgeError::Detached("Surface").to_string(),
            "Surface has been released"
        );
        assert_eq!(BridgeError::Detached("x").status(), None);
    }
}
