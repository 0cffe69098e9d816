//! Error types for decoding and running operations.

use std::fmt;

use crate::wire::WireError;

/// Errors that can occur while decoding or running a single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// No constructor is registered for this factory type id.
    UnknownType(i32),

    /// The operation payload could not be decoded or encoded.
    Wire(WireError),

    /// A piece of context the operation needs was never stamped on it.
    MissingContext(&'static str),

    /// The operation ran and failed.
    Failed(String),
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(id) => write!(f, "Unknown operation type id: {}", id),
            Self::Wire(err) => write!(f, "Operation wire error: {}", err),
            Self::MissingContext(what) => write!(f, "Operation context is missing {}", what),
            Self::Failed(msg) => write!(f, "Operation failed: {}", msg),
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WireError> for OperationError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}

impl From<anyhow::Error> for OperationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{:#}", err))
    }
}

/// Result type for operation decoding and execution.
pub type OperationResult<T> = Result<T, OperationError>;
