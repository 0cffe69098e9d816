//! Error types for scatter/gather execution.

use std::fmt;

use crate::execution::ExecutionError;
use crate::operation::OperationError;
use crate::response::ResponseError;
use crate::types::PartitionId;

/// Why a single partition produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionFailure {
    /// The template could not be turned into an operation.
    Decode(OperationError),

    /// The execution service refused the operation.
    Submit(ExecutionError),

    /// The response never arrived.
    Response(ResponseError),

    /// The operation ran and answered with an error.
    Remote(String),
}

impl fmt::Display for PartitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "decode failed: {}", err),
            Self::Submit(err) => write!(f, "submission failed: {}", err),
            Self::Response(err) => write!(f, "no response: {}", err),
            Self::Remote(msg) => write!(f, "operation failed: {}", msg),
        }
    }
}

impl std::error::Error for PartitionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Submit(err) => Some(err),
            Self::Response(err) => Some(err),
            Self::Remote(_) => None,
        }
    }
}

impl From<OperationError> for PartitionFailure {
    fn from(err: OperationError) -> Self {
        Self::Decode(err)
    }
}

impl From<ExecutionError> for PartitionFailure {
    fn from(err: ExecutionError) -> Self {
        Self::Submit(err)
    }
}

impl From<ResponseError> for PartitionFailure {
    fn from(err: ResponseError) -> Self {
        Self::Response(err)
    }
}

/// Errors returned by the scatter/gather orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatherError {
    /// The same partition was listed twice.
    DuplicatePartition(PartitionId),

    /// The orchestrator was run without a node to dispatch on.
    MissingNode,

    /// A partition failed under the fail-fast policy.
    PartitionFailed {
        partition: PartitionId,
        cause: PartitionFailure,
    },
}

impl fmt::Display for GatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePartition(p) => write!(f, "Partition {} is listed more than once", p),
            Self::MissingNode => write!(f, "No node engine stamped on the orchestrator"),
            Self::PartitionFailed { partition, cause } => {
                write!(f, "Partition {} failed: {}", partition, cause)
            }
        }
    }
}

impl std::error::Error for GatherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PartitionFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Result type for scatter/gather execution.
pub type GatherResult<T> = Result<T, GatherError>;
