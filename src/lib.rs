// Core modules
mod config;
pub mod execution;
mod node;
pub mod operation;
pub mod orchestrator;
mod response;
mod types;
pub mod wire;

// Re-export key types and functions
pub use config::{ConfigError, NodeConfig, resolve_config_path};
pub use execution::{
    ExecuteFuture, ExecutionError, ExecutionService, Executor, Job, OperationService,
};
pub use node::NodeEngine;
pub use operation::{
    MultiplyPartitionOperation, Operation, OperationContext, OperationError, OperationRegistry,
};
pub use orchestrator::{
    FailurePolicy, GatherError, PartitionFailure, PartitionIteratingOperation, PartitionResponse,
    PartitionResults,
};
pub use response::{ResponseChannel, ResponseError, ResponseHandler, ResponseSender, response_channel};
pub use types::{CallerAddress, PartitionId, ReplicaIndex, ServiceName};
pub use wire::{Data, ResultValue, WireError};
