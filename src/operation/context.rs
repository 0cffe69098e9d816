//! Per-invocation attributes stamped onto an operation before it is dispatched.

use std::fmt;
use std::sync::Arc;

use crate::node::NodeEngine;
use crate::response::ResponseHandler;
use crate::types::{CallerAddress, PartitionId, ReplicaIndex, ServiceName};

/// Where an operation runs, who asked for it and where its answer goes.
#[derive(Clone, Default)]
pub struct OperationContext {
    node: Option<NodeEngine>,
    call_id: i64,
    caller: Option<CallerAddress>,
    partition_id: Option<PartitionId>,
    replica_index: ReplicaIndex,
    service_name: Option<ServiceName>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self) -> Option<&NodeEngine> {
        self.node.as_ref()
    }

    pub fn call_id(&self) -> i64 {
        self.call_id
    }

    pub fn caller(&self) -> Option<&CallerAddress> {
        self.caller.as_ref()
    }

    pub fn partition_id(&self) -> Option<PartitionId> {
        self.partition_id
    }

    pub fn replica_index(&self) -> ReplicaIndex {
        self.replica_index
    }

    pub fn service_name(&self) -> Option<&ServiceName> {
        self.service_name.as_ref()
    }

    pub fn response_handler(&self) -> Option<&Arc<dyn ResponseHandler>> {
        self.response_handler.as_ref()
    }

    pub fn set_node(&mut self, node: NodeEngine) -> &mut Self {
        self.node = Some(node);
        self
    }

    pub fn set_call_id(&mut self, call_id: i64) -> &mut Self {
        self.call_id = call_id;
        self
    }

    pub fn set_caller(&mut self, caller: Option<CallerAddress>) -> &mut Self {
        self.caller = caller;
        self
    }

    pub fn set_partition_id(&mut self, partition_id: PartitionId) -> &mut Self {
        self.partition_id = Some(partition_id);
        self
    }

    pub fn set_replica_index(&mut self, replica_index: ReplicaIndex) -> &mut Self {
        self.replica_index = replica_index;
        self
    }

    pub fn set_service_name(&mut self, service_name: Option<ServiceName>) -> &mut Self {
        self.service_name = service_name;
        self
    }

    pub fn set_response_handler(&mut self, handler: Arc<dyn ResponseHandler>) -> &mut Self {
        self.response_handler = Some(handler);
        self
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("has_node", &self.node.is_some())
            .field("call_id", &self.call_id)
            .field("caller", &self.caller)
            .field("partition_id", &self.partition_id)
            .field("replica_index", &self.replica_index)
            .field("service_name", &self.service_name)
            .field("has_response_handler", &self.response_handler.is_some())
            .finish()
    }
}
