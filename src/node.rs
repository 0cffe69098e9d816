//! The node engine: everything an operation needs from the member it runs on.

use std::fmt;
use std::sync::Arc;

use crate::config::NodeConfig;
use crate::execution::{ExecutionService, Executor, OperationService};
use crate::operation::{Operation, OperationRegistry, OperationResult};
use crate::orchestrator::{GatherResult, PartitionIteratingOperation, PartitionResponse};
use crate::types::{CallerAddress, PartitionId};
use crate::wire::Data;

struct NodeInner {
    config: NodeConfig,
    registry: OperationRegistry,
    executor: Arc<dyn Executor>,
    operations: OperationService,
}

/// Shared handle to one grid member's execution substrate. Cheap to clone.
#[derive(Clone)]
pub struct NodeEngine {
    inner: Arc<NodeInner>,
}

impl NodeEngine {
    /// Create a node and start its workers. Must be called inside a tokio runtime.
    pub fn new(config: NodeConfig, registry: OperationRegistry) -> Self {
        let execution = ExecutionService::new(config.worker_count, config.queue_capacity);
        tracing::info!(
            address = %config.member_address,
            workers = execution.worker_count(),
            operations = registry.len(),
            "Node engine started"
        );
        Self::with_executor(config, registry, Arc::new(execution))
    }

    /// Create a node that submits work to `executor` instead of its own worker pool.
    pub fn with_executor(
        config: NodeConfig,
        registry: OperationRegistry,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                config,
                registry,
                executor,
                operations: OperationService::new(),
            }),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    pub fn address(&self) -> &CallerAddress {
        &self.inner.config.member_address
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.inner.registry
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.inner.executor
    }

    pub fn operation_service(&self) -> &OperationService {
        &self.inner.operations
    }

    /// Decode a template into a fresh operation.
    pub fn to_object(&self, data: &Data) -> OperationResult<Box<dyn Operation>> {
        self.inner.registry.decode(data)
    }

    /// Serialize an operation into a template.
    pub fn to_data(&self, op: &dyn Operation) -> OperationResult<Data> {
        self.inner.registry.encode(op)
    }

    /// Run `template` on every partition in `partitions` and gather the results,
    /// using the configured failure policy and gather timeout. This node is the caller.
    pub async fn invoke_on_partitions(
        &self,
        partitions: Vec<PartitionId>,
        template: Data,
    ) -> GatherResult<PartitionResponse> {
        let mut op = PartitionIteratingOperation::new(partitions, template)?
            .with_failure_policy(self.config().failure_policy)
            .with_gather_timeout(self.config().gather_timeout());
        op.context_mut()
            .set_node(self.clone())
            .set_caller(Some(self.address().clone()));

        op.before_run();
        op.run().await?;
        Ok(op.response())
    }

    /// Stop accepting work and wait for queued operations to finish.
    pub async fn shutdown(&self) {
        self.inner.executor.shutdown().await;
        tracing::info!(address = %self.address(), "Node engine stopped");
    }
}

impl fmt::Debug for NodeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeEngine")
            .field("address", self.address())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::MultiplyPartitionOperation;
    use crate::orchestrator::GatherError;
    use crate::wire::ResultValue;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invoke_on_partitions() {
        let node = NodeEngine::new(NodeConfig::default(), OperationRegistry::with_builtins());
        let template = node.to_data(&MultiplyPartitionOperation::new(3)).unwrap();

        let response = node
            .invoke_on_partitions(vec![PartitionId::new(1), PartitionId::new(4)], template)
            .await
            .unwrap();

        assert_eq!(response.as_map().get(PartitionId::new(1)), Some(&ResultValue::Int(3)));
        assert_eq!(response.as_map().get(PartitionId::new(4)), Some(&ResultValue::Int(12)));
        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_invoke_rejects_duplicates() {
        let node = NodeEngine::new(NodeConfig::default(), OperationRegistry::with_builtins());
        let template = node.to_data(&MultiplyPartitionOperation::new(1)).unwrap();

        let err = node
            .invoke_on_partitions(vec![PartitionId::new(2), PartitionId::new(2)], template)
            .await
            .unwrap_err();
        assert_eq!(err, GatherError::DuplicatePartition(PartitionId::new(2)));
        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_invoke_on_no_partitions() {
        let node = NodeEngine::new(NodeConfig::default(), OperationRegistry::with_builtins());
        let template = node.to_data(&MultiplyPartitionOperation::new(1)).unwrap();

        let response = node.invoke_on_partitions(Vec::new(), template).await.unwrap();
        assert!(response.is_empty());
        node.shutdown().await;
    }
}
