//! Scatter/gather orchestrator: runs one operation template on many partitions
//! and collects the per-partition answers into a single response.
//!
//! Execution has two phases. Every partition's operation is decoded, stamped
//! and submitted before any response is awaited, so partitions run in
//! parallel; submission waits for room when the execution queue is full.
//! Responses are then awaited one channel at a time, in the order the
//! partitions were declared.
//!
//! With no gather timeout configured, a partition whose operation is still
//! running keeps the orchestrator waiting for as long as it runs. An operation
//! that is dropped without answering fails its partition instead.

mod error;
mod response;

pub use error::{GatherError, GatherResult, PartitionFailure};
pub use response::{PartitionResponse, PartitionResults};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::node::NodeEngine;
use crate::operation::{OperationContext, OperationHeader};
use crate::response::{response_channel, ResponseChannel};
use crate::types::PartitionId;
use crate::wire::{Data, ObjectDataInput, ObjectDataOutput, ResultValue, WireError, WireResult};

/// What to do when a single partition fails during scatter/gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure, leave the partition out of the response and carry on.
    #[default]
    Degrade,
    /// Stop at the first failing partition and report it.
    FailFast,
}

/// Broadcasts an operation template to a set of partitions and gathers the results.
///
/// One-shot: build it, call [`before_run`](Self::before_run) and
/// [`run`](Self::run), then read [`response`](Self::response).
#[derive(Debug)]
pub struct PartitionIteratingOperation {
    context: OperationContext,
    partitions: Vec<PartitionId>,
    operation_data: Data,
    failure_policy: FailurePolicy,
    gather_timeout: Option<Duration>,
    results: Option<PartitionResults>,
}

impl PartitionIteratingOperation {
    /// Create an orchestrator for `partitions`. Each partition may appear only once.
    pub fn new(partitions: Vec<PartitionId>, operation_data: Data) -> GatherResult<Self> {
        if let Some(duplicate) = first_duplicate(&partitions) {
            return Err(GatherError::DuplicatePartition(duplicate));
        }

        Ok(Self {
            context: OperationContext::new(),
            partitions,
            operation_data,
            failure_policy: FailurePolicy::default(),
            gather_timeout: None,
            results: None,
        })
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Bound each partition wait. `None` waits forever.
    pub fn with_gather_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.gather_timeout = timeout;
        self
    }

    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut OperationContext {
        &mut self.context
    }

    pub fn partitions(&self) -> &[PartitionId] {
        &self.partitions
    }

    pub fn operation_data(&self) -> &Data {
        &self.operation_data
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn gather_timeout(&self) -> Option<Duration> {
        self.gather_timeout
    }

    /// The caller always waits for this operation's response.
    pub fn returns_response(&self) -> bool {
        true
    }

    /// Allocate an empty result map sized for the partition list.
    pub fn before_run(&mut self) {
        self.results = Some(PartitionResults::with_capacity(self.partitions.len()));
    }

    /// Scatter the template to every partition and gather the answers.
    ///
    /// Under [`FailurePolicy::Degrade`] this only fails when no node is
    /// stamped; failing partitions are logged and left out. Under
    /// [`FailurePolicy::FailFast`] the first failing partition is returned as
    /// [`GatherError::PartitionFailed`]. Results gathered so far stay readable
    /// through [`response`](Self::response) either way.
    pub async fn run(&mut self) -> GatherResult<()> {
        let node = self.context.node().cloned().ok_or(GatherError::MissingNode)?;
        let invocation = Uuid::new_v4();
        let span = tracing::info_span!(
            "partition_iterating",
            %invocation,
            partitions = self.partitions.len()
        );

        let mut results = self
            .results
            .take()
            .unwrap_or_else(|| PartitionResults::with_capacity(self.partitions.len()));
        let outcome = self.scatter_gather(&node, &mut results).instrument(span).await;
        self.results = Some(results);
        outcome
    }

    /// The gathered results. Empty if `run` never produced any.
    pub fn response(&self) -> PartitionResponse {
        PartitionResponse::new(self.results.clone())
    }

    async fn scatter_gather(
        &self,
        node: &NodeEngine,
        results: &mut PartitionResults,
    ) -> GatherResult<()> {
        let mut pending: Vec<ResponseChannel> = Vec::with_capacity(self.partitions.len());

        for &partition in &self.partitions {
            match self.dispatch(node, partition).await {
                Ok(channel) => pending.push(channel),
                Err(cause) => self.partition_failed(partition, cause)?,
            }
        }

        tracing::debug!(dispatched = pending.len(), "Waiting for partition responses");

        for channel in pending {
            let partition = channel.partition();
            let received = match self.gather_timeout {
                Some(timeout) => channel.recv_timeout(timeout).await,
                None => channel.recv().await,
            };

            match received {
                Ok(ResultValue::Error(msg)) if self.failure_policy == FailurePolicy::FailFast => {
                    self.partition_failed(partition, PartitionFailure::Remote(msg))?
                }
                Ok(value) => {
                    results.insert(partition, value);
                }
                Err(e) => self.partition_failed(partition, e.into())?,
            }
        }

        tracing::debug!(
            gathered = results.len(),
            expected = self.partitions.len(),
            "Partition responses gathered"
        );
        Ok(())
    }

    /// Decode a fresh operation, stamp it for `partition` and submit it.
    ///
    /// Waits while the execution queue is full, so every partition is
    /// accepted before the first response is awaited.
    async fn dispatch(
        &self,
        node: &NodeEngine,
        partition: PartitionId,
    ) -> Result<ResponseChannel, PartitionFailure> {
        let mut op = node.to_object(&self.operation_data)?;
        let (sender, channel) = response_channel(partition);

        op.context_mut()
            .set_node(node.clone())
            .set_caller(self.context.caller().cloned())
            .set_partition_id(partition)
            .set_replica_index(self.context.replica_index())
            .set_response_handler(Arc::new(sender))
            .set_service_name(self.context.service_name().cloned());

        let operations = node.operation_service().clone();
        node.executor()
            .execute(Box::pin(async move { operations.run_operation(op).await }))
            .await?;

        tracing::trace!(partition = %partition, "Partition operation submitted");
        Ok(channel)
    }

    fn partition_failed(&self, partition: PartitionId, cause: PartitionFailure) -> GatherResult<()> {
        tracing::error!(
            partition = %partition,
            policy = ?self.failure_policy,
            "Partition operation failed: {}",
            cause
        );

        match self.failure_policy {
            FailurePolicy::Degrade => Ok(()),
            FailurePolicy::FailFast => Err(GatherError::PartitionFailed { partition, cause }),
        }
    }

    /// Write the full envelope: common header, then the partition list and template.
    pub fn write_to(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        OperationHeader::from_context(&self.context).write_to(out)?;
        self.write_internal(out)
    }

    /// Read an envelope written by [`write_to`](Self::write_to).
    pub fn read_from(input: &mut ObjectDataInput) -> WireResult<Self> {
        let header = OperationHeader::read_from(input)?;
        let (partitions, operation_data) = Self::read_internal(input)?;

        let mut context = OperationContext::new();
        header.apply_to(&mut context);
        Ok(Self {
            context,
            partitions,
            operation_data,
            failure_policy: FailurePolicy::default(),
            gather_timeout: None,
            results: None,
        })
    }

    /// Layout: `count:i32 | partition_id:i32 * count | template`.
    pub fn write_internal(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        let count = self.partitions.len();
        out.write_i32(i32::try_from(count).map_err(|_| WireError::TooLarge(count))?);
        for partition in &self.partitions {
            out.write_i32(partition.get());
        }
        self.operation_data.write_data(out)
    }

    fn read_internal(input: &mut ObjectDataInput) -> WireResult<(Vec<PartitionId>, Data)> {
        let count = input.read_len()?;
        let mut partitions = Vec::with_capacity(count.min(input.remaining() / 4));
        for _ in 0..count {
            partitions.push(PartitionId::new(input.read_i32()?));
        }
        if let Some(duplicate) = first_duplicate(&partitions) {
            return Err(WireError::DuplicatePartition(duplicate.get()));
        }

        let operation_data = Data::read_data(input)?;
        Ok((partitions, operation_data))
    }

    pub fn to_bytes(&self) -> WireResult<Vec<u8>> {
        let mut out = ObjectDataOutput::new();
        self.write_to(&mut out)?;
        Ok(out.into_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut input = ObjectDataInput::new(bytes.to_vec());
        let op = Self::read_from(&mut input)?;
        input.finish()?;
        Ok(op)
    }
}

fn first_duplicate(partitions: &[PartitionId]) -> Option<PartitionId> {
    let mut seen = HashSet::with_capacity(partitions.len());
    partitions.iter().copied().find(|p| !seen.insert(*p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::operation::{MultiplyPartitionOperation, OperationRegistry};
    use crate::types::{CallerAddress, ReplicaIndex, ServiceName};

    fn ids(raw: &[i32]) -> Vec<PartitionId> {
        raw.iter().copied().map(PartitionId::new).collect()
    }

    fn doubling_template() -> Data {
        OperationRegistry::with_builtins()
            .encode(&MultiplyPartitionOperation::new(2))
            .unwrap()
    }

    #[test]
    fn test_duplicate_partitions_rejected() {
        let err = PartitionIteratingOperation::new(ids(&[1, 2, 1]), doubling_template()).unwrap_err();
        assert_eq!(err, GatherError::DuplicatePartition(PartitionId::new(1)));
    }

    #[test]
    fn test_response_before_run_is_empty() {
        let op = PartitionIteratingOperation::new(ids(&[1]), doubling_template()).unwrap();
        assert!(op.response().is_empty());
        assert!(op.returns_response());
    }

    #[tokio::test]
    async fn test_run_without_node() {
        let mut op = PartitionIteratingOperation::new(ids(&[1]), doubling_template()).unwrap();
        op.before_run();
        assert_eq!(op.run().await, Err(GatherError::MissingNode));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_doubles_every_partition() {
        let node = NodeEngine::new(NodeConfig::default(), OperationRegistry::with_builtins());
        let mut op = PartitionIteratingOperation::new(ids(&[2, 5, 7]), doubling_template()).unwrap();
        op.context_mut().set_node(node.clone());
        op.before_run();
        op.run().await.unwrap();

        let response = op.response();
        let map = response.as_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(PartitionId::new(2)), Some(&ResultValue::Int(4)));
        assert_eq!(map.get(PartitionId::new(5)), Some(&ResultValue::Int(10)));
        assert_eq!(map.get(PartitionId::new(7)), Some(&ResultValue::Int(14)));
        node.shutdown().await;
    }

    #[test]
    fn test_envelope_layout() {
        let template = Data::new(1, vec![0u8, 0, 0, 2]);
        let op = PartitionIteratingOperation::new(ids(&[3, 1]), template).unwrap();

        let mut out = ObjectDataOutput::new();
        op.write_internal(&mut out).unwrap();
        assert_eq!(
            out.into_vec(),
            vec![
                0, 0, 0, 2, // partition count
                0, 0, 0, 3, 0, 0, 0, 1, // partitions in declared order
                0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 2, // template
            ]
        );
    }

    #[test]
    fn test_envelope_round_trip_keeps_header() {
        let mut op = PartitionIteratingOperation::new(ids(&[4, 0, 9]), doubling_template()).unwrap();
        op.context_mut()
            .set_call_id(1234)
            .set_caller(Some(CallerAddress::new("10.0.0.2:5701")))
            .set_replica_index(ReplicaIndex::new(1))
            .set_service_name(Some(ServiceName::new("grid:map")));

        let bytes = op.to_bytes().unwrap();
        let decoded = PartitionIteratingOperation::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.partitions(), op.partitions());
        assert_eq!(decoded.operation_data(), op.operation_data());
        assert_eq!(decoded.context().call_id(), 1234);
        assert_eq!(decoded.context().replica_index(), ReplicaIndex::new(1));
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_envelope_with_duplicate_partition_rejected() {
        let mut out = ObjectDataOutput::new();
        out.write_i32(2);
        out.write_i32(6);
        out.write_i32(6);
        doubling_template().write_data(&mut out).unwrap();

        let mut input = ObjectDataInput::new(out.freeze());
        assert_eq!(
            PartitionIteratingOperation::read_internal(&mut input).unwrap_err(),
            WireError::DuplicatePartition(6)
        );
    }

    #[test]
    fn test_failure_policy_serde() {
        assert_eq!(
            serde_json::to_string(&FailurePolicy::FailFast).unwrap(),
            "\"fail_fast\""
        );
        let parsed: FailurePolicy = serde_json::from_str("\"degrade\"").unwrap();
        assert_eq!(parsed, FailurePolicy::Degrade);
    }
}
