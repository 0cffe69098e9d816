//! Common envelope written in front of every operation's own payload.

use crate::types::{CallerAddress, PartitionId, ReplicaIndex, ServiceName};
use crate::wire::{ObjectDataInput, ObjectDataOutput, WireResult};

use super::OperationContext;

const UNASSIGNED_PARTITION: i32 = -1;

/// Fields shared by all operations on the wire.
///
/// Layout: `call_id:i64 | partition_id:i32 (-1 = unassigned) | replica_index:i32 |
/// service_name:string? | caller:string?`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationHeader {
    pub call_id: i64,
    pub partition_id: Option<PartitionId>,
    pub replica_index: ReplicaIndex,
    pub service_name: Option<ServiceName>,
    pub caller: Option<CallerAddress>,
}

impl OperationHeader {
    pub fn from_context(ctx: &OperationContext) -> Self {
        Self {
            call_id: ctx.call_id(),
            partition_id: ctx.partition_id(),
            replica_index: ctx.replica_index(),
            service_name: ctx.service_name().cloned(),
            caller: ctx.caller().cloned(),
        }
    }

    /// Copy the header fields onto a context.
    pub fn apply_to(self, ctx: &mut OperationContext) {
        ctx.set_call_id(self.call_id)
            .set_replica_index(self.replica_index)
            .set_service_name(self.service_name)
            .set_caller(self.caller);
        if let Some(partition_id) = self.partition_id {
            ctx.set_partition_id(partition_id);
        }
    }

    pub fn write_to(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        out.write_i64(self.call_id);
        out.write_i32(self.partition_id.map_or(UNASSIGNED_PARTITION, PartitionId::get));
        out.write_i32(self.replica_index.get());
        out.write_string(self.service_name.as_ref().map(|s| s.as_str()))?;
        out.write_string(self.caller.as_ref().map(|c| c.as_str()))
    }

    pub fn read_from(input: &mut ObjectDataInput) -> WireResult<Self> {
        let call_id = input.read_i64()?;
        let partition_id = match input.read_i32()? {
            UNASSIGNED_PARTITION => None,
            raw => Some(PartitionId::new(raw)),
        };
        let replica_index = ReplicaIndex::new(input.read_i32()?);
        let service_name = input.read_string()?.map(ServiceName::new);
        let caller = input.read_string()?.map(CallerAddress::new);
        Ok(Self {
            call_id,
            partition_id,
            replica_index,
            service_name,
            caller,
        })
    }
}
