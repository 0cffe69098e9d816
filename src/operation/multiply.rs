use crate::wire::{ObjectDataInput, ObjectDataOutput, ResultValue, WireResult};

use super::{Operation, OperationContext, OperationError, OperationFuture};

/// Answers with its own partition id multiplied by a fixed factor.
///
/// Useful for checking that every partition ran exactly once and that
/// results come back keyed by the right partition.
#[derive(Debug, Default)]
pub struct MultiplyPartitionOperation {
    context: OperationContext,
    multiplier: i32,
    result: Option<i32>,
}

impl MultiplyPartitionOperation {
    pub const FACTORY_ID: i32 = 1;

    pub fn new(multiplier: i32) -> Self {
        Self {
            multiplier,
            ..Self::default()
        }
    }

    pub fn multiplier(&self) -> i32 {
        self.multiplier
    }
}

impl Operation for MultiplyPartitionOperation {
    fn factory_id(&self) -> i32 {
        Self::FACTORY_ID
    }

    fn context(&self) -> &OperationContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut OperationContext {
        &mut self.context
    }

    fn run(&mut self) -> OperationFuture<'_> {
        Box::pin(async move {
            let partition = self
                .context
                .partition_id()
                .ok_or(OperationError::MissingContext("partition id"))?;
            let product = partition.get().checked_mul(self.multiplier).ok_or_else(|| {
                OperationError::Failed(format!(
                    "{} * {} overflows",
                    partition, self.multiplier
                ))
            })?;
            self.result = Some(product);
            Ok::<_, OperationError>(())
        })
    }

    fn response(&self) -> ResultValue {
        self.result.map_or(ResultValue::Null, ResultValue::Int)
    }

    fn write_internal(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        out.write_i32(self.multiplier);
        Ok(())
    }

    fn read_internal(&mut self, input: &mut ObjectDataInput) -> WireResult<()> {
        self.multiplier = input.read_i32()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartitionId;

    #[tokio::test]
    async fn test_multiplies_partition_id() {
        let mut op = MultiplyPartitionOperation::new(2);
        op.context_mut().set_partition_id(PartitionId::new(7));
        op.run().await.unwrap();
        assert_eq!(op.response(), ResultValue::Int(14));
    }

    #[tokio::test]
    async fn test_requires_partition() {
        let mut op = MultiplyPartitionOperation::new(2);
        assert_eq!(
            op.run().await,
            Err(OperationError::MissingContext("partition id"))
        );
        assert_eq!(op.response(), ResultValue::Null);
    }

    #[tokio::test]
    async fn test_overflow_fails() {
        let mut op = MultiplyPartitionOperation::new(i32::MAX);
        op.context_mut().set_partition_id(PartitionId::new(2));
        assert!(matches!(op.run().await, Err(OperationError::Failed(_))));
    }
}
