//! Registered-type lookup that turns serialized templates into live operations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::wire::{Data, ObjectDataInput, ObjectDataOutput};

use super::multiply::MultiplyPartitionOperation;
use super::{Operation, OperationError, OperationResult};

/// Builds an empty operation instance ready for `read_internal`.
pub type OperationConstructor = Arc<dyn Fn() -> Box<dyn Operation> + Send + Sync>;

/// Registry of operation constructors keyed by factory type id.
#[derive(Clone)]
pub struct OperationRegistry {
    constructors: HashMap<i32, OperationConstructor>,
}

impl OperationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Create a registry with the built-in operations already registered.
    pub fn with_builtins() -> Self {
        Self::new().register_fn(MultiplyPartitionOperation::FACTORY_ID, || {
            Box::new(MultiplyPartitionOperation::default())
        })
    }

    /// Register a constructor. A later registration for the same id replaces the earlier one.
    pub fn register(mut self, type_id: i32, constructor: OperationConstructor) -> Self {
        if self.constructors.insert(type_id, constructor).is_some() {
            tracing::warn!(type_id, "Replacing operation constructor");
        }
        self
    }

    /// Register a constructor from a plain closure.
    pub fn register_fn<F>(self, type_id: i32, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Operation> + Send + Sync + 'static,
    {
        self.register(type_id, Arc::new(constructor))
    }

    /// Decode a template into a brand-new operation instance.
    ///
    /// Every call constructs a separate instance, so decoding the same
    /// template repeatedly never shares state between the results.
    pub fn decode(&self, data: &Data) -> OperationResult<Box<dyn Operation>> {
        let constructor = self
            .constructors
            .get(&data.type_id())
            .ok_or(OperationError::UnknownType(data.type_id()))?;

        let mut op = constructor();
        let mut input = ObjectDataInput::new(data.payload().clone());
        op.read_internal(&mut input)?;
        input.finish()?;
        Ok(op)
    }

    /// Serialize an operation into a template that `decode` can read back.
    pub fn encode(&self, op: &dyn Operation) -> OperationResult<Data> {
        let type_id = op.factory_id();
        if !self.contains(type_id) {
            return Err(OperationError::UnknownType(type_id));
        }

        let mut out = ObjectDataOutput::new();
        op.write_internal(&mut out)?;
        Ok(Data::new(type_id, out.freeze()))
    }

    /// Check if a constructor with the given id is registered.
    pub fn contains(&self, type_id: i32) -> bool {
        self.constructors.contains_key(&type_id)
    }

    /// List all registered type ids.
    pub fn type_ids(&self) -> Vec<i32> {
        self.constructors.keys().copied().collect()
    }

    /// Return the number of registered constructors.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Return `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = self.type_ids();
        ids.sort_unstable();
        f.debug_struct("OperationRegistry")
            .field("type_ids", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartitionId;
    use crate::wire::WireError;

    #[test]
    fn test_builtins_registered() {
        let registry = OperationRegistry::with_builtins();
        assert!(registry.contains(MultiplyPartitionOperation::FACTORY_ID));
        assert_eq!(registry.len(), 1);
        assert!(!OperationRegistry::new().contains(MultiplyPartitionOperation::FACTORY_ID));
    }

    #[test]
    fn test_encode_decode_template() {
        let registry = OperationRegistry::with_builtins();
        let template = registry
            .encode(&MultiplyPartitionOperation::new(3))
            .unwrap();
        assert_eq!(template.type_id(), MultiplyPartitionOperation::FACTORY_ID);

        let op = registry.decode(&template).unwrap();
        assert_eq!(op.factory_id(), MultiplyPartitionOperation::FACTORY_ID);
        assert_eq!(registry.encode(op.as_ref()).unwrap(), template);
    }

    #[test]
    fn test_decoded_instances_are_independent() {
        let registry = OperationRegistry::with_builtins();
        let template = registry.encode(&MultiplyPartitionOperation::new(2)).unwrap();

        let mut first = registry.decode(&template).unwrap();
        let second = registry.decode(&template).unwrap();

        first.context_mut().set_partition_id(PartitionId::new(8));
        assert_eq!(first.context().partition_id(), Some(PartitionId::new(8)));
        assert_eq!(second.context().partition_id(), None);
    }

    #[test]
    fn test_unknown_type_id() {
        let registry = OperationRegistry::with_builtins();
        let err = registry.decode(&Data::new(999, Vec::<u8>::new())).err();
        assert_eq!(err, Some(OperationError::UnknownType(999)));
    }

    #[test]
    fn test_template_with_trailing_bytes_is_rejected() {
        let registry = OperationRegistry::with_builtins();
        let data = Data::new(
            MultiplyPartitionOperation::FACTORY_ID,
            vec![0u8, 0, 0, 2, 0xee],
        );
        let err = registry.decode(&data).err();
        assert_eq!(err, Some(OperationError::Wire(WireError::TrailingBytes(1))));
    }
}
