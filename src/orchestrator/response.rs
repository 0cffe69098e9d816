//! Partition id → result mapping and its compact wire encoding.
//!
//! Layout: `count:i32`, then `count` times `partition_id:i32 | value`, with
//! each value in the generic value encoding. Entries keep the order they were
//! inserted (dispatch order) or read (wire order), so re-encoding a decoded
//! set reproduces the input bytes.

use std::collections::HashMap;

use crate::types::PartitionId;
use crate::wire::{
    ObjectDataInput, ObjectDataOutput, ResultValue, WireError, WireResult,
};

/// Smallest possible entry: a partition id plus a one-byte tagged value.
const MIN_ENTRY_BYTES: usize = 5;

/// Insertion-ordered map from partition to result.
///
/// Entries live in a `Vec` in insertion order; `index` maps each partition to
/// its slot so lookups and inserts stay constant time.
#[derive(Debug, Clone, Default)]
pub struct PartitionResults {
    entries: Vec<(PartitionId, ResultValue)>,
    index: HashMap<PartitionId, usize>,
}

impl PartitionResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a result. An existing entry for the partition is replaced in
    /// place and its old value returned.
    pub fn insert(&mut self, partition: PartitionId, value: ResultValue) -> Option<ResultValue> {
        match self.index.get(&partition) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(partition, self.entries.len());
                self.entries.push((partition, value));
                None
            }
        }
    }

    pub fn get(&self, partition: PartitionId) -> Option<&ResultValue> {
        self.index.get(&partition).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, partition: PartitionId) -> bool {
        self.index.contains_key(&partition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartitionId, &ResultValue)> {
        self.entries.iter().map(|(p, v)| (*p, v))
    }

    pub fn partition_ids(&self) -> impl Iterator<Item = PartitionId> {
        self.entries.iter().map(|(p, _)| *p)
    }
}

// The index is derived from `entries`, so equality only looks at the entries.
impl PartialEq for PartitionResults {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<(PartitionId, ResultValue)> for PartitionResults {
    fn from_iter<I: IntoIterator<Item = (PartitionId, ResultValue)>>(iter: I) -> Self {
        let mut results = Self::new();
        for (partition, value) in iter {
            results.insert(partition, value);
        }
        results
    }
}

impl IntoIterator for PartitionResults {
    type Item = (PartitionId, ResultValue);
    type IntoIter = std::vec::IntoIter<(PartitionId, ResultValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Aggregate response of a scatter/gather run. Immutable once built.
///
/// A partition missing from the set never produced a result; a short set is
/// a partial failure, not a smaller request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionResponse {
    results: PartitionResults,
}

impl PartitionResponse {
    /// Wrap a mapping; an absent mapping becomes the empty set.
    pub fn new(results: Option<PartitionResults>) -> Self {
        Self {
            results: results.unwrap_or_default(),
        }
    }

    pub fn as_map(&self) -> &PartitionResults {
        &self.results
    }

    pub fn into_results(self) -> PartitionResults {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn write_data(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        let len = self.results.len();
        out.write_i32(i32::try_from(len).map_err(|_| WireError::TooLarge(len))?);
        for (partition, value) in self.results.iter() {
            out.write_i32(partition.get());
            value.write_to(out)?;
        }
        Ok(())
    }

    pub fn read_data(input: &mut ObjectDataInput) -> WireResult<Self> {
        let len = input.read_len()?;
        if len == 0 {
            return Ok(Self::default());
        }

        let mut results =
            PartitionResults::with_capacity(len.min(input.remaining() / MIN_ENTRY_BYTES));
        for _ in 0..len {
            let partition = PartitionId::new(input.read_i32()?);
            let value = ResultValue::read_from(input)?;
            if results.insert(partition, value).is_some() {
                return Err(WireError::DuplicatePartition(partition.get()));
            }
        }
        Ok(Self { results })
    }

    pub fn to_bytes(&self) -> WireResult<Vec<u8>> {
        let mut out = ObjectDataOutput::with_capacity(4 + self.len() * 8);
        self.write_data(&mut out)?;
        Ok(out.into_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut input = ObjectDataInput::new(bytes.to_vec());
        let response = Self::read_data(&mut input)?;
        input.finish()?;
        Ok(response)
    }
}

impl From<PartitionResults> for PartitionResponse {
    fn from(results: PartitionResults) -> Self {
        Self { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(pairs: &[(i32, ResultValue)]) -> PartitionResults {
        pairs
            .iter()
            .map(|(p, v)| (PartitionId::new(*p), v.clone()))
            .collect()
    }

    #[test]
    fn test_absent_mapping_is_empty() {
        let response = PartitionResponse::new(None);
        assert!(response.is_empty());
        assert_eq!(response.to_bytes().unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_decodes_to_empty_set() {
        let response = PartitionResponse::from_bytes(&[0, 0, 0, 0]).unwrap();
        assert_eq!(response, PartitionResponse::default());
    }

    #[test]
    fn test_doubled_partitions_layout() {
        let response = PartitionResponse::from(results(&[
            (2, ResultValue::Int(4)),
            (5, ResultValue::Int(10)),
            (7, ResultValue::Int(14)),
        ]));

        assert_eq!(
            response.to_bytes().unwrap(),
            vec![
                0, 0, 0, 3, // count
                0, 0, 0, 2, 2, 0, 0, 0, 4, // 2 -> Int(4)
                0, 0, 0, 5, 2, 0, 0, 0, 10, // 5 -> Int(10)
                0, 0, 0, 7, 2, 0, 0, 0, 14, // 7 -> Int(14)
            ]
        );
    }

    #[test]
    fn test_reencoding_preserves_wire_order() {
        // Keys deliberately out of numeric order.
        let original = PartitionResponse::from(results(&[
            (9, ResultValue::Bytes(Vec::new())),
            (1, ResultValue::Bytes(vec![7; 64])),
            (4, ResultValue::Text(String::new())),
        ]));
        let bytes = original.to_bytes().unwrap();

        let decoded = PartitionResponse::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
        assert_eq!(
            decoded.as_map().partition_ids().collect::<Vec<_>>(),
            vec![PartitionId::new(9), PartitionId::new(1), PartitionId::new(4)]
        );
    }

    #[test]
    fn test_count_without_entries_fails() {
        let err = PartitionResponse::from_bytes(&[0, 0, 0, 2, 0, 0, 0, 1, 0]).unwrap_err();
        assert!(matches!(err, WireError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_negative_count_fails() {
        let err = PartitionResponse::from_bytes(&[0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert_eq!(err, WireError::InvalidLength(-1));
    }

    #[test]
    fn test_duplicate_entry_fails() {
        let bytes = [0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0];
        assert_eq!(
            PartitionResponse::from_bytes(&bytes).unwrap_err(),
            WireError::DuplicatePartition(1)
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = results(&[(3, ResultValue::Int(1)), (4, ResultValue::Int(2))]);
        assert_eq!(
            map.insert(PartitionId::new(3), ResultValue::Int(9)),
            Some(ResultValue::Int(1))
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(PartitionId::new(3)), Some(&ResultValue::Int(9)));
        assert_eq!(map.partition_ids().next(), Some(PartitionId::new(3)));
    }

    #[test]
    fn test_large_result_set_decodes() {
        let count = 200_000;
        let mut out = ObjectDataOutput::new();
        out.write_i32(count);
        for partition in 0..count {
            out.write_i32(partition);
            ResultValue::Null.write_to(&mut out).unwrap();
        }
        let bytes = out.into_vec();

        let started = std::time::Instant::now();
        let decoded = PartitionResponse::from_bytes(&bytes).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        assert_eq!(decoded.len(), count as usize);
        assert_eq!(
            decoded.as_map().get(PartitionId::new(count - 1)),
            Some(&ResultValue::Null)
        );
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }
}
