//! Self-describing serialized operation payload.

use bytes::Bytes;

use super::error::WireResult;
use super::io::{ObjectDataInput, ObjectDataOutput};

/// A serialized operation: the factory type id plus the operation's own bytes.
///
/// Framing is `type_id:i32 | len:i32 | payload`, so a `Data` can be embedded
/// inside a larger payload and read back without outside length information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    type_id: i32,
    payload: Bytes,
}

impl Data {
    pub fn new(type_id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            payload: payload.into(),
        }
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn write_data(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        out.write_i32(self.type_id);
        out.write_bytes(&self.payload)
    }

    pub fn read_data(input: &mut ObjectDataInput) -> WireResult<Self> {
        let type_id = input.read_i32()?;
        let payload = input.read_bytes()?;
        Ok(Self { type_id, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_layout() {
        let data = Data::new(1, vec![0xaau8, 0xbb]);
        let mut out = ObjectDataOutput::new();
        data.write_data(&mut out).unwrap();
        assert_eq!(out.into_vec(), vec![0, 0, 0, 1, 0, 0, 0, 2, 0xaa, 0xbb]);
    }

    #[test]
    fn test_data_is_self_framing() {
        let first = Data::new(3, vec![1u8, 2, 3]);
        let second = Data::new(4, Vec::<u8>::new());

        let mut out = ObjectDataOutput::new();
        first.write_data(&mut out).unwrap();
        second.write_data(&mut out).unwrap();

        let mut input = ObjectDataInput::new(out.freeze());
        assert_eq!(Data::read_data(&mut input).unwrap(), first);
        assert_eq!(Data::read_data(&mut input).unwrap(), second);
        input.finish().unwrap();
    }
}
