//! Generic value codec for type-erased operation results.
//!
//! Every value is written as one tag byte followed by the variant payload.
//! Partition result sets embed values back to back with no per-entry framing,
//! so a value must always know its own length.

use std::fmt;

use super::error::{WireError, WireResult};
use super::io::{ObjectDataInput, ObjectDataOutput};

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_LONG: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_TEXT: u8 = 5;
const TAG_BYTES: u8 = 6;
const TAG_ERROR: u8 = 7;

/// Result produced by one partition-local operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// The operation failed; carries the failure message.
    Error(String),
}

impl ResultValue {
    /// Returns `true` if this value reports a failed operation.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Write this value with its tag.
    pub fn write_to(&self, out: &mut ObjectDataOutput) -> WireResult<()> {
        match self {
            Self::Null => out.write_u8(TAG_NULL),
            Self::Bool(v) => {
                out.write_u8(TAG_BOOL);
                out.write_bool(*v);
            }
            Self::Int(v) => {
                out.write_u8(TAG_INT);
                out.write_i32(*v);
            }
            Self::Long(v) => {
                out.write_u8(TAG_LONG);
                out.write_i64(*v);
            }
            Self::Double(v) => {
                out.write_u8(TAG_DOUBLE);
                out.write_f64(*v);
            }
            Self::Text(v) => {
                out.write_u8(TAG_TEXT);
                out.write_string(Some(v))?;
            }
            Self::Bytes(v) => {
                out.write_u8(TAG_BYTES);
                out.write_bytes(v)?;
            }
            Self::Error(msg) => {
                out.write_u8(TAG_ERROR);
                out.write_string(Some(msg))?;
            }
        }
        Ok(())
    }

    /// Read one tagged value.
    pub fn read_from(input: &mut ObjectDataInput) -> WireResult<Self> {
        let value = match input.read_u8()? {
            TAG_NULL => Self::Null,
            TAG_BOOL => Self::Bool(input.read_bool()?),
            TAG_INT => Self::Int(input.read_i32()?),
            TAG_LONG => Self::Long(input.read_i64()?),
            TAG_DOUBLE => Self::Double(input.read_f64()?),
            TAG_TEXT => Self::Text(read_present_string(input)?),
            TAG_BYTES => Self::Bytes(input.read_bytes()?.to_vec()),
            TAG_ERROR => Self::Error(read_present_string(input)?),
            tag => return Err(WireError::UnknownValueTag(tag)),
        };
        Ok(value)
    }
}

/// Values always carry a string; the `-1` absent marker is never written for them.
fn read_present_string(input: &mut ObjectDataInput) -> WireResult<String> {
    input.read_string()?.ok_or(WireError::InvalidLength(-1))
}

impl From<i32> for ResultValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<bool> for ResultValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for ResultValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &ResultValue) -> Vec<u8> {
        let mut out = ObjectDataOutput::new();
        value.write_to(&mut out).unwrap();
        out.into_vec()
    }

    #[test]
    fn test_int_layout() {
        assert_eq!(encode(&ResultValue::Int(14)), vec![TAG_INT, 0, 0, 0, 14]);
    }

    #[test]
    fn test_zero_length_bytes_layout() {
        assert_eq!(encode(&ResultValue::Bytes(Vec::new())), vec![TAG_BYTES, 0, 0, 0, 0]);
    }

    #[test]
    fn test_values_decode_back_to_back() {
        let values = vec![
            ResultValue::Null,
            ResultValue::Bool(true),
            ResultValue::Long(i64::MIN),
            ResultValue::Double(1.5),
            ResultValue::Text("héllo".into()),
            ResultValue::Bytes(vec![0; 300]),
            ResultValue::Error("boom".into()),
        ];

        let mut out = ObjectDataOutput::new();
        for value in &values {
            value.write_to(&mut out).unwrap();
        }

        let mut input = ObjectDataInput::new(out.freeze());
        for expected in &values {
            assert_eq!(&ResultValue::read_from(&mut input).unwrap(), expected);
        }
        input.finish().unwrap();
    }

    #[test]
    fn test_unknown_tag() {
        let mut input = ObjectDataInput::new(vec![0x7fu8]);
        assert_eq!(
            ResultValue::read_from(&mut input),
            Err(WireError::UnknownValueTag(0x7f))
        );
    }

    #[test]
    fn test_is_error() {
        assert!(ResultValue::Error("x".into()).is_error());
        assert!(!ResultValue::Null.is_error());
        assert_eq!(ResultValue::from(4).as_int(), Some(4));
    }

    #[test]
    fn test_absent_string_in_value_is_rejected() {
        for tag in [TAG_TEXT, TAG_ERROR] {
            let mut input = ObjectDataInput::new(vec![tag, 0xff, 0xff, 0xff, 0xff]);
            assert_eq!(
                ResultValue::read_from(&mut input),
                Err(WireError::InvalidLength(-1))
            );
        }
    }

    #[test]
    fn test_empty_text_keeps_zero_length() {
        let bytes = vec![TAG_TEXT, 0, 0, 0, 0];
        let mut input = ObjectDataInput::new(bytes.clone());
        let value = ResultValue::read_from(&mut input).unwrap();
        assert_eq!(value, ResultValue::Text(String::new()));
        assert_eq!(encode(&value), bytes);
    }
}
