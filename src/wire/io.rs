//! Big-endian primitive readers and writers shared by every wire format.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::{WireError, WireResult};

/// Growable output buffer for wire payloads.
#[derive(Debug, Default)]
pub struct ObjectDataOutput {
    buf: BytesMut,
}

impl ObjectDataOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    /// Write a 4-byte length followed by the raw bytes.
    pub fn write_bytes(&mut self, value: &[u8]) -> WireResult<()> {
        let len = i32::try_from(value.len()).map_err(|_| WireError::TooLarge(value.len()))?;
        self.buf.put_i32(len);
        self.buf.put_slice(value);
        Ok(())
    }

    /// Write an optional UTF-8 string. An absent string is encoded as length `-1`.
    pub fn write_string(&mut self, value: Option<&str>) -> WireResult<()> {
        match value {
            Some(s) => self.write_bytes(s.as_bytes()),
            None => {
                self.buf.put_i32(-1);
                Ok(())
            }
        }
    }

    /// Append bytes with no framing of their own.
    pub fn write_raw(&mut self, value: &[u8]) {
        self.buf.put_slice(value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the buffer into an immutable, cheaply clonable `Bytes`.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Cursor over an immutable wire payload. Every read is bounds-checked.
#[derive(Debug, Clone)]
pub struct ObjectDataInput {
    buf: Bytes,
}

impl ObjectDataInput {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    fn ensure(&self, needed: usize) -> WireResult<()> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(WireError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> WireResult<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bool(&mut self) -> WireResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> WireResult<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_i64(&mut self) -> WireResult<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn read_f64(&mut self) -> WireResult<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    /// Read a non-negative 4-byte length or count prefix.
    pub fn read_len(&mut self) -> WireResult<usize> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| WireError::InvalidLength(len))
    }

    pub fn read_bytes(&mut self) -> WireResult<Bytes> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    pub fn read_string(&mut self) -> WireResult<Option<String>> {
        let len = self.read_i32()?;
        if len == -1 {
            return Ok(None);
        }
        let len = usize::try_from(len).map_err(|_| WireError::InvalidLength(len))?;
        let raw = self.read_raw(len)?;
        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|e| WireError::InvalidUtf8(e.to_string()))
    }

    /// Read exactly `len` unframed bytes.
    pub fn read_raw(&mut self, len: usize) -> WireResult<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Fail if anything is left after a complete decode.
    pub fn finish(self) -> WireResult<()> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}
