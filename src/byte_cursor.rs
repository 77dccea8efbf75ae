//! Bounds-checked, read-only access to an in-memory container.

use crate::error::DecodeError;

/// Offset-relative view over a byte buffer.
///
/// Every accessor fails with [`DecodeError::OutOfRange`] when the requested
/// field does not fit entirely inside the buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    source: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.source
    }

    pub fn at(&self, offset: usize) -> Result<u8, DecodeError> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn u16be(&self, offset: usize) -> Result<u16, DecodeError> {
        let bytes = self.slice(offset, 2)?;
        Ok(((bytes[0] as u16) << 8) | bytes[1] as u16)
    }

    pub fn u32be(&self, offset: usize) -> Result<u32, DecodeError> {
        let bytes = self.slice(offset, 4)?;
        Ok(((bytes[0] as u32) << 24)
            | ((bytes[1] as u32) << 16)
            | ((bytes[2] as u32) << 8)
            | bytes[3] as u32)
    }

    /// Little-endian 32-bit field, least significant byte first.
    pub fn u32le(&self, offset: usize) -> Result<u32, DecodeError> {
        let bytes = self.slice(offset, 4)?;
        Ok(((bytes[3] as u32) << 24)
            | ((bytes[2] as u32) << 16)
            | ((bytes[1] as u32) << 8)
            | bytes[0] as u32)
    }

    pub fn i32le(&self, offset: usize) -> Result<i32, DecodeError> {
        Ok(self.u32le(offset)? as i32)
    }

    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset.checked_add(len).ok_or(DecodeError::OutOfRange {
            offset,
            width: len,
            length: self.source.len(),
        })?;
        self.source.get(offset..end).ok_or(DecodeError::OutOfRange {
            offset,
            width: len,
            length: self.source.len(),
        })
    }
}
