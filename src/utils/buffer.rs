use byteorder::{BigEndian, ByteOrder};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};

/// Byte cursor used by the header codecs and the AMF0 codec.
///
/// All multi-byte accessors are big-endian; the chunk message header is
/// 3-byte-field heavy, hence the u24 pair.
pub struct ByteBuffer {
    buffer: Vec<u8>,
    cursor: usize,
}

impl ByteBuffer {
    /// Create a ByteBuffer over existing bytes, cursor at the start
    pub fn new(data: Vec<u8>) -> Self {
        ByteBuffer {
            buffer: data,
            cursor: 0,
        }
    }

    /// Create an empty ByteBuffer for writing
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuffer {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Bytes left between the cursor and the end
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Check the buffer holds at least n more bytes
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn take(&mut self, len: usize) -> IoResult<&[u8]> {
        if !self.has_remaining(len) {
            return Err(IoError::new(ErrorKind::UnexpectedEof, "Not enough bytes"));
        }
        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Read len bytes, advancing the cursor
    pub fn read_bytes(&mut self, len: usize) -> IoResult<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    /// Append raw bytes
    pub fn write_bytes(&mut self, data: &[u8]) -> IoResult<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Read u8
    pub fn read_u8(&mut self) -> IoResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Write u8
    pub fn write_u8(&mut self, value: u8) -> IoResult<()> {
        self.buffer.push(value);
        Ok(())
    }

    /// Read u16 (big endian)
    pub fn read_u16_be(&mut self) -> IoResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Write u16 (big endian)
    pub fn write_u16_be(&mut self, value: u16) -> IoResult<()> {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.write_bytes(&bytes)
    }

    /// Read i16 (big endian)
    pub fn read_i16_be(&mut self) -> IoResult<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    /// Write i16 (big endian)
    pub fn write_i16_be(&mut self, value: i16) -> IoResult<()> {
        let mut bytes = [0u8; 2];
        BigEndian::write_i16(&mut bytes, value);
        self.write_bytes(&bytes)
    }

    /// Read a 3-byte big-endian unsigned integer into the low 24 bits
    pub fn read_u24_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    /// Write the low 24 bits of value as 3 big-endian bytes
    pub fn write_u24_be(&mut self, value: u32) -> IoResult<()> {
        let mut bytes = [0u8; 3];
        BigEndian::write_u24(&mut bytes, value & 0xFF_FFFF);
        self.write_bytes(&bytes)
    }

    /// Read u32 (big endian)
    pub fn read_u32_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Write u32 (big endian)
    pub fn write_u32_be(&mut self, value: u32) -> IoResult<()> {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, value);
        self.write_bytes(&bytes)
    }

    /// Read u32 (little endian) - message stream ids only
    pub fn read_u32_le(&mut self) -> IoResult<u32> {
        let slice = self.take(4)?;
        Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    /// Write u32 (little endian) - message stream ids only
    pub fn write_u32_le(&mut self, value: u32) -> IoResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Read f64 (big endian IEEE-754)
    pub fn read_f64_be(&mut self) -> IoResult<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    /// Write f64 (big endian IEEE-754)
    pub fn write_f64_be(&mut self, value: f64) -> IoResult<()> {
        let mut bytes = [0u8; 8];
        BigEndian::write_f64(&mut bytes, value);
        self.write_bytes(&bytes)
    }

    /// Get all bytes as Vec
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// Get slice of the underlying buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get length of buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
