use crate::protocol::{DEFAULT_CHUNK_SIZE, MAX_WIRE_TIMESTAMP, RtmpHeader, RtmpMessage};
use crate::{ByteBuffer, Error, Result};
use std::collections::HashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Frames outbound messages into chunks, compressing headers against the
/// previous header sent on each chunk stream. One instance per connection.
pub struct ChunkWriter {
    /// Previous header written per chunk stream
    prev_headers: HashMap<u32, RtmpHeader>,

    /// Outgoing chunk size
    chunk_size_out: usize,
}

impl ChunkWriter {
    pub fn new() -> Self {
        ChunkWriter {
            prev_headers: HashMap::new(),
            chunk_size_out: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_out = size;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_out
    }

    /// Chunk, frame and write one message
    pub async fn write_message<W: AsyncWrite + Unpin>(
        &mut self,
        message: &RtmpMessage,
        writer: &mut W,
    ) -> Result<()> {
        let chunks = self.create_chunks(message)?;

        writer
            .write_all(&chunks)
            .await
            .map_err(|e| Error::connection(format!("Failed to write chunks: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::connection(format!("Failed to flush chunks: {}", e)))?;

        Ok(())
    }

    /// Serialize one message into its wire chunks: a leading header chosen
    /// by what the previous header on this chunk stream already carries,
    /// then fmt 3 continuations every chunk_size_out bytes.
    pub fn create_chunks(&mut self, message: &RtmpMessage) -> Result<Vec<u8>> {
        let cs_id = message.header.chunk_stream_id;
        let (fmt, header_bytes, delta) = self.select_header(message)?;

        let payload = &message.payload;
        let mut result = Vec::with_capacity(header_bytes.len() + payload.len() + 8);

        result.extend_from_slice(&encode_basic_header(fmt, cs_id));
        result.extend_from_slice(&header_bytes);

        let first_slice = payload.len().min(self.chunk_size_out);
        result.extend_from_slice(&payload[..first_slice]);

        let mut offset = first_slice;
        while offset < payload.len() {
            result.extend_from_slice(&encode_basic_header(3, cs_id));
            let end = (offset + self.chunk_size_out).min(payload.len());
            result.extend_from_slice(&payload[offset..end]);
            offset = end;
        }

        self.prev_headers.insert(
            cs_id,
            RtmpHeader {
                timestamp_delta: delta,
                ..message.header
            },
        );
        Ok(result)
    }

    /// Pick the cheapest legal header format against the previous header,
    /// returning the delta actually put on the wire (a fmt 3 receiver
    /// re-applies the previous delta, so fmt 3 is only legal when the delta
    /// repeats).
    fn select_header(&self, message: &RtmpMessage) -> Result<(u8, Vec<u8>, u32)> {
        let header = &message.header;

        if let Some(prev) = self.prev_headers.get(&header.chunk_stream_id) {
            // Delta formats only apply to monotonic timestamps on the same
            // message stream
            if header.message_stream_id == prev.message_stream_id
                && header.timestamp >= prev.timestamp
            {
                let delta = header.timestamp - prev.timestamp;

                if header.message_type_id == prev.message_type_id
                    && header.message_length == prev.message_length
                {
                    if delta == prev.timestamp_delta {
                        return Ok((3, Vec::new(), delta));
                    }
                    return Ok((2, encode_type2_header(delta)?, delta));
                }

                return Ok((1, encode_type1_header(delta, header)?, delta));
            }
        }

        Ok((0, encode_type0_header(header)?, 0))
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Basic header: fmt in the top 2 bits, then the 1/2/3-byte id form
fn encode_basic_header(fmt: u8, cs_id: u32) -> Vec<u8> {
    let mut result = Vec::with_capacity(3);

    if cs_id <= 63 {
        result.push((fmt << 6) | (cs_id as u8));
    } else if cs_id <= 319 {
        result.push(fmt << 6);
        result.push((cs_id - 64) as u8);
    } else {
        result.push((fmt << 6) | 1);
        let id = (cs_id - 64) as u16;
        result.extend_from_slice(&id.to_be_bytes());
    }

    result
}

/// 24-bit field plus the 4-byte extension once the value no longer fits
fn write_timestamp_field(buffer: &mut ByteBuffer, value: u32) -> Result<()> {
    if value >= MAX_WIRE_TIMESTAMP {
        buffer.write_u24_be(MAX_WIRE_TIMESTAMP)?;
    } else {
        buffer.write_u24_be(value)?;
    }
    Ok(())
}

fn write_extension_if_needed(buffer: &mut ByteBuffer, value: u32) -> Result<()> {
    if value >= MAX_WIRE_TIMESTAMP {
        buffer.write_u32_be(value)?;
    }
    Ok(())
}

fn encode_type0_header(header: &RtmpHeader) -> Result<Vec<u8>> {
    let mut buffer = ByteBuffer::with_capacity(15);

    write_timestamp_field(&mut buffer, header.timestamp)?;
    buffer.write_u24_be(header.message_length)?;
    buffer.write_u8(header.message_type_id)?;
    buffer.write_u32_le(header.message_stream_id)?;
    write_extension_if_needed(&mut buffer, header.timestamp)?;

    Ok(buffer.to_vec())
}

fn encode_type1_header(delta: u32, header: &RtmpHeader) -> Result<Vec<u8>> {
    let mut buffer = ByteBuffer::with_capacity(11);

    write_timestamp_field(&mut buffer, delta)?;
    buffer.write_u24_be(header.message_length)?;
    buffer.write_u8(header.message_type_id)?;
    write_extension_if_needed(&mut buffer, delta)?;

    Ok(buffer.to_vec())
}

fn encode_type2_header(delta: u32) -> Result<Vec<u8>> {
    let mut buffer = ByteBuffer::with_capacity(7);

    write_timestamp_field(&mut buffer, delta)?;
    write_extension_if_needed(&mut buffer, delta)?;

    Ok(buffer.to_vec())
}
