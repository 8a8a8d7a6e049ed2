use crate::chunk::stream::ChunkStreamState;
use crate::protocol::{DEFAULT_CHUNK_SIZE, MAX_WIRE_TIMESTAMP, RtmpHeader, RtmpMessage};
use crate::{ByteBuffer, Error, Result};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Result of consuming one chunk from the wire
#[derive(Debug)]
pub enum ReadOutcome {
    /// The chunk completed a message
    Complete(RtmpMessage),

    /// The chunk was absorbed; its message is still missing bytes
    Pending,

    /// Clean EOF on a chunk boundary
    Closed,
}

/// Decodes chunk headers and reassembles messages, one instance per
/// connection. Owns the chunk-stream state table the header inheritance
/// reads from.
pub struct ChunkReader {
    /// Chunk stream state by id
    streams: HashMap<u32, ChunkStreamState>,

    /// Incoming chunk size; mutable via the SetChunkSize control message
    chunk_size_in: usize,
}

impl ChunkReader {
    pub fn new() -> Self {
        ChunkReader {
            streams: HashMap::new(),
            chunk_size_in: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Apply a SetChunkSize; takes effect from the next chunk read
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_in = size;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    /// Apply an Abort: drop the in-flight reassembly for one chunk stream
    pub fn abort_chunk_stream(&mut self, chunk_stream_id: u32) {
        if let Some(state) = self.streams.get_mut(&chunk_stream_id) {
            state.discard();
        }
    }

    /// Read exactly one chunk (basic header, message header, payload slice)
    /// from the stream and fold it into the reassembly state.
    pub async fn read_chunk<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<ReadOutcome> {
        // EOF before the basic header is a clean close; anywhere later the
        // byte alignment is unrecoverable.
        let mut first = [0u8; 1];
        match reader.read(&mut first).await {
            Ok(0) => return Ok(ReadOutcome::Closed),
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }

        let fmt = first[0] >> 6;
        let cs_id = Self::read_chunk_stream_id(first[0] & 0x3F, reader).await?;

        let prev = self.streams.get(&cs_id).and_then(|s| s.last_header());
        let assembling = self
            .streams
            .get(&cs_id)
            .map(|s| s.is_assembling())
            .unwrap_or(false);

        if assembling && fmt != 3 {
            return Err(Error::unexpected_header(format!(
                "fmt {} header on chunk stream {} while a message is mid-reassembly",
                fmt, cs_id
            )));
        }

        let header = match fmt {
            0 | 1 | 2 => Self::read_message_header(fmt, cs_id, prev, reader).await?,
            _ => {
                // fmt 3 carries no message header: it either continues the
                // current message verbatim, or starts a new one on the same
                // timing cadence as the previous header.
                let prev = prev.ok_or_else(|| {
                    Error::malformed(format!(
                        "fmt 3 header on chunk stream {} with no prior header",
                        cs_id
                    ))
                })?;
                if assembling {
                    prev
                } else {
                    RtmpHeader {
                        timestamp: prev.timestamp.wrapping_add(prev.timestamp_delta),
                        ..prev
                    }
                }
            }
        };

        let state = self
            .streams
            .entry(cs_id)
            .or_insert_with(ChunkStreamState::new);
        if !state.is_assembling() {
            state.begin_message(header);
        }

        let slice_len = state.bytes_remaining().min(self.chunk_size_in);
        let mut payload = vec![0u8; slice_len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| Error::malformed(format!("Short read in chunk payload: {}", e)))?;

        match state.absorb_chunk(&payload) {
            Some(message) => Ok(ReadOutcome::Complete(message)),
            None => Ok(ReadOutcome::Pending),
        }
    }

    /// Resolve the 6-bit basic-header field into a chunk stream id. Values
    /// 0 and 1 are escape markers for the wide forms, never literal ids.
    async fn read_chunk_stream_id<R: AsyncRead + Unpin>(
        low_bits: u8,
        reader: &mut R,
    ) -> Result<u32> {
        match low_bits {
            0 => {
                // 2-byte form, ids 64-319
                let mut id = [0u8; 1];
                reader
                    .read_exact(&mut id)
                    .await
                    .map_err(|e| Error::malformed(format!("Short read in basic header: {}", e)))?;
                Ok(id[0] as u32 + 64)
            }
            1 => {
                // 3-byte form, ids 64-65599
                let mut id = [0u8; 2];
                reader
                    .read_exact(&mut id)
                    .await
                    .map_err(|e| Error::malformed(format!("Short read in basic header: {}", e)))?;
                Ok(u16::from_be_bytes(id) as u32 + 64)
            }
            n => Ok(n as u32),
        }
    }

    /// Read and resolve the fmt 0/1/2 message header, inheriting omitted
    /// fields from the previous header on the same chunk stream id.
    async fn read_message_header<R: AsyncRead + Unpin>(
        fmt: u8,
        cs_id: u32,
        prev: Option<RtmpHeader>,
        reader: &mut R,
    ) -> Result<RtmpHeader> {
        let header_len = match fmt {
            0 => 11,
            1 => 7,
            _ => 3,
        };
        let mut header_bytes = vec![0u8; header_len];
        reader
            .read_exact(&mut header_bytes)
            .await
            .map_err(|e| Error::malformed(format!("Short read in type {} header: {}", fmt, e)))?;
        let mut buffer = ByteBuffer::new(header_bytes);

        if fmt == 0 {
            // Absolute timestamp, everything explicit
            let timestamp = buffer.read_u24_be()?;
            let message_length = buffer.read_u24_be()?;
            let message_type_id = buffer.read_u8()?;
            let message_stream_id = buffer.read_u32_le()?;

            let timestamp = if timestamp == MAX_WIRE_TIMESTAMP {
                Self::read_extended_timestamp(reader).await?
            } else {
                timestamp
            };

            return Ok(RtmpHeader {
                chunk_stream_id: cs_id,
                timestamp,
                timestamp_delta: 0,
                message_length,
                message_type_id,
                message_stream_id,
            });
        }

        // fmt 1 and 2 are delta headers; both need an inheritance source
        let prev = prev.ok_or_else(|| {
            Error::malformed(format!(
                "fmt {} header on chunk stream {} with no prior header",
                fmt, cs_id
            ))
        })?;

        let delta = buffer.read_u24_be()?;
        let (message_length, message_type_id) = if fmt == 1 {
            (buffer.read_u24_be()?, buffer.read_u8()?)
        } else {
            (prev.message_length, prev.message_type_id)
        };

        let delta = if delta == MAX_WIRE_TIMESTAMP {
            Self::read_extended_timestamp(reader).await?
        } else {
            delta
        };

        Ok(RtmpHeader {
            chunk_stream_id: cs_id,
            timestamp: prev.timestamp.wrapping_add(delta),
            timestamp_delta: delta,
            message_length,
            message_type_id,
            message_stream_id: prev.message_stream_id,
        })
    }

    async fn read_extended_timestamp<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32> {
        let mut bytes = [0u8; 4];
        reader
            .read_exact(&mut bytes)
            .await
            .map_err(|e| Error::malformed(format!("Short read in extended timestamp: {}", e)))?;
        Ok(u32::from_be_bytes(bytes))
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MSG_TYPE_AUDIO, MSG_TYPE_COMMAND_AMF0, MSG_TYPE_VIDEO};

    fn type0_header(cs_id: u8, timestamp: u32, length: u32, type_id: u8, stream_id: u32) -> Vec<u8> {
        let mut bytes = vec![cs_id & 0x3F];
        bytes.extend_from_slice(&timestamp.to_be_bytes()[1..]);
        bytes.extend_from_slice(&length.to_be_bytes()[1..]);
        bytes.push(type_id);
        bytes.extend_from_slice(&stream_id.to_le_bytes());
        bytes
    }

    async fn read_all(reader: &mut ChunkReader, mut wire: &[u8]) -> Vec<RtmpMessage> {
        let mut messages = Vec::new();
        loop {
            match reader.read_chunk(&mut wire).await.unwrap() {
                ReadOutcome::Complete(m) => messages.push(m),
                ReadOutcome::Pending => {}
                ReadOutcome::Closed => return messages,
            }
        }
    }

    #[tokio::test]
    async fn test_type0_single_chunk_message() {
        let mut wire = type0_header(3, 1000, 4, MSG_TYPE_COMMAND_AMF0, 7);
        wire.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut reader = ChunkReader::new();
        let messages = read_all(&mut reader, &wire).await;

        assert_eq!(messages.len(), 1);
        let m = &messages[0];
        assert_eq!(m.timestamp(), 1000);
        assert_eq!(m.type_id(), MSG_TYPE_COMMAND_AMF0);
        assert_eq!(m.message_stream_id(), 7);
        assert_eq!(m.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[tokio::test]
    async fn test_type1_inherits_stream_id_and_advances_time() {
        let mut wire = type0_header(3, 1000, 2, MSG_TYPE_AUDIO, 9);
        wire.extend_from_slice(&[1, 2]);
        // fmt 1: delta 50, new length 3, same type; stream id inherited
        wire.push(0x40 | 3);
        wire.extend_from_slice(&[0, 0, 50]);
        wire.extend_from_slice(&[0, 0, 3]);
        wire.push(MSG_TYPE_AUDIO);
        wire.extend_from_slice(&[4, 5, 6]);

        let mut reader = ChunkReader::new();
        let messages = read_all(&mut reader, &wire).await;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].message_stream_id(), 9);
        assert_eq!(messages[1].timestamp(), 1050);
        assert_eq!(messages[1].payload, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_type2_and_type3_inherit_everything() {
        let mut wire = type0_header(3, 100, 2, MSG_TYPE_AUDIO, 9);
        wire.extend_from_slice(&[1, 2]);
        // fmt 2: only a delta of 25
        wire.push(0x80 | 3);
        wire.extend_from_slice(&[0, 0, 25]);
        wire.extend_from_slice(&[3, 4]);
        // fmt 3: fresh message, same cadence
        wire.push(0xC0 | 3);
        wire.extend_from_slice(&[5, 6]);

        let mut reader = ChunkReader::new();
        let messages = read_all(&mut reader, &wire).await;

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].timestamp(), 125);
        assert_eq!(messages[1].header.message_length, 2);
        assert_eq!(messages[2].timestamp(), 150);
        assert_eq!(messages[2].type_id(), MSG_TYPE_AUDIO);
        assert_eq!(messages[2].payload, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_delta_header_without_prior_is_malformed() {
        let mut wire = vec![0x40 | 5];
        wire.extend_from_slice(&[0, 0, 10, 0, 0, 1, MSG_TYPE_AUDIO, 0xAA]);

        let mut reader = ChunkReader::new();
        let mut slice = wire.as_slice();
        match reader.read_chunk(&mut slice).await {
            Err(Error::MalformedStream(_)) => {}
            other => panic!("Expected MalformedStream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_continuation_header_mid_message_is_rejected() {
        // Message of 200 bytes at chunk size 128: first chunk leaves 72
        // bytes pending, then a fmt 0 header arrives instead of fmt 3.
        let mut wire = type0_header(3, 0, 200, MSG_TYPE_VIDEO, 1);
        wire.extend_from_slice(&[0u8; 128]);
        wire.extend_from_slice(&type0_header(3, 0, 10, MSG_TYPE_VIDEO, 1));

        let mut reader = ChunkReader::new();
        let mut slice = wire.as_slice();
        assert!(matches!(
            reader.read_chunk(&mut slice).await.unwrap(),
            ReadOutcome::Pending
        ));
        match reader.read_chunk(&mut slice).await {
            Err(Error::UnexpectedHeaderDuringContinuation(_)) => {}
            other => panic!("Expected continuation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wide_chunk_stream_id_forms() {
        // 2-byte form: low bits 0, next byte 36 -> id 100
        let mut wire = vec![0x00, 36];
        wire.extend_from_slice(&type0_header(0, 0, 1, MSG_TYPE_AUDIO, 1)[1..]);
        wire.push(0xAB);
        // 3-byte form: low bits 1, 0x0100 big-endian -> id 320
        wire.extend_from_slice(&[0x01, 0x01, 0x00]);
        wire.extend_from_slice(&type0_header(0, 0, 1, MSG_TYPE_AUDIO, 1)[1..]);
        wire.push(0xCD);

        let mut reader = ChunkReader::new();
        let messages = read_all(&mut reader, &wire).await;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].header.chunk_stream_id, 100);
        assert_eq!(messages[1].header.chunk_stream_id, 320);
    }

    #[tokio::test]
    async fn test_extended_timestamp() {
        let mut wire = vec![3u8];
        wire.extend_from_slice(&[0xFF, 0xFF, 0xFF]); // escape
        wire.extend_from_slice(&[0, 0, 1]);
        wire.push(MSG_TYPE_VIDEO);
        wire.extend_from_slice(&1u32.to_le_bytes());
        wire.extend_from_slice(&0x0100_0000u32.to_be_bytes()); // extended
        wire.push(0x55);

        let mut reader = ChunkReader::new();
        let messages = read_all(&mut reader, &wire).await;

        assert_eq!(messages[0].timestamp(), 0x0100_0000);
    }

    #[tokio::test]
    async fn test_abort_discards_in_flight_message() {
        let mut wire = type0_header(3, 0, 200, MSG_TYPE_VIDEO, 1);
        wire.extend_from_slice(&[0u8; 128]);

        let mut reader = ChunkReader::new();
        let mut slice = wire.as_slice();
        assert!(matches!(
            reader.read_chunk(&mut slice).await.unwrap(),
            ReadOutcome::Pending
        ));

        reader.abort_chunk_stream(3);

        // A fresh fmt 0 header is legal again after the abort
        let mut wire2 = type0_header(3, 10, 1, MSG_TYPE_VIDEO, 1);
        wire2.push(0x99);
        let messages = read_all(&mut reader, &wire2).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload, vec![0x99]);
    }

    #[tokio::test]
    async fn test_clean_eof_is_closed() {
        let mut reader = ChunkReader::new();
        let mut wire: &[u8] = &[];
        assert!(matches!(
            reader.read_chunk(&mut wire).await.unwrap(),
            ReadOutcome::Closed
        ));
    }
}
