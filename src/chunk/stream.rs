use crate::protocol::{RtmpHeader, RtmpMessage};

/// Per-chunk-stream decode state: the inheritance source for later headers
/// plus the reassembly buffer for the in-flight message. Created lazily on
/// the first chunk for an id and kept until the connection closes.
#[derive(Debug, Clone, Default)]
pub struct ChunkStreamState {
    /// Most recent header decoded for this chunk stream
    last_header: Option<RtmpHeader>,

    /// Partial message being reassembled
    message_buffer: Vec<u8>,

    /// Bytes still missing from the current message
    bytes_remaining: usize,
}

impl ChunkStreamState {
    pub fn new() -> Self {
        ChunkStreamState::default()
    }

    /// A message is mid-reassembly; only fmt=3 continuations are legal
    pub fn is_assembling(&self) -> bool {
        self.bytes_remaining > 0
    }

    pub fn bytes_remaining(&self) -> usize {
        self.bytes_remaining
    }

    pub fn last_header(&self) -> Option<RtmpHeader> {
        self.last_header
    }

    /// Start reassembling a new message described by header
    pub fn begin_message(&mut self, header: RtmpHeader) {
        self.last_header = Some(header);
        self.bytes_remaining = header.message_length as usize;
        self.message_buffer.clear();
        self.message_buffer.reserve(self.bytes_remaining);
    }

    /// Append one chunk's payload slice. Returns the completed message once
    /// message_length bytes have been collected, resetting the buffer slot
    /// (last_header stays, it is the inheritance source).
    pub fn absorb_chunk(&mut self, data: &[u8]) -> Option<RtmpMessage> {
        debug_assert!(data.len() <= self.bytes_remaining);

        self.message_buffer.extend_from_slice(data);
        self.bytes_remaining -= data.len();

        if self.bytes_remaining == 0 {
            let header = self.last_header?;
            return Some(RtmpMessage::new(
                header,
                std::mem::take(&mut self.message_buffer),
            ));
        }

        None
    }

    /// Drop the in-flight message (Abort control message, connection close)
    pub fn discard(&mut self) {
        self.message_buffer.clear();
        self.bytes_remaining = 0;
    }
}
