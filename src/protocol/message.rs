use crate::protocol::constants::*;

/// Fully decoded chunk header for one message: basic-header fields plus the
/// message header with every inherited field resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub chunk_stream_id: u32,
    /// Absolute timestamp after delta resolution
    pub timestamp: u32,
    /// Last explicit delta on this chunk stream; reused by fresh fmt=3 headers
    pub timestamp_delta: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
}

impl RtmpHeader {
    pub fn new(
        chunk_stream_id: u32,
        timestamp: u32,
        message_length: u32,
        message_type_id: u8,
        message_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            chunk_stream_id,
            timestamp,
            timestamp_delta: 0,
            message_length,
            message_type_id,
            message_stream_id,
        }
    }

    /// Check if the timestamp needs the 4-byte extended field
    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp >= MAX_WIRE_TIMESTAMP
    }

    /// 24-bit field value for the wire: the timestamp itself, or the
    /// 0xFFFFFF escape when extended
    pub fn wire_timestamp(&self) -> u32 {
        if self.has_extended_timestamp() {
            MAX_WIRE_TIMESTAMP
        } else {
            self.timestamp
        }
    }
}

/// A reassembled message: immutable once complete, handed to the dispatcher
/// and then to the session handler.
#[derive(Debug, Clone)]
pub struct RtmpMessage {
    pub header: RtmpHeader,
    pub payload: Vec<u8>,
}

impl RtmpMessage {
    pub fn new(header: RtmpHeader, payload: Vec<u8>) -> Self {
        RtmpMessage { header, payload }
    }

    /// Build an outbound message, deriving length from the payload
    pub fn outbound(
        chunk_stream_id: u32,
        message_type_id: u8,
        message_stream_id: u32,
        timestamp: u32,
        payload: Vec<u8>,
    ) -> Self {
        let header = RtmpHeader::new(
            chunk_stream_id,
            timestamp,
            payload.len() as u32,
            message_type_id,
            message_stream_id,
        );
        RtmpMessage { header, payload }
    }

    /// AMF0 command on the command chunk stream
    pub fn command(message_stream_id: u32, payload: Vec<u8>) -> Self {
        Self::outbound(
            CHUNK_STREAM_COMMAND,
            MSG_TYPE_COMMAND_AMF0,
            message_stream_id,
            0,
            payload,
        )
    }

    /// Audio frame on the audio chunk stream
    pub fn audio(message_stream_id: u32, timestamp: u32, payload: Vec<u8>) -> Self {
        Self::outbound(
            CHUNK_STREAM_AUDIO,
            MSG_TYPE_AUDIO,
            message_stream_id,
            timestamp,
            payload,
        )
    }

    /// Video frame on the video chunk stream
    pub fn video(message_stream_id: u32, timestamp: u32, payload: Vec<u8>) -> Self {
        Self::outbound(
            CHUNK_STREAM_VIDEO,
            MSG_TYPE_VIDEO,
            message_stream_id,
            timestamp,
            payload,
        )
    }

    /// Protocol-control message on chunk stream 2, message stream 0
    pub fn protocol_control(message_type_id: u8, payload: Vec<u8>) -> Self {
        Self::outbound(CHUNK_STREAM_PROTOCOL, message_type_id, 0, 0, payload)
    }

    pub fn type_id(&self) -> u8 {
        self.header.message_type_id
    }

    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    pub fn is_audio(&self) -> bool {
        self.header.message_type_id == MSG_TYPE_AUDIO
    }

    pub fn is_video(&self) -> bool {
        self.header.message_type_id == MSG_TYPE_VIDEO
    }

    pub fn is_command(&self) -> bool {
        matches!(
            self.header.message_type_id,
            MSG_TYPE_COMMAND_AMF0 | MSG_TYPE_COMMAND_AMF3 | MSG_TYPE_DATA_AMF3
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_derives_length() {
        let msg = RtmpMessage::audio(1, 1000, vec![0xAF, 0x01, 0x00]);
        assert!(msg.is_audio());
        assert_eq!(msg.header.message_length, 3);
        assert_eq!(msg.header.chunk_stream_id, CHUNK_STREAM_AUDIO);
        assert_eq!(msg.timestamp(), 1000);
    }

    #[test]
    fn test_extended_timestamp_threshold() {
        let below = RtmpHeader::new(3, 0xFF_FFFE, 0, MSG_TYPE_VIDEO, 1);
        assert!(!below.has_extended_timestamp());
        assert_eq!(below.wire_timestamp(), 0xFF_FFFE);

        let at = RtmpHeader::new(3, 0xFF_FFFF, 0, MSG_TYPE_VIDEO, 1);
        assert!(at.has_extended_timestamp());
        assert_eq!(at.wire_timestamp(), 0xFF_FFFF);

        let above = RtmpHeader::new(3, 0x0100_0000, 0, MSG_TYPE_VIDEO, 1);
        assert!(above.has_extended_timestamp());
        assert_eq!(above.wire_timestamp(), 0xFF_FFFF);
    }
}
