use crate::handshake::state::HandshakeFormat;
use crate::utils::{current_timestamp, generate_random_bytes};
use crate::{ByteBuffer, Error, Result};

/// RTMP version the server speaks
pub const RTMP_VERSION: u8 = 3;

/// Handshake packet size (C1/S1/C2/S2)
pub const HANDSHAKE_SIZE: usize = 1536;

/// Random section of C1/S1: everything after the two 4-byte time fields
pub const HANDSHAKE_RANDOM_SIZE: usize = HANDSHAKE_SIZE - 8;

/// FMS version bytes marking a digest-style handshake
pub const FMS_VERSION: [u8; 4] = [0x05, 0x00, 0x01, 0x01];

/// Client hello: C0 (requested version) plus C1 (time + random payload)
#[derive(Debug, Clone)]
pub struct C0C1 {
    /// Requested version from C0; the server degrades anything unsupported
    /// to RTMP_VERSION instead of rejecting
    pub requested_version: u8,

    /// C1 timestamp (client epoch, bytes 0-3)
    pub timestamp: u32,

    /// C1 bytes 4-7, zero for plain handshakes
    pub zero: u32,

    /// C1 random payload (bytes 8-1535)
    pub random_data: Vec<u8>,
}

impl C0C1 {
    /// Parse the 1537-byte C0+C1 block
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "C0+C1 too short: {} bytes, expected {}",
                data.len(),
                1 + HANDSHAKE_SIZE
            )));
        }

        let requested_version = data[0];

        let mut buffer = ByteBuffer::new(data[1..1 + HANDSHAKE_SIZE].to_vec());
        let timestamp = buffer
            .read_u32_be()
            .map_err(|e| Error::handshake(format!("Failed to read C1 timestamp: {}", e)))?;
        let zero = buffer
            .read_u32_be()
            .map_err(|e| Error::handshake(format!("Failed to read C1 zero field: {}", e)))?;
        let random_data = buffer
            .read_bytes(HANDSHAKE_RANDOM_SIZE)
            .map_err(|e| Error::handshake(format!("Failed to read C1 random data: {}", e)))?;

        Ok(C0C1 {
            requested_version,
            timestamp,
            zero,
            random_data,
        })
    }

    /// Build a client-side C0+C1 (used by tests and tools)
    pub fn create_client() -> Self {
        C0C1 {
            requested_version: RTMP_VERSION,
            timestamp: current_timestamp(),
            zero: 0,
            random_data: generate_random_bytes(HANDSHAKE_RANDOM_SIZE),
        }
    }

    /// Encode to the 1537-byte C0+C1 block
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE);
        buffer.write_u8(self.requested_version).ok();
        buffer.write_u32_be(self.timestamp).ok();
        buffer.write_u32_be(self.zero).ok();
        buffer.write_bytes(&self.random_data).ok();
        buffer.to_vec()
    }

    /// Detect whether the client sent a digest-style handshake, and which
    /// layout it used
    pub fn detect_format(&self) -> HandshakeFormat {
        if self.random_data.len() >= 4 && self.random_data[0..4] == FMS_VERSION {
            return HandshakeFormat::Format1;
        }

        if self.random_data.len() >= 768 && self.random_data[764..768] == FMS_VERSION {
            return HandshakeFormat::Format2;
        }

        HandshakeFormat::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c0c1_round_trip() {
        let original = C0C1::create_client();
        let bytes = original.encode();
        assert_eq!(bytes.len(), 1537);

        let parsed = C0C1::parse(&bytes).unwrap();
        assert_eq!(parsed.requested_version, RTMP_VERSION);
        assert_eq!(parsed.timestamp, original.timestamp);
        assert_eq!(parsed.zero, 0);
        assert_eq!(parsed.random_data, original.random_data);
    }

    #[test]
    fn test_old_version_still_parses() {
        let mut old = C0C1::create_client();
        old.requested_version = 2;

        // Deprecated versions are degraded later, never a parse error
        let parsed = C0C1::parse(&old.encode()).unwrap();
        assert_eq!(parsed.requested_version, 2);
    }

    #[test]
    fn test_short_block_is_rejected() {
        assert!(C0C1::parse(&[3u8; 100]).is_err());
    }

    #[test]
    fn test_format_detection() {
        let plain = C0C1::create_client();
        // Random data could collide with the marker; force it clean
        let mut plain_data = plain.random_data.clone();
        plain_data[0..4].copy_from_slice(&[0, 0, 0, 0]);
        plain_data[764..768].copy_from_slice(&[0, 0, 0, 0]);
        let plain = C0C1 {
            random_data: plain_data,
            ..plain
        };
        assert_eq!(plain.detect_format(), HandshakeFormat::Plain);

        let mut digest = C0C1::create_client();
        digest.random_data[0..4].copy_from_slice(&FMS_VERSION);
        assert_eq!(digest.detect_format(), HandshakeFormat::Format1);
    }
}
