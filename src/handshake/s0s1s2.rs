use crate::ByteBuffer;
use crate::handshake::c0c1::{C0C1, HANDSHAKE_RANDOM_SIZE, HANDSHAKE_SIZE, RTMP_VERSION};
use crate::handshake::state::HandshakeFormat;
use crate::utils::{calculate_hmac_sha256, current_timestamp, generate_random_bytes};
use log::debug;

const DIGEST_KEY: &[u8] = b"Genuine Adobe Flash Media Server 001";
const DIGEST_SIZE: usize = 32;

/// Digest slot offsets inside the S1 random section, by client format
const FORMAT1_DIGEST_OFFSET: usize = 0;
const FORMAT2_DIGEST_OFFSET: usize = 772;

/// Server handshake response (S0 + S1 + S2)
#[derive(Debug, Clone)]
pub struct S0S1S2 {
    /// Accepted version (S0)
    pub version: u8,

    /// S1 timestamp (server epoch)
    pub s1_timestamp: u32,

    /// S1 random payload
    pub s1_random: Vec<u8>,

    /// S2 bytes 0-3: echo of the C1 timestamp
    pub s2_timestamp: u32,

    /// S2 bytes 4-7: time C1 was received
    pub s2_timestamp2: u32,

    /// S2 bytes 8-1535: byte-for-byte echo of the C1 random payload
    pub s2_random_echo: Vec<u8>,
}

/// Version negotiation: anything but the supported version is degraded to
/// the default rather than rejected.
pub fn accepted_version(requested: u8) -> u8 {
    if requested != RTMP_VERSION {
        debug!(
            "Degrading requested RTMP version {} to {}",
            requested, RTMP_VERSION
        );
    }
    RTMP_VERSION
}

impl S0S1S2 {
    /// Generate the S0+S1+S2 response for a parsed C0+C1. Digest-style
    /// clients get an HMAC digest embedded in the S1 random section.
    pub fn generate(c0c1: &C0C1) -> Self {
        let mut s1_random = generate_random_bytes(HANDSHAKE_RANDOM_SIZE);

        match c0c1.detect_format() {
            HandshakeFormat::Plain => {}
            HandshakeFormat::Format1 => embed_digest(&mut s1_random, FORMAT1_DIGEST_OFFSET),
            HandshakeFormat::Format2 => embed_digest(&mut s1_random, FORMAT2_DIGEST_OFFSET),
        }

        S0S1S2 {
            version: accepted_version(c0c1.requested_version),
            s1_timestamp: current_timestamp(),
            s1_random,
            s2_timestamp: c0c1.timestamp,
            s2_timestamp2: current_timestamp(),
            s2_random_echo: c0c1.random_data.clone(),
        }
    }

    /// Encode to the 3073-byte S0+S1+S2 block
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE * 2);

        // S0
        buffer.write_u8(self.version).ok();

        // S1: timestamp, zero field, random payload
        buffer.write_u32_be(self.s1_timestamp).ok();
        buffer.write_u32_be(0).ok();
        buffer.write_bytes(&self.s1_random).ok();

        // S2: C1 timestamp echo, reception timestamp, C1 random echo
        buffer.write_u32_be(self.s2_timestamp).ok();
        buffer.write_u32_be(self.s2_timestamp2).ok();
        buffer.write_bytes(&self.s2_random_echo).ok();

        buffer.to_vec()
    }
}

/// HMAC over the random payload with the digest slot zeroed, written back
/// into the slot.
fn embed_digest(random: &mut [u8], offset: usize) {
    if random.len() < offset + DIGEST_SIZE {
        return;
    }
    random[offset..offset + DIGEST_SIZE].fill(0);
    let digest = calculate_hmac_sha256(DIGEST_KEY, random);
    random[offset..offset + DIGEST_SIZE].copy_from_slice(&digest);
}
