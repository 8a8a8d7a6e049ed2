mod utils;
mod amf;
mod protocol;
pub mod handshake;
mod chunk;
mod message;
mod connection;
mod server;

// Re-export commonly used types at crate root
pub use utils::*;
pub use amf::*;
pub use protocol::*;
pub use chunk::*;
pub use message::*;
pub use connection::*;

// Handshake exports (the engine itself lives under handshake::serve)
pub use handshake::{
    C0C1, HANDSHAKE_RANDOM_SIZE, HANDSHAKE_SIZE, HandshakeFormat, HandshakeState, RTMP_VERSION,
    S0S1S2,
};

// Server exports
pub use server::{RtmpServer, ServerConfig, ServerConfigBuilder, ServerContext};
