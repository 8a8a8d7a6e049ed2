use std::io::Error as IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Handshake incomplete: {0}")]
    HandshakeIncomplete(String),

    #[error("Malformed chunk stream: {0}")]
    MalformedStream(String),

    #[error("Unexpected header during continuation: {0}")]
    UnexpectedHeaderDuringContinuation(String),

    #[error("Unsupported AMF0 marker: 0x{0:02x}")]
    UnsupportedAmfType(u8),

    #[error("AMF decode error: {0}")]
    AmfDecode(String),

    #[error("AMF encode error: {0}")]
    AmfEncode(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Create a handshake-incomplete error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Error::HandshakeIncomplete(msg.into())
    }

    /// Create a malformed-stream error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedStream(msg.into())
    }

    /// Create an unexpected-continuation error
    pub fn unexpected_header(msg: impl Into<String>) -> Self {
        Error::UnexpectedHeaderDuringContinuation(msg.into())
    }

    /// Create an AMF decode error
    pub fn amf_decode(msg: impl Into<String>) -> Self {
        Error::AmfDecode(msg.into())
    }

    /// Create an AMF encode error
    pub fn amf_encode(msg: impl Into<String>) -> Self {
        Error::AmfEncode(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Framing and handshake errors tear down the connection; AMF errors
    /// stay local to a single message.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::UnsupportedAmfType(_) | Error::AmfDecode(_) | Error::AmfEncode(_)
        )
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed("type 1 header without prior header");
        assert_eq!(
            format!("{}", err),
            "Malformed chunk stream: type 1 header without prior header"
        );

        let err = Error::UnsupportedAmfType(0x0D);
        assert_eq!(format!("{}", err), "Unsupported AMF0 marker: 0x0d");
    }

    #[test]
    fn test_io_conversion() {
        use std::io::{Error as IoError, ErrorKind};

        let io_err = IoError::new(ErrorKind::UnexpectedEof, "EOF");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            other => panic!("Expected IO error variant, got {:?}", other),
        }
    }

    #[test]
    fn test_fatality() {
        assert!(Error::malformed("bad header").is_fatal());
        assert!(Error::handshake("short read").is_fatal());
        assert!(!Error::UnsupportedAmfType(0x11).is_fatal());
        assert!(!Error::amf_decode("truncated string").is_fatal());
    }
}
