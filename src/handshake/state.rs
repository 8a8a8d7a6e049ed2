use crate::{Error, Result};

/// Server-side handshake progression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandshakeState {
    /// Waiting for C0+C1 from the client
    Uninitialized,

    /// Sent S0+S1+S2, waiting for C2
    SentS0S1S2,

    /// Received C2, handshake complete
    Done,

    /// Error occurred
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub enum HandshakeEvent {
    ReceivedC0C1,
    ReceivedC2,
}

impl HandshakeState {
    pub fn new() -> Self {
        HandshakeState::Uninitialized
    }

    pub fn is_done(&self) -> bool {
        *self == HandshakeState::Done
    }

    /// Advance the state machine; out-of-order events mark it failed
    pub fn transition(&mut self, event: HandshakeEvent) -> Result<()> {
        match (*self, event) {
            (HandshakeState::Uninitialized, HandshakeEvent::ReceivedC0C1) => {
                *self = HandshakeState::SentS0S1S2;
                Ok(())
            }
            (HandshakeState::SentS0S1S2, HandshakeEvent::ReceivedC2) => {
                *self = HandshakeState::Done;
                Ok(())
            }
            (state, event) => {
                *self = HandshakeState::Failed;
                Err(Error::handshake(format!(
                    "Invalid transition from {:?} with event {:?}",
                    state, event
                )))
            }
        }
    }
}

impl Default for HandshakeState {
    fn default() -> Self {
        Self::new()
    }
}

/// C1 layout variants the server answers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandshakeFormat {
    /// Plain random payload
    Plain,

    /// Digest at the head of the random section
    Format1,

    /// Digest at offset 772 of the random section
    Format2,
}
