use crate::protocol::constants::*;

/// The message type set is fixed by the wire protocol, so routing is a
/// closed enum rather than dynamic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Protocol-control messages handled in-core (1, 2, 3, 5, 6)
    Control(ControlType),

    /// User control events (4), forwarded as opaque events
    UserControl,

    /// Audio data (8)
    Audio,

    /// Video data (9)
    Video,

    /// Command messages carrying an AMF body (15, 17, 20)
    Command,

    /// AMF0 data messages (18), forwarded verbatim
    Data,

    /// Anything else, forwarded verbatim with a warning
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    SetChunkSize,
    Abort,
    Acknowledgement,
    WindowAcknowledgement,
    SetPeerBandwidth,
}

impl MessageType {
    pub fn from_id(id: u8) -> Self {
        match id {
            MSG_TYPE_SET_CHUNK_SIZE => MessageType::Control(ControlType::SetChunkSize),
            MSG_TYPE_ABORT => MessageType::Control(ControlType::Abort),
            MSG_TYPE_ACK => MessageType::Control(ControlType::Acknowledgement),
            MSG_TYPE_WINDOW_ACK => MessageType::Control(ControlType::WindowAcknowledgement),
            MSG_TYPE_SET_PEER_BW => MessageType::Control(ControlType::SetPeerBandwidth),
            MSG_TYPE_USER_CONTROL => MessageType::UserControl,
            MSG_TYPE_AUDIO => MessageType::Audio,
            MSG_TYPE_VIDEO => MessageType::Video,
            MSG_TYPE_COMMAND_AMF0 | MSG_TYPE_COMMAND_AMF3 | MSG_TYPE_DATA_AMF3 => {
                MessageType::Command
            }
            MSG_TYPE_DATA_AMF0 => MessageType::Data,
            other => MessageType::Unknown(other),
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, MessageType::Control(_))
    }

    pub fn is_media(&self) -> bool {
        matches!(self, MessageType::Audio | MessageType::Video)
    }
}
