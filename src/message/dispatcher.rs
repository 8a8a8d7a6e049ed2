use crate::message::types::{ControlType, MessageType};
use crate::protocol::{RtmpCommand, RtmpMessage};
use crate::{Error, Result};
use log::{debug, warn};
use std::sync::Arc;

/// Outbound path handed to the session handler. Messages sent through it
/// are chunked with the connection's outgoing chunk size.
#[async_trait::async_trait]
pub trait SessionContext: Send + Sync {
    async fn send_message(&self, message: RtmpMessage) -> Result<()>;
    fn connection_id(&self) -> &str;
}

/// The external collaborator: receives fully reassembled messages and may
/// push messages back through the SessionContext. Everything downstream of
/// framing (publish/play, relay, auth) lives behind this trait.
#[async_trait::async_trait]
pub trait SessionHandler: Send + Sync {
    /// User control events (message type 4)
    async fn on_control_event(
        &self,
        event: UserControlEvent,
        ctx: Arc<dyn SessionContext>,
    ) -> Result<()>;

    /// Decoded command messages (types 20, 17, 15)
    async fn on_command(
        &self,
        stream_id: u32,
        command: RtmpCommand,
        ctx: Arc<dyn SessionContext>,
    ) -> Result<()>;

    /// Audio and video frames (types 8, 9)
    async fn on_media_frame(
        &self,
        stream_id: u32,
        type_id: u8,
        timestamp: u32,
        payload: Vec<u8>,
        ctx: Arc<dyn SessionContext>,
    ) -> Result<()>;

    /// Verbatim fallback: data messages (18), unknown types, and commands
    /// whose AMF body could not be decoded
    async fn on_message(&self, message: RtmpMessage, ctx: Arc<dyn SessionContext>) -> Result<()>;
}

/// User control payload, forwarded opaquely: the leading event type plus
/// whatever the event carries.
#[derive(Debug, Clone)]
pub struct UserControlEvent {
    pub event_type: u16,
    pub body: Vec<u8>,
}

impl UserControlEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(Error::malformed("User control payload under 2 bytes"));
        }
        Ok(UserControlEvent {
            event_type: u16::from_be_bytes([payload[0], payload[1]]),
            body: payload[2..].to_vec(),
        })
    }
}

/// Reassembly-affecting outcome of a dispatch, applied by the connection
/// to its ChunkReader before the next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEffect {
    None,
    SetChunkSize(u32),
    AbortChunkStream(u32),
}

/// Routes completed messages: protocol control handled in-core, everything
/// else forwarded to the session handler. One instance per connection.
#[derive(Debug, Default)]
pub struct MessageDispatcher {
    /// Peer's declared window, from WindowAckSize (type 5)
    window_ack_size: Option<u32>,

    /// Window and limit type from SetPeerBandwidth (type 6)
    peer_bandwidth: Option<(u32, u8)>,

    /// Sequence number from the peer's last Acknowledgement (type 3)
    acknowledged_sequence: Option<u32>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        MessageDispatcher::default()
    }

    pub fn window_ack_size(&self) -> Option<u32> {
        self.window_ack_size
    }

    pub fn peer_bandwidth(&self) -> Option<(u32, u8)> {
        self.peer_bandwidth
    }

    pub fn acknowledged_sequence(&self) -> Option<u32> {
        self.acknowledged_sequence
    }

    pub async fn dispatch(
        &mut self,
        message: RtmpMessage,
        ctx: &Arc<dyn SessionContext>,
        handler: &Arc<dyn SessionHandler>,
    ) -> Result<DispatchEffect> {
        match MessageType::from_id(message.type_id()) {
            MessageType::Control(control) => self.handle_control(control, &message),

            MessageType::UserControl => match UserControlEvent::parse(&message.payload) {
                Ok(event) => {
                    handler.on_control_event(event, ctx.clone()).await?;
                    Ok(DispatchEffect::None)
                }
                Err(e) => {
                    warn!("Dropping short user control message: {}", e);
                    Ok(DispatchEffect::None)
                }
            },

            MessageType::Audio | MessageType::Video => {
                handler
                    .on_media_frame(
                        message.message_stream_id(),
                        message.type_id(),
                        message.timestamp(),
                        message.payload,
                        ctx.clone(),
                    )
                    .await?;
                Ok(DispatchEffect::None)
            }

            MessageType::Command => match RtmpCommand::decode(&message.payload) {
                Ok(command) => {
                    handler
                        .on_command(message.message_stream_id(), command, ctx.clone())
                        .await?;
                    Ok(DispatchEffect::None)
                }
                // AMF trouble stays local to this message: forward the raw
                // bytes and keep the connection alive
                Err(e) if !e.is_fatal() => {
                    warn!(
                        "Forwarding command with undecodable AMF body verbatim: {}",
                        e
                    );
                    handler.on_message(message, ctx.clone()).await?;
                    Ok(DispatchEffect::None)
                }
                Err(e) => Err(e),
            },

            MessageType::Data => {
                handler.on_message(message, ctx.clone()).await?;
                Ok(DispatchEffect::None)
            }

            MessageType::Unknown(id) => {
                warn!("Forwarding message with unknown type id {} verbatim", id);
                handler.on_message(message, ctx.clone()).await?;
                Ok(DispatchEffect::None)
            }
        }
    }

    fn handle_control(
        &mut self,
        control: ControlType,
        message: &RtmpMessage,
    ) -> Result<DispatchEffect> {
        let value = read_control_u32(&message.payload)?;

        match control {
            ControlType::SetChunkSize => {
                // Top bit is reserved on the wire
                let size = value & 0x7FFF_FFFF;
                if size == 0 {
                    return Err(Error::malformed("SetChunkSize of zero"));
                }
                debug!("Peer set incoming chunk size to {}", size);
                Ok(DispatchEffect::SetChunkSize(size))
            }
            ControlType::Abort => {
                debug!("Peer aborted chunk stream {}", value);
                Ok(DispatchEffect::AbortChunkStream(value))
            }
            ControlType::Acknowledgement => {
                self.acknowledged_sequence = Some(value);
                Ok(DispatchEffect::None)
            }
            ControlType::WindowAcknowledgement => {
                debug!("Peer window acknowledgement size: {}", value);
                self.window_ack_size = Some(value);
                Ok(DispatchEffect::None)
            }
            ControlType::SetPeerBandwidth => {
                let limit_type = message.payload.get(4).copied().unwrap_or(2);
                self.peer_bandwidth = Some((value, limit_type));
                Ok(DispatchEffect::None)
            }
        }
    }
}

fn read_control_u32(payload: &[u8]) -> Result<u32> {
    if payload.len() < 4 {
        return Err(Error::malformed(format!(
            "Control payload under 4 bytes: {}",
            payload.len()
        )));
    }
    Ok(u32::from_be_bytes([
        payload[0], payload[1], payload[2], payload[3],
    ]))
}
