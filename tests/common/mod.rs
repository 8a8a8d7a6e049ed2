// Shared helpers: hand-built chunk wire images and a recording session
// handler for asserting what reached the collaborator.

use rtmpframe::{
    C0C1, HANDSHAKE_SIZE, Result, RtmpCommand, RtmpMessage, SessionContext, SessionHandler,
    UserControlEvent,
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// fmt 0 header for one message, basic header included
pub fn type0_header(
    cs_id: u8,
    timestamp: u32,
    message_length: u32,
    type_id: u8,
    stream_id: u32,
) -> Vec<u8> {
    let mut bytes = vec![cs_id & 0x3F];
    bytes.extend_from_slice(&timestamp.to_be_bytes()[1..]);
    bytes.extend_from_slice(&message_length.to_be_bytes()[1..]);
    bytes.push(type_id);
    bytes.extend_from_slice(&stream_id.to_le_bytes());
    bytes
}

/// fmt 3 continuation basic header
pub fn continuation_header(cs_id: u8) -> Vec<u8> {
    vec![0xC0 | (cs_id & 0x3F)]
}

/// A whole message as the wire carries it: fmt 0 header, then the payload
/// sliced into chunks of chunk_size with fmt 3 continuations between them
pub fn chunked_message(
    cs_id: u8,
    timestamp: u32,
    type_id: u8,
    stream_id: u32,
    payload: &[u8],
    chunk_size: usize,
) -> Vec<u8> {
    let mut wire = type0_header(cs_id, timestamp, payload.len() as u32, type_id, stream_id);

    let mut offset = 0;
    let mut first = true;
    while offset < payload.len() || first {
        if !first {
            wire.extend_from_slice(&continuation_header(cs_id));
        }
        let end = (offset + chunk_size).min(payload.len());
        wire.extend_from_slice(&payload[offset..end]);
        offset = end;
        first = false;
    }

    wire
}

/// Events the recording handler captures, in dispatch order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Control(u16),
    Command(u32, String),
    Media(u8, u32, usize),
    Raw(u8, usize),
}

#[derive(Default)]
pub struct RecordingHandler {
    pub events: Mutex<Vec<SessionEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingHandler::default())
    }
}

#[async_trait::async_trait]
impl SessionHandler for RecordingHandler {
    async fn on_control_event(
        &self,
        event: UserControlEvent,
        _ctx: Arc<dyn SessionContext>,
    ) -> Result<()> {
        self.events
            .lock()
            .await
            .push(SessionEvent::Control(event.event_type));
        Ok(())
    }

    async fn on_command(
        &self,
        stream_id: u32,
        command: RtmpCommand,
        _ctx: Arc<dyn SessionContext>,
    ) -> Result<()> {
        self.events
            .lock()
            .await
            .push(SessionEvent::Command(stream_id, command.name));
        Ok(())
    }

    async fn on_media_frame(
        &self,
        _stream_id: u32,
        type_id: u8,
        timestamp: u32,
        payload: Vec<u8>,
        _ctx: Arc<dyn SessionContext>,
    ) -> Result<()> {
        self.events
            .lock()
            .await
            .push(SessionEvent::Media(type_id, timestamp, payload.len()));
        Ok(())
    }

    async fn on_message(&self, message: RtmpMessage, _ctx: Arc<dyn SessionContext>) -> Result<()> {
        self.events
            .lock()
            .await
            .push(SessionEvent::Raw(message.type_id(), message.payload.len()));
        Ok(())
    }
}

/// Drive the client side of the handshake over any duplex byte stream
pub async fn client_handshake<S>(stream: &mut S) -> Vec<u8>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let c0c1 = C0C1::create_client();
    stream.write_all(&c0c1.encode()).await.unwrap();

    let mut response = vec![0u8; 1 + HANDSHAKE_SIZE * 2];
    stream.read_exact(&mut response).await.unwrap();

    // C2 echoes S1
    stream
        .write_all(&response[1..1 + HANDSHAKE_SIZE])
        .await
        .unwrap();

    response
}
