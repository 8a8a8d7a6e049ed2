use crate::chunk::{ChunkReader, ChunkWriter, ReadOutcome};
use crate::connection::context::ConnectionContext;
use crate::connection::state::ConnectionState;
use crate::handshake;
use crate::message::{DispatchEffect, MessageDispatcher, SessionContext, SessionHandler};
use crate::protocol::{DEFAULT_CHUNK_SIZE, MSG_TYPE_SET_CHUNK_SIZE, RtmpMessage};
use crate::{Error, Result};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Supervises one accepted connection end-to-end: handshake, then the
/// sequential read/decode/reassemble/dispatch loop, with a write loop fed
/// by the session handler. Owns every piece of per-connection state; no
/// state is shared across connections.
pub struct Connection {
    /// Connection ID
    id: String,

    /// Read deadline covering the handshake and every chunk read
    idle_timeout: Duration,

    /// Chunk size announced to the peer for our outbound chunks
    outgoing_chunk_size: usize,

    /// Connection state
    state: ConnectionState,
}

impl Connection {
    pub fn new(id: String, idle_timeout: Duration, outgoing_chunk_size: usize) -> Self {
        Connection {
            id,
            idle_timeout,
            outgoing_chunk_size,
            state: ConnectionState::Uninitialized,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the connection until the peer disconnects or a fatal error
    /// tears it down. Consumes the supervisor; a connection never restarts.
    pub async fn run<S>(mut self, stream: S, handler: Arc<dyn SessionHandler>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut read_half, mut write_half) = tokio::io::split(stream);

        self.state = ConnectionState::Handshaking;
        timeout(
            self.idle_timeout,
            handshake::serve(&mut read_half, &mut write_half),
        )
        .await
        .map_err(|_| Error::timeout(format!("Handshake timed out on {}", self.id)))??;
        self.state = ConnectionState::Active;
        info!("Connection {} handshake complete", self.id);

        let (message_tx, message_rx) = mpsc::channel::<RtmpMessage>(64);
        let ctx: Arc<dyn SessionContext> =
            Arc::new(ConnectionContext::new(self.id.clone(), message_tx));

        let writer_task = tokio::spawn(Self::write_loop(write_half, message_rx));

        // Announce our outgoing chunk size before anything else goes out;
        // the write loop resizes itself once the message is on the wire.
        if self.outgoing_chunk_size != DEFAULT_CHUNK_SIZE as usize {
            ctx.send_message(RtmpMessage::protocol_control(
                MSG_TYPE_SET_CHUNK_SIZE,
                (self.outgoing_chunk_size as u32).to_be_bytes().to_vec(),
            ))
            .await?;
        }

        let result = self.read_loop(&mut read_half, &ctx, &handler).await;

        // Closing the socket is the only cancellation primitive: pending
        // outbound messages and in-flight reassembly are discarded.
        writer_task.abort();
        self.state = ConnectionState::Closed;
        result
    }

    /// Sequential chunk loop: every decode, reassembly step and dispatch
    /// for this connection happens here, in arrival order.
    async fn read_loop<R>(
        &mut self,
        reader: &mut R,
        ctx: &Arc<dyn SessionContext>,
        handler: &Arc<dyn SessionHandler>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk_reader = ChunkReader::new();
        let mut dispatcher = MessageDispatcher::new();

        loop {
            let outcome = timeout(self.idle_timeout, chunk_reader.read_chunk(reader))
                .await
                .map_err(|_| Error::timeout(format!("Idle read timeout on {}", self.id)))??;

            match outcome {
                ReadOutcome::Closed => {
                    debug!("Connection {} closed by peer", self.id);
                    return Ok(());
                }
                ReadOutcome::Pending => {}
                ReadOutcome::Complete(message) => {
                    match dispatcher.dispatch(message, ctx, handler).await? {
                        DispatchEffect::SetChunkSize(size) => {
                            chunk_reader.set_chunk_size(size as usize)
                        }
                        DispatchEffect::AbortChunkStream(cs_id) => {
                            chunk_reader.abort_chunk_stream(cs_id)
                        }
                        DispatchEffect::None => {}
                    }
                }
            }
        }
    }

    /// Drains the outbound channel, chunking with the current outgoing
    /// chunk size. An outbound SetChunkSize resizes the chunking once it
    /// has been written.
    async fn write_loop<W>(mut writer: W, mut messages: mpsc::Receiver<RtmpMessage>) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut chunk_writer = ChunkWriter::new();

        while let Some(message) = messages.recv().await {
            chunk_writer.write_message(&message, &mut writer).await?;

            if message.type_id() == MSG_TYPE_SET_CHUNK_SIZE && message.payload.len() >= 4 {
                let size = u32::from_be_bytes([
                    message.payload[0],
                    message.payload[1],
                    message.payload[2],
                    message.payload[3],
                ]) & 0x7FFF_FFFF;
                if size > 0 {
                    chunk_writer.set_chunk_size(size as usize);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::{C0C1, HANDSHAKE_SIZE};
    use crate::protocol::RtmpCommand;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CommandRecorder {
        commands: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SessionHandler for CommandRecorder {
        async fn on_control_event(
            &self,
            _event: crate::message::UserControlEvent,
            _ctx: Arc<dyn SessionContext>,
        ) -> Result<()> {
            Ok(())
        }

        async fn on_command(
            &self,
            _stream_id: u32,
            command: RtmpCommand,
            _ctx: Arc<dyn SessionContext>,
        ) -> Result<()> {
            self.commands.lock().await.push(command.name);
            Ok(())
        }

        async fn on_media_frame(
            &self,
            _stream_id: u32,
            _type_id: u8,
            _timestamp: u32,
            _payload: Vec<u8>,
            _ctx: Arc<dyn SessionContext>,
        ) -> Result<()> {
            Ok(())
        }

        async fn on_message(
            &self,
            _message: RtmpMessage,
            _ctx: Arc<dyn SessionContext>,
        ) -> Result<()> {
            Ok(())
        }
    }

    async fn client_handshake(client: &mut tokio::io::DuplexStream) {
        client.write_all(&C0C1::create_client().encode()).await.unwrap();
        let mut response = vec![0u8; 1 + HANDSHAKE_SIZE * 2];
        client.read_exact(&mut response).await.unwrap();
        client
            .write_all(&response[1..1 + HANDSHAKE_SIZE])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_dispatches_commands_after_handshake() {
        let (mut client, server) = tokio::io::duplex(16384);

        let recorder = Arc::new(CommandRecorder::default());
        let handler: Arc<dyn SessionHandler> = recorder.clone();
        let connection = Connection::new(
            "conn-0".to_string(),
            Duration::from_secs(5),
            DEFAULT_CHUNK_SIZE as usize,
        );
        let server_task = tokio::spawn(connection.run(server, handler));

        client_handshake(&mut client).await;

        // Single-chunk connect command on chunk stream 3
        let payload = RtmpCommand::new("connect", 1.0).encode().unwrap();
        let mut wire = vec![0x03];
        wire.extend_from_slice(&[0, 0, 0]); // timestamp
        wire.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
        wire.push(20);
        wire.extend_from_slice(&0u32.to_le_bytes());
        wire.extend_from_slice(&payload);
        client.write_all(&wire).await.unwrap();

        drop(client);
        server_task.await.unwrap().unwrap();

        assert_eq!(*recorder.commands.lock().await, vec!["connect".to_string()]);
    }

    #[tokio::test]
    async fn test_idle_timeout_is_fatal() {
        let (client, server) = tokio::io::duplex(16384);

        let handler: Arc<dyn SessionHandler> = Arc::new(CommandRecorder::default());
        let connection = Connection::new(
            "conn-1".to_string(),
            Duration::from_millis(50),
            DEFAULT_CHUNK_SIZE as usize,
        );

        // Client never sends a byte; keep it alive so there is no EOF
        let result = connection.run(server, handler).await;
        match result {
            Err(Error::Timeout(_)) => {}
            other => panic!("Expected Timeout, got {:?}", other),
        }
        drop(client);
    }
}
