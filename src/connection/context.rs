use crate::message::SessionContext;
use crate::protocol::RtmpMessage;
use crate::{Error, Result};
use tokio::sync::mpsc;

/// Concrete outbound path for one connection: messages pushed here are
/// picked up by the connection's write loop, chunked and written.
pub struct ConnectionContext {
    /// Connection ID
    connection_id: String,

    /// Feeds the write loop
    message_sender: mpsc::Sender<RtmpMessage>,
}

impl ConnectionContext {
    pub fn new(connection_id: String, message_sender: mpsc::Sender<RtmpMessage>) -> Self {
        ConnectionContext {
            connection_id,
            message_sender,
        }
    }
}

#[async_trait::async_trait]
impl SessionContext for ConnectionContext {
    async fn send_message(&self, message: RtmpMessage) -> Result<()> {
        self.message_sender
            .send(message)
            .await
            .map_err(|_| Error::connection("Outbound channel closed"))
    }

    fn connection_id(&self) -> &str {
        &self.connection_id
    }
}
