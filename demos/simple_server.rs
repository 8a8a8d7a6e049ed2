// Minimal RTMP chunk-layer server: accepts connections, completes the
// handshake, and logs every reassembled message. Commands get a canned
// _result so encoders can progress past connect/createStream.
//
// Usage:
//   cargo run --example simple_server

use log::{info, warn};
use rtmpframe::{
    Amf0Value, DEFAULT_WINDOW_SIZE, MSG_TYPE_SET_PEER_BW, MSG_TYPE_WINDOW_ACK, Result,
    RtmpCommand, RtmpData, RtmpMessage, RtmpServer, ServerConfig, SessionContext, SessionHandler,
    UserControlEvent,
};
use std::sync::Arc;

struct LoggingHandler;

#[async_trait::async_trait]
impl SessionHandler for LoggingHandler {
    async fn on_control_event(
        &self,
        event: UserControlEvent,
        ctx: Arc<dyn SessionContext>,
    ) -> Result<()> {
        info!(
            "[{}] user control event type {}",
            ctx.connection_id(),
            event.event_type
        );
        Ok(())
    }

    async fn on_command(
        &self,
        stream_id: u32,
        command: RtmpCommand,
        ctx: Arc<dyn SessionContext>,
    ) -> Result<()> {
        info!(
            "[{}] command '{}' (transaction {}) on stream {}",
            ctx.connection_id(),
            command.name,
            command.transaction_id,
            stream_id
        );

        if command.name == "connect" {
            // Bandwidth negotiation ahead of the connect result
            ctx.send_message(RtmpMessage::protocol_control(
                MSG_TYPE_WINDOW_ACK,
                DEFAULT_WINDOW_SIZE.to_be_bytes().to_vec(),
            ))
            .await?;
            let mut peer_bw = DEFAULT_WINDOW_SIZE.to_be_bytes().to_vec();
            peer_bw.push(2); // dynamic limit
            ctx.send_message(RtmpMessage::protocol_control(MSG_TYPE_SET_PEER_BW, peer_bw))
                .await?;
        }

        let response = match command.name.as_str() {
            "connect" => Some(RtmpCommand::result(
                command.transaction_id,
                vec![
                    (
                        "fmsVer".to_string(),
                        Amf0Value::String("FMS/3,0,1,123".to_string()),
                    ),
                    ("capabilities".to_string(), Amf0Value::Number(31.0)),
                ],
                Amf0Value::Object(vec![
                    (
                        "level".to_string(),
                        Amf0Value::String("status".to_string()),
                    ),
                    (
                        "code".to_string(),
                        Amf0Value::String("NetConnection.Connect.Success".to_string()),
                    ),
                ]),
            )),
            "createStream" => Some(RtmpCommand::result(
                command.transaction_id,
                Vec::new(),
                Amf0Value::Number(1.0),
            )),
            _ => None,
        };

        if let Some(response) = response {
            ctx.send_message(RtmpMessage::command(stream_id, response.encode()?))
                .await?;
        }

        Ok(())
    }

    async fn on_media_frame(
        &self,
        stream_id: u32,
        type_id: u8,
        timestamp: u32,
        payload: Vec<u8>,
        ctx: Arc<dyn SessionContext>,
    ) -> Result<()> {
        info!(
            "[{}] media frame type {} on stream {} at {}ms ({} bytes)",
            ctx.connection_id(),
            type_id,
            stream_id,
            timestamp,
            payload.len()
        );
        Ok(())
    }

    async fn on_message(&self, message: RtmpMessage, ctx: Arc<dyn SessionContext>) -> Result<()> {
        // Data messages are forwarded verbatim; show the structured view
        // when they decode
        match RtmpData::decode(&message.payload) {
            Ok(data) => info!(
                "[{}] data message '{}' with {} values",
                ctx.connection_id(),
                data.name,
                data.values.len()
            ),
            Err(_) => warn!(
                "[{}] opaque message type {} ({} bytes)",
                ctx.connection_id(),
                message.type_id(),
                message.payload.len()
            ),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ServerConfig::builder()
        .host("0.0.0.0")
        .port(1935)
        .max_connections(100)
        .chunk_size(4096)
        .build()?;

    info!("Starting RTMP server on {}:{}", config.host, config.port);

    let server = Arc::new(RtmpServer::new(config, Arc::new(LoggingHandler)));

    let server_clone = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            server_clone.shutdown().await;
        }
    });

    server.listen().await?;
    Ok(())
}
