use crate::connection::Connection;
use crate::message::SessionHandler;
use crate::server::config::ServerConfig;
use crate::server::context::ServerContext;
use crate::{Error, Result};
use log::{error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

/// Accepts connections and spawns one isolated Connection supervisor per
/// client. The session handler is the external collaborator every
/// connection forwards its messages to.
pub struct RtmpServer {
    /// Server configuration
    config: Arc<ServerConfig>,

    /// Accept-side bookkeeping
    context: Arc<ServerContext>,

    /// External collaborator shared by all connections
    handler: Arc<dyn SessionHandler>,

    /// Live connections by id
    active: Arc<RwLock<HashMap<String, SocketAddr>>>,

    /// Shutdown flag
    shutdown: Arc<RwLock<bool>>,
}

impl RtmpServer {
    pub fn new(config: ServerConfig, handler: Arc<dyn SessionHandler>) -> Self {
        let config = Arc::new(config);
        let context = Arc::new(ServerContext::new(config.clone()));

        RtmpServer {
            config,
            context,
            handler,
            active: Arc::new(RwLock::new(HashMap::new())),
            shutdown: Arc::new(RwLock::new(false)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept loop; returns once shutdown() has been called
    pub async fn listen(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::connection(format!("Failed to bind {}: {}", addr, e)))?;

        info!("RTMP server listening on {}", addr);

        loop {
            if *self.shutdown.read().await {
                break;
            }

            let (stream, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept error: {}", e);
                    continue;
                }
            };

            if self.active.read().await.len() >= self.config.max_connections {
                warn!("Connection limit reached, rejecting {}", peer_addr);
                drop(stream);
                continue;
            }

            if !self.context.can_accept_from_ip(peer_addr.ip()).await {
                warn!("Per-IP limit reached for {}, rejecting", peer_addr.ip());
                drop(stream);
                continue;
            }

            self.spawn_connection(stream, peer_addr).await;
        }

        info!("Server stopped");
        Ok(())
    }

    async fn spawn_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on {}: {}", peer_addr, e);
        }

        let conn_id = self.context.generate_connection_id();
        info!("Connection {} accepted from {}", conn_id, peer_addr);

        let ip = peer_addr.ip();
        self.context.increment_ip_count(ip).await;
        self.active.write().await.insert(conn_id.clone(), peer_addr);

        let connection = Connection::new(
            conn_id.clone(),
            self.config.idle_timeout,
            self.config.chunk_size as usize,
        );

        let handler = self.handler.clone();
        let context = self.context.clone();
        let active = self.active.clone();

        tokio::spawn(async move {
            // A fatal error here closes this connection only
            if let Err(e) = connection.run(stream, handler).await {
                error!("Connection {} error: {}", conn_id, e);
            }

            active.write().await.remove(&conn_id);
            context.decrement_ip_count(ip).await;
            info!("Connection {} closed", conn_id);
        });
    }

    /// Stop accepting; established connections run until their sockets
    /// close.
    pub async fn shutdown(&self) {
        info!("Shutting down server");
        *self.shutdown.write().await = true;
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.active.read().await.len()
    }
}
