use crate::server::config::ServerConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Shared accept-side bookkeeping: connection id generation and per-IP
/// connection counting. Never touched from inside a connection's loops.
pub struct ServerContext {
    /// Server configuration
    config: Arc<ServerConfig>,

    /// Connection ID counter
    connection_counter: AtomicU64,

    /// Live connection counts by client IP
    ip_counts: Arc<RwLock<HashMap<IpAddr, usize>>>,
}

impl ServerContext {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        ServerContext {
            config,
            connection_counter: AtomicU64::new(0),
            ip_counts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Generate unique connection ID
    pub fn generate_connection_id(&self) -> String {
        let id = self.connection_counter.fetch_add(1, Ordering::SeqCst);
        format!("conn-{}", id)
    }

    /// Check the per-IP connection limit
    pub async fn can_accept_from_ip(&self, ip: IpAddr) -> bool {
        let counts = self.ip_counts.read().await;
        let count = counts.get(&ip).copied().unwrap_or(0);
        count < self.config.max_connections_per_ip
    }

    pub async fn increment_ip_count(&self, ip: IpAddr) {
        let mut counts = self.ip_counts.write().await;
        *counts.entry(ip).or_insert(0) += 1;
    }

    pub async fn decrement_ip_count(&self, ip: IpAddr) {
        let mut counts = self.ip_counts.write().await;
        if let Some(count) = counts.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&ip);
            }
        }
    }
}
