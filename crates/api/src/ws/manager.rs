use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use pulseward_events::{HubError, HubEvent, VitalsHub};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
}

/// Manages all active WebSocket connections and their group memberships.
///
/// Lock order is always `connections` before `groups`.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
    /// Group name -> connection IDs.
    groups: RwLock<HashMap<String, HashSet<String>>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. Re-using an ID replaces the
    /// previous connection but keeps its group memberships.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection { sender: tx };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and drop it from every group.
    pub async fn remove(&self, conn_id: &str) {
        let mut conns = self.connections.write().await;
        conns.remove(conn_id);

        let mut groups = self.groups.write().await;
        groups.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });
    }

    /// Add a connection to a group.
    ///
    /// Idempotent. Returns `false` (and changes nothing) when the
    /// connection is not registered.
    pub async fn join(&self, conn_id: &str, group: &str) -> bool {
        let conns = self.connections.read().await;
        if !conns.contains_key(conn_id) {
            tracing::debug!(conn_id, group, "Join ignored for unknown connection");
            return false;
        }

        self.groups
            .write()
            .await
            .entry(group.to_string())
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Remove a connection from a group.
    ///
    /// Returns whether the connection was a member.
    pub async fn leave(&self, conn_id: &str, group: &str) -> bool {
        let mut groups = self.groups.write().await;
        let Some(members) = groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(conn_id);
        if members.is_empty() {
            groups.remove(group);
        }
        removed
    }

    /// Number of connections in a group.
    pub async fn group_size(&self, group: &str) -> usize {
        self.groups.read().await.get(group).map_or(0, HashSet::len)
    }

    /// Send a message to every connection in a group.
    ///
    /// Closed channels are skipped. Returns the number of connections the
    /// message was handed to.
    pub async fn send_to_group(&self, group: &str, message: Message) -> usize {
        let conns = self.connections.read().await;
        let groups = self.groups.read().await;
        let Some(members) = groups.get(group) else {
            return 0;
        };

        let mut count = 0;
        for conn_id in members {
            if let Some(conn) = conns.get(conn_id) {
                if conn.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose send channels are closed are skipped (they are
    /// cleaned up when their receive loop ends). Returns the number of
    /// connections the message was handed to.
    pub async fn broadcast(&self, message: Message) -> usize {
        let conns = self.connections.read().await;
        conns
            .values()
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear all state.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        self.groups.write().await.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VitalsHub for WsManager {
    async fn send_to_group(&self, group: &str, event: &HubEvent) -> Result<usize, HubError> {
        let text = event.to_json()?;
        Ok(WsManager::send_to_group(self, group, Message::Text(text.into())).await)
    }

    async fn broadcast(&self, event: &HubEvent) -> Result<usize, HubError> {
        let text = event.to_json()?;
        Ok(WsManager::broadcast(self, Message::Text(text.into())).await)
    }
}
