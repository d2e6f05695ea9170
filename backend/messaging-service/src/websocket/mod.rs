use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

pub mod gateway;
pub mod message_types;
pub mod session;

pub use gateway::{Connection, Gateway};

/// Identity of one live connection. A user with two tabs open has two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Room member: a connection plus the channel feeding its socket.
struct Subscriber {
    connection_id: ConnectionId,
    user_id: Uuid,
    sender: UnboundedSender<String>,
}

#[derive(Default)]
struct Rooms {
    // conversation_id -> joined connections
    members: HashMap<String, Vec<Subscriber>>,
    // connection -> conversation_ids it joined
    joined: HashMap<ConnectionId, HashSet<String>>,
}

impl Rooms {
    fn detach(&mut self, room: &str, connection_id: ConnectionId) {
        if let Some(rooms) = self.joined.get_mut(&connection_id) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.joined.remove(&connection_id);
            }
        }
    }
}

/// Process-local room membership.
///
/// Both indexes live under one lock so a join can never be observed
/// half-applied by a concurrent broadcast or disconnect.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Rooms>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Joining twice is a no-op; returns whether
    /// the connection was newly added.
    pub async fn join(
        &self,
        conversation_id: &str,
        connection_id: ConnectionId,
        user_id: Uuid,
        sender: UnboundedSender<String>,
    ) -> bool {
        let mut guard = self.inner.write().await;
        let members = guard.members.entry(conversation_id.to_string()).or_default();
        if members.iter().any(|s| s.connection_id == connection_id) {
            return false;
        }
        members.push(Subscriber {
            connection_id,
            user_id,
            sender,
        });
        let total = members.len();

        guard
            .joined
            .entry(connection_id)
            .or_default()
            .insert(conversation_id.to_string());

        tracing::debug!(
            %connection_id,
            %conversation_id,
            total,
            "connection joined room"
        );
        true
    }

    pub async fn leave(&self, conversation_id: &str, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.members.get_mut(conversation_id) {
            members.retain(|s| s.connection_id != connection_id);
            if members.is_empty() {
                guard.members.remove(conversation_id);
            }
        }
        guard.detach(conversation_id, connection_id);
    }

    /// Drop every membership of a connection. Returns how many rooms it left.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> usize {
        let mut guard = self.inner.write().await;
        let Some(rooms) = guard.joined.remove(&connection_id) else {
            return 0;
        };

        for room in &rooms {
            if let Some(members) = guard.members.get_mut(room) {
                members.retain(|s| s.connection_id != connection_id);
                if members.is_empty() {
                    guard.members.remove(room);
                    tracing::debug!(conversation_id = %room, "removed empty room");
                }
            }
        }
        rooms.len()
    }

    pub async fn is_joined(&self, conversation_id: &str, connection_id: ConnectionId) -> bool {
        let guard = self.inner.read().await;
        guard
            .joined
            .get(&connection_id)
            .is_some_and(|rooms| rooms.contains(conversation_id))
    }

    /// Whether any connection of `user_id` is currently in the room.
    pub async fn has_user(&self, conversation_id: &str, user_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        guard
            .members
            .get(conversation_id)
            .is_some_and(|members| members.iter().any(|s| s.user_id == user_id))
    }

    /// Send a frame to every connection in the room except `except`.
    ///
    /// Subscribers whose channel is closed are removed. Returns the number of
    /// connections the frame was handed to.
    pub async fn broadcast(
        &self,
        conversation_id: &str,
        payload: &str,
        except: Option<ConnectionId>,
    ) -> usize {
        let mut guard = self.inner.write().await;
        let Some(members) = guard.members.get_mut(conversation_id) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        members.retain(|subscriber| {
            if Some(subscriber.connection_id) == except {
                return true;
            }
            if subscriber.sender.send(payload.to_string()).is_ok() {
                delivered += 1;
                true
            } else {
                dead.push(subscriber.connection_id);
                false
            }
        });
        let emptied = members.is_empty();

        if emptied {
            guard.members.remove(conversation_id);
        }
        if !dead.is_empty() {
            tracing::debug!(
                %conversation_id,
                dead = dead.len(),
                "pruned closed connections during broadcast"
            );
            for connection_id in dead {
                guard.detach(conversation_id, connection_id);
            }
        }
        delivered
    }

    pub async fn subscriber_count(&self, conversation_id: &str) -> usize {
        let guard = self.inner.read().await;
        guard.members.get(conversation_id).map_or(0, Vec::len)
    }

    pub async fn room_count(&self) -> usize {
        self.inner.read().await.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let conn = ConnectionId::new();
        let user = Uuid::new_v4();

        assert!(registry.join("room", conn, user, tx.clone()).await);
        assert!(!registry.join("room", conn, user, tx).await);
        assert_eq!(registry.subscriber_count("room").await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_skips_origin() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        registry.join("room", a, Uuid::new_v4(), tx_a).await;
        registry.join("room", b, Uuid::new_v4(), tx_b).await;

        assert_eq!(registry.broadcast("room", "ping", Some(a)).await, 1);
        assert_eq!(rx_b.recv().await.as_deref(), Some("ping"));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_connection_drops_all_rooms() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let conn = ConnectionId::new();
        let user = Uuid::new_v4();
        registry.join("r1", conn, user, tx.clone()).await;
        registry.join("r2", conn, user, tx).await;

        assert_eq!(registry.remove_connection(conn).await, 2);
        assert!(!registry.is_joined("r1", conn).await);
        assert!(!registry.has_user("r2", user).await);
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(registry.remove_connection(conn).await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_prunes_closed_channels() {
        let registry = ConnectionRegistry::new();
        let (tx_live, mut rx_live) = unbounded_channel();
        let (tx_dead, rx_dead) = unbounded_channel();
        let (live, dead) = (ConnectionId::new(), ConnectionId::new());
        registry.join("room", live, Uuid::new_v4(), tx_live).await;
        registry.join("room", dead, Uuid::new_v4(), tx_dead).await;
        drop(rx_dead);

        assert_eq!(registry.broadcast("room", "hello", None).await, 1);
        assert_eq!(rx_live.recv().await.as_deref(), Some("hello"));
        assert_eq!(registry.subscriber_count("room").await, 1);
        assert!(!registry.is_joined("room", dead).await);
    }

    #[tokio::test]
    async fn test_leave_keeps_other_rooms() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let conn = ConnectionId::new();
        registry.join("r1", conn, Uuid::new_v4(), tx.clone()).await;
        registry.join("r2", conn, Uuid::new_v4(), tx).await;

        registry.leave("r1", conn).await;
        assert!(!registry.is_joined("r1", conn).await);
        assert!(registry.is_joined("r2", conn).await);
        assert_eq!(registry.subscriber_count("r1").await, 0);
    }
}
