//! Room registry and connection handles.
//!
//! The registry is the single shared, mutable view of which connections are
//! in which room, and which username each connection belongs to. All methods
//! take the internal lock for the duration of one map operation only, so a
//! slow peer can never block joins or leaves for unrelated connections.
//! Reads hand out cloned snapshots; callers fan out outside the lock.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::domain::{PushError, RoomId, Timestamp, Username};

/// Unique identity of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh connection identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lightweight handle to one duplex connection.
///
/// Owns the connection's send primitive (an unbounded channel drained by the
/// connection's writer task) together with its room, username and
/// connection timestamp. Handles are cheap to clone; equality and hashing
/// go by [`ConnectionId`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    room_id: RoomId,
    username: Username,
    sender: mpsc::UnboundedSender<String>,
    connected_at: Timestamp,
}

impl ConnectionHandle {
    /// Create a handle for a freshly accepted connection
    pub fn new(
        room_id: RoomId,
        username: Username,
        sender: mpsc::UnboundedSender<String>,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            room_id,
            username,
            sender,
            connected_at,
        }
    }

    /// The connection's unique identity
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The room this connection is registered under
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The username this connection joined as
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// When the connection was accepted
    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    /// Queue a serialized frame for delivery to this connection.
    ///
    /// Fails only when the peer's writer task is gone (connection dead).
    pub fn send(&self, payload: &str) -> Result<(), PushError> {
        self.sender
            .send(payload.to_string())
            .map_err(|_| PushError::ConnectionClosed(self.id.to_string()))
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl std::hash::Hash for ConnectionHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One registered connection together with its last observed activity
struct ConnectionEntry {
    handle: ConnectionHandle,
    last_seen: Timestamp,
}

/// Per-room state: the connection set and the presence table.
///
/// Invariant: a connection id is in `connections` iff it appears under
/// exactly one username bucket in `users`.
#[derive(Default)]
struct RoomState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    users: HashMap<Username, HashSet<ConnectionId>>,
}

/// Presence summary of one active room, for the room listing endpoint
#[derive(Debug, Clone)]
pub struct RoomActivity {
    pub room_id: RoomId,
    pub connection_count: usize,
    pub users_online: Vec<Username>,
}

/// In-memory registry of rooms, connections and presence.
///
/// Constructed once at the composition root and shared by reference with
/// the session handlers, the broadcaster and the heartbeat loop. Rooms are
/// created lazily on first join and never removed; an empty room costs one
/// map entry.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomState>>,
}

impl RoomRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Register a connection under its room and username.
    ///
    /// Creates the room and the username bucket on demand. Idempotent: a
    /// second join of the same connection does not duplicate membership.
    pub async fn join(&self, handle: ConnectionHandle) {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(handle.room_id().clone()).or_default();
        room.users
            .entry(handle.username().clone())
            .or_default()
            .insert(handle.id());
        let last_seen = handle.connected_at();
        room.connections
            .entry(handle.id())
            .or_insert(ConnectionEntry { handle, last_seen });
    }

    /// Remove a connection from its room and username bucket.
    ///
    /// Returns whether the connection was actually registered; callers use
    /// this as the guard that makes teardown exactly-once. Removing an
    /// absent connection is a no-op.
    pub async fn leave(
        &self,
        room_id: &RoomId,
        username: &Username,
        connection_id: ConnectionId,
    ) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };
        let removed = room.connections.remove(&connection_id).is_some();
        if let Some(user_connections) = room.users.get_mut(username) {
            user_connections.remove(&connection_id);
            if user_connections.is_empty() {
                room.users.remove(username);
            }
        }
        removed
    }

    /// Snapshot of distinct usernames with at least one live connection.
    ///
    /// Sorted for deterministic output.
    pub async fn online_users(&self, room_id: &RoomId) -> Vec<Username> {
        let rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(room_id) else {
            return Vec::new();
        };
        let mut users: Vec<Username> = room.users.keys().cloned().collect();
        users.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        users
    }

    /// Number of live connections in the room (not distinct users)
    pub async fn connection_count(&self, room_id: &RoomId) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).map_or(0, |room| room.connections.len())
    }

    /// Cloned snapshot of the room's connections, for fan-out.
    ///
    /// The snapshot is detached from the live map: joins and leaves that
    /// happen while the caller is sending affect only future snapshots.
    pub async fn connections(&self, room_id: &RoomId) -> Vec<ConnectionHandle> {
        let rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(room_id) else {
            return Vec::new();
        };
        room.connections
            .values()
            .map(|entry| entry.handle.clone())
            .collect()
    }

    /// Cloned snapshot of every connection in every room, for the heartbeat
    pub async fn all_connections(&self) -> Vec<ConnectionHandle> {
        let rooms = self.rooms.lock().await;
        rooms
            .values()
            .flat_map(|room| room.connections.values().map(|entry| entry.handle.clone()))
            .collect()
    }

    /// Refresh a connection's last-activity timestamp
    pub async fn touch(&self, room_id: &RoomId, connection_id: ConnectionId, seen_at: Timestamp) {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get_mut(room_id)
            && let Some(entry) = room.connections.get_mut(&connection_id)
        {
            entry.last_seen = seen_at;
        }
    }

    /// A connection's last observed activity, if it is registered
    pub async fn last_seen(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Option<Timestamp> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)?
            .connections
            .get(&connection_id)
            .map(|entry| entry.last_seen)
    }

    /// Snapshot of rooms with at least one live connection
    pub async fn active_rooms(&self) -> Vec<RoomActivity> {
        let rooms = self.rooms.lock().await;
        let mut activity: Vec<RoomActivity> = rooms
            .iter()
            .filter(|(_, room)| !room.connections.is_empty())
            .map(|(room_id, room)| {
                let mut users_online: Vec<Username> = room.users.keys().cloned().collect();
                users_online.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                RoomActivity {
                    room_id: room_id.clone(),
                    connection_count: room.connections.len(),
                    users_online,
                }
            })
            .collect();
        activity.sort_by(|a, b| a.room_id.as_str().cmp(b.room_id.as_str()));
        activity
    }

    /// Check the connection-set / presence-table invariant of every room
    #[cfg(test)]
    pub(crate) async fn is_consistent(&self) -> bool {
        let rooms = self.rooms.lock().await;
        rooms.values().all(|room| {
            let in_buckets: Vec<ConnectionId> = room
                .users
                .values()
                .flat_map(|connections| connections.iter().copied())
                .collect();
            let distinct: HashSet<ConnectionId> = in_buckets.iter().copied().collect();
            // every bucketed id appears exactly once and matches the connection set
            in_buckets.len() == distinct.len()
                && distinct.len() == room.connections.len()
                && distinct
                    .iter()
                    .all(|id| room.connections.contains_key(id))
                && room.users.values().all(|connections| !connections.is_empty())
        })
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
