use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Addressing key for a broadcast room.
///
/// Every connected socket sits in the game-wide room; sockets that joined
/// with a team code additionally sit in their team room, which is how
/// per-team payloads (mask reveals) stay private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// All sockets watching a game.
    Game(Uuid),
    /// Sockets of a single team, keyed by its normalized join code.
    Team {
        /// Game the team belongs to.
        game_id: Uuid,
        /// Normalized (upper-cased) team code.
        code: String,
    },
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game(game_id) => write!(f, "game:{game_id}"),
            Self::Team { game_id, code } => write!(f, "game:{game_id}:team:{code}"),
        }
    }
}

/// Registry of live WebSocket connections grouped into rooms.
///
/// Connections are identified by a random [`Uuid`] minted when the socket is
/// accepted. A reverse index keeps track of which rooms each connection
/// joined so disconnects clean up in one call.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomKey, HashMap<Uuid, mpsc::UnboundedSender<Message>>>,
    memberships: DashMap<Uuid, HashSet<RoomKey>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room.
    ///
    /// Joining the same room twice just refreshes the stored sender.
    pub fn join(&self, connection_id: Uuid, key: RoomKey, tx: mpsc::UnboundedSender<Message>) {
        self.rooms
            .entry(key.clone())
            .or_default()
            .insert(connection_id, tx);
        self.memberships
            .entry(connection_id)
            .or_default()
            .insert(key);
    }

    /// Remove a connection from every room it joined.
    pub fn leave_all(&self, connection_id: Uuid) {
        let Some((_, keys)) = self.memberships.remove(&connection_id) else {
            return;
        };

        for key in keys {
            let mut emptied = false;
            if let Some(mut members) = self.rooms.get_mut(&key) {
                members.remove(&connection_id);
                emptied = members.is_empty();
            }
            if emptied {
                self.rooms.remove_if(&key, |_, members| members.is_empty());
            }
        }
    }

    /// Serialize `value` once and push it to every member of the room.
    ///
    /// Members whose writer task already dropped the channel are treated as
    /// dead connections and evicted from all rooms.
    pub fn broadcast<T>(&self, key: &RoomKey, value: &T)
    where
        T: ?Sized + Serialize,
    {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(room = %key, error = %err, "failed to serialize room broadcast");
                return;
            }
        };
        let text = Utf8Bytes::from(payload);

        let mut dead = Vec::new();
        if let Some(members) = self.rooms.get(key) {
            for (connection_id, tx) in members.iter() {
                if tx.send(Message::Text(text.clone())).is_err() {
                    dead.push(*connection_id);
                }
            }
        }

        for connection_id in dead {
            self.leave_all(connection_id);
        }
    }

    /// Number of live connections in a room. Rooms nobody joined count zero.
    pub fn member_count(&self, key: &RoomKey) -> usize {
        self.rooms
            .get(key)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Ping {
        seq: u32,
    }

    fn game_key() -> RoomKey {
        RoomKey::Game(Uuid::nil())
    }

    fn team_key(code: &str) -> RoomKey {
        RoomKey::Team {
            game_id: Uuid::nil(),
            code: code.to_owned(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member_of_the_room() {
        let registry = RoomRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.join(Uuid::new_v4(), game_key(), tx_a);
        registry.join(Uuid::new_v4(), game_key(), tx_b);

        registry.broadcast(&game_key(), &Ping { seq: 7 });

        for rx in [&mut rx_a, &mut rx_b] {
            let Some(Message::Text(text)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            assert_eq!(text.as_str(), r#"{"seq":7}"#);
        }
    }

    #[tokio::test]
    async fn team_room_does_not_leak_to_the_game_room() {
        let registry = RoomRegistry::new();
        let (team_tx, mut team_rx) = mpsc::unbounded_channel();
        let (game_tx, mut game_rx) = mpsc::unbounded_channel();
        registry.join(Uuid::new_v4(), team_key("TEAM_A"), team_tx);
        registry.join(Uuid::new_v4(), game_key(), game_tx);

        registry.broadcast(&team_key("TEAM_A"), &Ping { seq: 1 });

        assert!(team_rx.recv().await.is_some());
        assert!(game_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_connections_are_evicted_on_broadcast() {
        let registry = RoomRegistry::new();
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.join(connection_id, game_key(), tx.clone());
        registry.join(connection_id, team_key("TEAM_A"), tx);
        drop(rx);

        registry.broadcast(&game_key(), &Ping { seq: 2 });

        assert_eq!(registry.member_count(&game_key()), 0);
        assert_eq!(registry.member_count(&team_key("TEAM_A")), 0);
    }

    #[tokio::test]
    async fn leave_all_clears_every_membership() {
        let registry = RoomRegistry::new();
        let connection_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.join(connection_id, game_key(), tx.clone());
        registry.join(connection_id, team_key("TEAM_B"), tx);

        registry.leave_all(connection_id);

        assert_eq!(registry.member_count(&game_key()), 0);
        assert_eq!(registry.member_count(&team_key("TEAM_B")), 0);
    }

    #[tokio::test]
    async fn broadcast_to_an_empty_room_is_harmless() {
        let registry = RoomRegistry::new();
        registry.broadcast(&game_key(), &Ping { seq: 3 });
        assert_eq!(registry.member_count(&game_key()), 0);
    }
}
