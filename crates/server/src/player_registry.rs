//! Shared player registry: who is online, plus the durable name ↔ id map.
//!
//! `PlayerId`s are allocated once per name and survive disconnects for the
//! lifetime of the server run, so bulk undo can still target the BlockDB
//! entries of a player who already left.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use ashlar_engine::PlayerId;

/// A currently connected player.
#[derive(Clone, Debug)]
pub struct PlayerInfo {
    pub conn_id: u64,
    pub player_id: PlayerId,
    pub name: String,
    pub rank_name: String,
}

/// Thread-safe registry of connected players and every name seen this run.
///
/// Uses `std::sync::RwLock` because every operation is brief (no awaits while
/// the lock is held) and the access pattern is read-heavy.
pub struct PlayerRegistry {
    online: RwLock<HashMap<u64, PlayerInfo>>,
    /// Lowercased name -> stable id, for everyone who ever connected.
    known: RwLock<HashMap<String, PlayerId>>,
    /// Reverse map, keeping the display capitalization of first login.
    display: RwLock<HashMap<PlayerId, String>>,
    next_id: AtomicU32,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            online: RwLock::new(HashMap::new()),
            known: RwLock::new(HashMap::new()),
            display: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Register a connection under `name`, reusing the id of a returning
    /// player. Fails if the name is already online.
    pub fn register(
        &self,
        conn_id: u64,
        name: &str,
        rank_name: &str,
    ) -> Result<PlayerInfo, String> {
        let key = name.to_ascii_lowercase();
        if self
            .online
            .read()
            .expect("player registry poisoned")
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(name))
        {
            return Err(format!("{name} is already connected"));
        }

        let player_id = {
            let mut known = self.known.write().expect("player registry poisoned");
            match known.get(&key) {
                Some(id) => *id,
                None => {
                    let id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
                    known.insert(key, id);
                    self.display
                        .write()
                        .expect("player registry poisoned")
                        .insert(id, name.to_string());
                    id
                }
            }
        };

        let info = PlayerInfo {
            conn_id,
            player_id,
            name: name.to_string(),
            rank_name: rank_name.to_string(),
        };
        self.online
            .write()
            .expect("player registry poisoned")
            .insert(conn_id, info.clone());
        tracing::info!(name, id = player_id.0, rank = rank_name, "player joined");
        Ok(info)
    }

    pub fn deregister(&self, conn_id: u64) -> Option<PlayerInfo> {
        let info = self
            .online
            .write()
            .expect("player registry poisoned")
            .remove(&conn_id);
        if let Some(info) = &info {
            tracing::info!(name = %info.name, "player left");
        }
        info
    }

    /// Stable id for a name, online or not. `None` means the name has never
    /// connected this run.
    pub fn resolve_name(&self, name: &str) -> Option<PlayerId> {
        self.known
            .read()
            .expect("player registry poisoned")
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    pub fn display_name(&self, id: PlayerId) -> Option<String> {
        self.display
            .read()
            .expect("player registry poisoned")
            .get(&id)
            .cloned()
    }

    /// Snapshot of all currently connected players.
    pub fn snapshot(&self) -> Vec<PlayerInfo> {
        self.online
            .read()
            .expect("player registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.online.read().expect("player registry poisoned").len()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_across_reconnects() {
        let registry = PlayerRegistry::new();
        let first = registry.register(1, "Mina", "builder").unwrap();
        registry.deregister(1);
        let second = registry.register(2, "mina", "builder").unwrap();
        assert_eq!(first.player_id, second.player_id);
        assert_eq!(registry.display_name(first.player_id).as_deref(), Some("Mina"));
    }

    #[test]
    fn duplicate_online_names_are_rejected() {
        let registry = PlayerRegistry::new();
        registry.register(1, "Mina", "builder").unwrap();
        assert!(registry.register(2, "MINA", "builder").is_err());
    }

    #[test]
    fn departed_players_still_resolve() {
        let registry = PlayerRegistry::new();
        let info = registry.register(1, "Ghost", "builder").unwrap();
        registry.deregister(1);
        assert_eq!(registry.player_count(), 0);
        assert_eq!(registry.resolve_name("ghost"), Some(info.player_id));
        assert_eq!(registry.resolve_name("stranger"), None);
    }
}
