// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

/// One connected client, as tracked by its owning shard.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: u64,
    pub name: String,
    pub addr: String,
    pub close_requested: bool,
}

/// Per-shard registry of connected clients, keyed by client id. Supports
/// register, unregister, list (snapshot copies), and kill-by-id.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<u64, ClientInfo>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: u64, addr: String) {
        self.clients.insert(
            id,
            ClientInfo {
                id,
                name: String::new(),
                addr,
                close_requested: false,
            },
        );
    }

    pub fn unregister(&mut self, id: u64) {
        self.clients.remove(&id);
    }

    pub fn set_name(&mut self, id: u64, name: String) -> bool {
        match self.clients.get_mut(&id) {
            Some(c) => {
                c.name = name;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u64) -> Option<&ClientInfo> {
        self.clients.get(&id)
    }

    /// Returns a snapshot copy, so a caller formatting `CLIENT LIST` output
    /// doesn't hold the registry borrowed while it does.
    pub fn list(&self) -> Vec<ClientInfo> {
        let mut out: Vec<ClientInfo> = self.clients.values().cloned().collect();
        out.sort_by_key(|c| c.id);
        out
    }

    /// Marks a client for disconnection; the connection fiber checks this
    /// flag and closes at its next suspension point.
    pub fn kill(&mut self, id: u64) -> bool {
        match self.clients.get_mut(&id) {
            Some(c) => {
                c.close_requested = true;
                true
            }
            None => false,
        }
    }

    pub fn close_requested(&self, id: u64) -> bool {
        self.clients.get(&id).map(|c| c.close_requested).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_list_unregister_round_trip() {
        let mut reg = ClientRegistry::new();
        reg.register(1, "127.0.0.1:1".into());
        reg.register(2, "127.0.0.1:2".into());
        assert_eq!(reg.list().len(), 2);
        reg.unregister(1);
        assert_eq!(reg.list().len(), 1);
        assert!(reg.get(1).is_none());
    }

    #[test]
    fn kill_sets_close_requested() {
        let mut reg = ClientRegistry::new();
        reg.register(5, "x".into());
        assert!(!reg.close_requested(5));
        assert!(reg.kill(5));
        assert!(reg.close_requested(5));
        assert!(!reg.kill(999));
    }

    #[test]
    fn set_name_updates_existing_client_only() {
        let mut reg = ClientRegistry::new();
        reg.register(1, "x".into());
        assert!(reg.set_name(1, "alice".into()));
        assert_eq!(reg.get(1).unwrap().name, "alice");
        assert!(!reg.set_name(2, "bob".into()));
    }
}
