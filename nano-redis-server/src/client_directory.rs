// SPDX-License-Identifier: Apache-2.0

//! Process-wide map from client_id to its home shard, the one that accepted
//! the connection and owns its registry entry. `CLIENT KILL <id>` needs this
//! to route to the right shard without broadcasting to all of them.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct ClientDirectory {
    homes: Mutex<HashMap<u64, usize>>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, client_id: u64, shard_id: usize) {
        self.homes.lock().unwrap().insert(client_id, shard_id);
    }

    pub fn unregister(&self, client_id: u64) {
        self.homes.lock().unwrap().remove(&client_id);
    }

    pub fn home_shard(&self, client_id: u64) -> Option<usize> {
        self.homes.lock().unwrap().get(&client_id).copied()
    }

    pub fn all_client_ids(&self) -> Vec<u64> {
        self.homes.lock().unwrap().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_lookup_unregister_round_trip() {
        let dir = ClientDirectory::new();
        dir.register(1, 3);
        assert_eq!(dir.home_shard(1), Some(3));
        dir.unregister(1);
        assert_eq!(dir.home_shard(1), None);
    }
}
