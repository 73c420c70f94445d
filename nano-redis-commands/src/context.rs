// SPDX-License-Identifier: Apache-2.0

use crate::server::ConfigStore;
use nano_redis_db::Database;

/// Everything a handler needs to execute against its shard's data. Mirrors
/// the original `CommandContext`'s role of bundling "which database, which
/// connection" without exposing cross-shard internals: a handler only
/// ever sees the `Database` for the shard the router has already decided
/// owns this request (remote-shard dispatch happens one layer up, via
/// `nano_redis_shard::call`, before a handler ever runs).
///
/// `config` is `None` in unit tests and wherever a caller doesn't need
/// `CONFIG GET/SET`; the server binary supplies the shard-local store.
pub struct CommandContext<'a> {
    pub db: &'a mut Database,
    pub client_id: u64,
    pub client_name: String,
    pub config: Option<&'a mut ConfigStore>,
}

impl<'a> CommandContext<'a> {
    pub fn new(db: &'a mut Database, client_id: u64) -> Self {
        CommandContext {
            db,
            client_id,
            client_name: String::new(),
            config: None,
        }
    }

    pub fn with_config(db: &'a mut Database, client_id: u64, config: &'a mut ConfigStore) -> Self {
        CommandContext {
            db,
            client_id,
            client_name: String::new(),
            config: Some(config),
        }
    }
}
