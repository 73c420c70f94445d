// SPDX-License-Identifier: Apache-2.0

//! Admin/server commands that only need what `CommandContext` already
//! carries: the current shard's `Database` and a shard-local
//! [`ConfigStore`]. `CLIENT`'s subcommands, `SAVE`/`BGSAVE`, and `INFO`
//! all need either the client registry or cross-shard orchestration that
//! only `nano-redis-shard`/`nano-redis-server` have visibility into, so the
//! router handles those itself rather than routing them through this
//! crate's per-shard registry — see DESIGN.md.

use crate::context::CommandContext;
use crate::glob::glob_match;
use crate::reply::{array_reply, bulk_reply};
use nano_redis_common::error::{NanoError, NanoResult};
use nano_redis_common::time::now_ms;
use nano_redis_proto::{ok_reply, pong_reply};
use nano_redis_value::Obj;
use std::collections::HashMap;

/// The subset of `CONFIG GET`/`SET` surface area worth modeling: a small,
/// case-insensitive string map seeded with the handful of parameters a
/// Redis client typically probes. Unknown keys are accepted by `SET` (Redis
/// itself allows setting config keys it doesn't act on) and simply stored.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    entries: HashMap<String, String>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert("maxmemory".to_string(), "0".to_string());
        entries.insert("maxmemory-policy".to_string(), "noeviction".to_string());
        entries.insert("appendonly".to_string(), "no".to_string());
        entries.insert("save".to_string(), "".to_string());
        entries.insert("timeout".to_string(), "0".to_string());
        ConfigStore { entries }
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_matching(&self, pattern: &[u8]) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(k, _)| glob_match(pattern, k.as_bytes()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn set(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }
}

fn arg<'a>(args: &'a [Obj], i: usize) -> NanoResult<&'a Obj> {
    args.get(i)
        .ok_or_else(|| NanoError::InvalidArgument("missing argument".into()))
}

pub fn cmd_ping(_ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    match args.first() {
        Some(msg) => Ok(bulk_reply(&msg.as_string())),
        None => Ok(pong_reply()),
    }
}

pub fn cmd_time(_ctx: &mut CommandContext, _args: &[Obj]) -> NanoResult<Vec<u8>> {
    let ms = now_ms();
    let secs = ms / 1000;
    let micros = (ms % 1000) * 1000;
    Ok(array_reply(vec![
        bulk_reply(secs.to_string().as_bytes()),
        bulk_reply(micros.to_string().as_bytes()),
    ]))
}

pub fn cmd_randomkey(ctx: &mut CommandContext, _args: &[Obj]) -> NanoResult<Vec<u8>> {
    use rand::seq::IteratorRandom;
    let mut keys = Vec::new();
    ctx.db.slot().main.for_each(|k, _v| keys.push(k.as_string()));
    let mut rng = rand::thread_rng();
    Ok(match keys.into_iter().choose(&mut rng) {
        Some(k) => bulk_reply(&k),
        None => nano_redis_proto::null_bulk(),
    })
}

pub fn cmd_config_get(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let pattern = arg(args, 0)?.as_string();
    let config = ctx
        .config
        .as_deref()
        .ok_or_else(|| NanoError::Internal("config store unavailable".into()))?;
    let mut out = Vec::new();
    for (k, v) in config.get_matching(&pattern) {
        out.push(bulk_reply(k.as_bytes()));
        out.push(bulk_reply(v.as_bytes()));
    }
    Ok(array_reply(out))
}

pub fn cmd_config_set(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.as_string();
    let value = arg(args, 1)?.as_string();
    let config = ctx
        .config
        .as_deref_mut()
        .ok_or_else(|| NanoError::Internal("config store unavailable".into()))?;
    config.set(
        String::from_utf8_lossy(&key).into_owned(),
        String::from_utf8_lossy(&value).into_owned(),
    );
    Ok(ok_reply())
}

pub fn cmd_config_resetstat(_ctx: &mut CommandContext, _args: &[Obj]) -> NanoResult<Vec<u8>> {
    Ok(ok_reply())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nano_redis_db::Database;

    fn s(text: &str) -> Obj {
        Obj::from_string(text.as_bytes().to_vec())
    }

    #[test]
    fn ping_without_message_is_pong() {
        let mut db = Database::new();
        let mut c = CommandContext::new(&mut db, 1);
        assert_eq!(cmd_ping(&mut c, &[]).unwrap(), b"+PONG\r\n");
    }

    #[test]
    fn ping_with_message_echoes_it() {
        let mut db = Database::new();
        let mut c = CommandContext::new(&mut db, 1);
        assert_eq!(cmd_ping(&mut c, &[s("hello")]).unwrap(), bulk_reply(b"hello"));
    }

    #[test]
    fn config_get_and_set_roundtrip() {
        let mut db = Database::new();
        let mut config = ConfigStore::new();
        let mut c = CommandContext::with_config(&mut db, 1, &mut config);
        cmd_config_set(&mut c, &[s("maxmemory"), s("100mb")]).unwrap();
        let reply = cmd_config_get(&mut c, &[s("maxmemory")]).unwrap();
        assert_eq!(reply, array_reply(vec![bulk_reply(b"maxmemory"), bulk_reply(b"100mb")]));
    }

    #[test]
    fn config_get_without_store_errors() {
        let mut db = Database::new();
        let mut c = CommandContext::new(&mut db, 1);
        assert!(cmd_config_get(&mut c, &[s("*")]).is_err());
    }
}
