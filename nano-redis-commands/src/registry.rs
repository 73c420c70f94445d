// SPDX-License-Identifier: Apache-2.0

//! Case-insensitive command name -> (handler, meta) map. `execute` resolves
//! the command, enforces arity, invokes the handler, and renders any
//! `NanoError` as a RESP error line; unknown commands yield `-ERR unknown
//! command`.

use crate::context::CommandContext;
use crate::meta::CommandMeta;
use nano_redis_common::error::NanoResult;
use nano_redis_proto::error_reply;
use nano_redis_value::Obj;
use std::collections::HashMap;

pub type HandlerFn = fn(&mut CommandContext, &[Obj]) -> NanoResult<Vec<u8>>;

struct Entry {
    handler: HandlerFn,
    meta: CommandMeta,
}

/// Registered once at process start; no dynamic (de)registration.
pub struct CommandRegistry {
    commands: HashMap<String, Entry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        CommandRegistry {
            commands: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, handler: HandlerFn, meta: CommandMeta) {
        self.commands
            .insert(name.to_ascii_uppercase(), Entry { handler, meta });
    }

    pub fn meta(&self, name: &str) -> Option<CommandMeta> {
        self.commands.get(&name.to_ascii_uppercase()).map(|e| e.meta)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_ascii_uppercase())
    }

    /// `args` excludes the command name itself; the caller consumes
    /// `args[0]` as the command name and passes everything after it here.
    pub fn execute(&self, name: &[u8], args: &[Obj], ctx: &mut CommandContext) -> Vec<u8> {
        let upper = String::from_utf8_lossy(name).to_ascii_uppercase();
        match self.commands.get(&upper) {
            None => error_reply(&format!(
                "unknown command '{}'",
                String::from_utf8_lossy(name)
            )),
            Some(entry) => {
                if !entry.meta.arity_satisfied(args.len()) {
                    return error_reply(&format!(
                        "wrong number of arguments for '{}' command",
                        upper
                    ));
                }
                match (entry.handler)(ctx, args) {
                    Ok(reply) => reply,
                    Err(e) => error_reply(&e.to_resp_message()),
                }
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the registry of commands expressible purely in terms of
/// `CommandContext` — i.e. everything except the cross-shard/registry-wide
/// admin commands the router special-cases (see `crate::server`'s module
/// doc comment and DESIGN.md).
pub fn build_default_registry() -> CommandRegistry {
    use crate::hashes::*;
    use crate::lists::*;
    use crate::meta::CommandFlags as F;
    use crate::server::*;
    use crate::sets::*;
    use crate::strings::*;

    let mut r = CommandRegistry::new();
    let ro = F::READ_ONLY;
    let wr = F::WRITE;
    let admin = F::ADMIN;
    let no_key = F::NO_KEY;

    // Strings
    r.register("GET", cmd_get, CommandMeta::new(1, ro));
    r.register("SET", cmd_set, CommandMeta::new(-2, wr));
    r.register("DEL", cmd_del, CommandMeta::new(-1, wr));
    r.register("EXISTS", cmd_exists, CommandMeta::new(-1, ro));
    r.register("MGET", cmd_mget, CommandMeta::new(-1, ro));
    r.register("MSET", cmd_mset, CommandMeta::new(-2, wr));
    r.register("INCR", cmd_incr, CommandMeta::new(1, wr));
    r.register("DECR", cmd_decr, CommandMeta::new(1, wr));
    r.register("INCRBY", cmd_incrby, CommandMeta::new(2, wr));
    r.register("DECRBY", cmd_decrby, CommandMeta::new(2, wr));
    r.register("APPEND", cmd_append, CommandMeta::new(2, wr));
    r.register("STRLEN", cmd_strlen, CommandMeta::new(1, ro));
    r.register("GETRANGE", cmd_getrange, CommandMeta::new(3, ro));
    r.register("SETRANGE", cmd_setrange, CommandMeta::new(3, wr));
    r.register("SELECT", cmd_select, CommandMeta::new(1, no_key));
    r.register("KEYS", cmd_keys, CommandMeta::new(1, ro | no_key));
    r.register("DBSIZE", cmd_dbsize, CommandMeta::new(0, ro | no_key));
    r.register("FLUSHDB", cmd_flushdb, CommandMeta::new(0, wr | no_key | admin));

    // Hashes
    r.register("HSET", cmd_hset, CommandMeta::new(-3, wr));
    r.register("HMSET", cmd_hmset, CommandMeta::new(-3, wr));
    r.register("HGET", cmd_hget, CommandMeta::new(2, ro));
    r.register("HMGET", cmd_hmget, CommandMeta::new(-2, ro));
    r.register("HDEL", cmd_hdel, CommandMeta::new(-2, wr));
    r.register("HEXISTS", cmd_hexists, CommandMeta::new(2, ro));
    r.register("HLEN", cmd_hlen, CommandMeta::new(1, ro));
    r.register("HKEYS", cmd_hkeys, CommandMeta::new(1, ro));
    r.register("HVALS", cmd_hvals, CommandMeta::new(1, ro));
    r.register("HGETALL", cmd_hgetall, CommandMeta::new(1, ro));
    r.register("HINCRBY", cmd_hincrby, CommandMeta::new(3, wr));
    r.register("HSCAN", cmd_hscan, CommandMeta::new(-2, ro));
    r.register("HSTRLEN", cmd_hstrlen, CommandMeta::new(2, ro));
    r.register("HRANDFIELD", cmd_hrandfield, CommandMeta::new(-1, ro));

    // Sets
    r.register("SADD", cmd_sadd, CommandMeta::new(-2, wr));
    r.register("SREM", cmd_srem, CommandMeta::new(-2, wr));
    r.register("SPOP", cmd_spop, CommandMeta::new(1, wr));
    r.register("SMEMBERS", cmd_smembers, CommandMeta::new(1, ro));
    r.register("SCARD", cmd_scard, CommandMeta::new(1, ro));
    r.register("SISMEMBER", cmd_sismember, CommandMeta::new(2, ro));
    r.register("SMISMEMBER", cmd_smismember, CommandMeta::new(-2, ro));
    r.register("SINTER", cmd_sinter, CommandMeta::new(-1, ro));
    r.register("SUNION", cmd_sunion, CommandMeta::new(-1, ro));
    r.register("SDIFF", cmd_sdiff, CommandMeta::new(-1, ro));
    r.register("SSCAN", cmd_sscan, CommandMeta::new(-2, ro));
    r.register("SRANDMEMBER", cmd_srandmember, CommandMeta::new(-1, ro));
    r.register("SMOVE", cmd_smove, CommandMeta::new(3, wr));

    // Lists
    r.register("LPUSH", cmd_lpush, CommandMeta::new(-2, wr));
    r.register("RPUSH", cmd_rpush, CommandMeta::new(-2, wr));
    r.register("LPOP", cmd_lpop, CommandMeta::new(-1, wr));
    r.register("RPOP", cmd_rpop, CommandMeta::new(-1, wr));
    r.register("LLEN", cmd_llen, CommandMeta::new(1, ro));
    r.register("LINDEX", cmd_lindex, CommandMeta::new(2, ro));
    r.register("LSET", cmd_lset, CommandMeta::new(3, wr));
    r.register("LRANGE", cmd_lrange, CommandMeta::new(3, ro));
    r.register("LTRIM", cmd_ltrim, CommandMeta::new(3, wr));
    r.register("LREM", cmd_lrem, CommandMeta::new(3, wr));
    r.register("LINSERT", cmd_linsert, CommandMeta::new(4, wr));

    // Server commands expressible via CommandContext alone.
    r.register("PING", cmd_ping, CommandMeta::new(-1, ro | no_key));
    r.register("TIME", cmd_time, CommandMeta::new(0, ro | no_key));
    r.register("RANDOMKEY", cmd_randomkey, CommandMeta::new(0, ro | no_key));
    r.register("CONFIG_GET", cmd_config_get, CommandMeta::new(1, admin | no_key));
    r.register("CONFIG_SET", cmd_config_set, CommandMeta::new(2, admin | no_key));
    r.register(
        "CONFIG_RESETSTAT",
        cmd_config_resetstat,
        CommandMeta::new(0, admin | no_key),
    );

    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use nano_redis_db::Database;

    fn s(text: &str) -> Obj {
        Obj::from_string(text.as_bytes().to_vec())
    }

    #[test]
    fn unknown_command_yields_err_reply() {
        let registry = build_default_registry();
        let mut db = Database::new();
        let mut ctx = CommandContext::new(&mut db, 1);
        let reply = registry.execute(b"NOPE", &[], &mut ctx);
        assert!(reply.starts_with(b"-ERR unknown command"));
    }

    #[test]
    fn wrong_arity_is_rejected_before_the_handler_runs() {
        let registry = build_default_registry();
        let mut db = Database::new();
        let mut ctx = CommandContext::new(&mut db, 1);
        let reply = registry.execute(b"GET", &[], &mut ctx);
        assert!(reply.starts_with(b"-ERR wrong number of arguments"));
    }

    #[test]
    fn dispatch_is_case_insensitive_and_runs_the_handler() {
        let registry = build_default_registry();
        let mut db = Database::new();
        let mut ctx = CommandContext::new(&mut db, 1);
        let set_reply = registry.execute(b"set", &[s("k"), s("v")], &mut ctx);
        assert_eq!(set_reply, b"+OK\r\n");
        let get_reply = registry.execute(b"GeT", &[s("k")], &mut ctx);
        assert_eq!(get_reply, b"$1\r\nv\r\n");
    }

    #[test]
    fn wrong_type_error_renders_as_wrongtype_prefix() {
        let registry = build_default_registry();
        let mut db = Database::new();
        let mut ctx = CommandContext::new(&mut db, 1);
        registry.execute(b"HSET", &[s("h"), s("f"), s("v")], &mut ctx);
        let reply = registry.execute(b"GET", &[s("h")], &mut ctx);
        assert!(reply.starts_with(b"-WRONGTYPE"));
    }
}
