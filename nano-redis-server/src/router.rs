// SPDX-License-Identifier: Apache-2.0

//! Per-connection request loop. Each connection is "owned by the accepting
//! shard" in spirit — it's assigned a round-robin home shard at accept
//! time, used both for the client registry entry and as the fallback
//! "current shard" for key-less commands — but every dispatch (including
//! same-shard ones) goes through `nano_redis_shard::call` here, since the
//! connection task itself is an ordinary (non-shard-pinned) tokio task
//! rather than a fiber co-located with any shard's OS thread. See
//! DESIGN.md for that simplification versus a same-shard fast path.

use crate::admin::{self, ShardHandleList};
use crate::client_directory::ClientDirectory;
use crate::shard_set::ShardSet;
use nano_redis_common::hash::hash_bytes;
use nano_redis_common::state::ServerState;
use nano_redis_commands::{build_default_registry, CommandContext, CommandRegistry, ConfigStore};
use nano_redis_proto::{error_reply, ok_reply, parse_command, ParseStatus, RespBuffer};
use nano_redis_shard::{call, owning_shard};
use nano_redis_value::Obj;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Everything a connection needs that outlives any single request. `config`
/// is process-wide rather than per-shard: `CONFIG SET` from one connection
/// is visible to every other, matching real Redis, and a plain `Mutex`
/// avoids threading a shard-local store through every `Shard` for the sake
/// of one command family.
pub struct ConnectionContext {
    pub shards: Arc<ShardSet>,
    pub directory: Arc<ClientDirectory>,
    pub state: Arc<ServerState>,
    pub registry: Arc<CommandRegistry>,
    pub config: Arc<Mutex<ConfigStore>>,
    pub dbfilename: PathBuf,
    pub started_at_ms: i64,
}

impl ConnectionContext {
    pub fn new(
        shards: Arc<ShardSet>,
        directory: Arc<ClientDirectory>,
        state: Arc<ServerState>,
        dbfilename: PathBuf,
        started_at_ms: i64,
    ) -> Self {
        ConnectionContext {
            shards,
            directory,
            state,
            registry: Arc::new(build_default_registry()),
            config: Arc::new(Mutex::new(ConfigStore::new())),
            dbfilename,
            started_at_ms,
        }
    }
}

/// Runs one client connection to completion. `home_shard` is the
/// round-robin shard that owns this connection's registry entry.
pub async fn handle_connection(ctx: Arc<ConnectionContext>, mut socket: TcpStream, home_shard: usize, addr: String) {
    let client_id = ctx.state.next_client_id();
    ctx.directory.register(client_id, home_shard);
    let Some(home_handle) = ctx.shards.handles.get(home_shard).cloned() else {
        tracing::error!(home_shard, "connection assigned to an out-of-range shard");
        return;
    };
    let register_addr = addr.clone();
    let _ = call(home_handle.queue(), move |shard| {
        shard.registry.borrow_mut().register(client_id, register_addr)
    })
    .await;

    let mut buf = RespBuffer::new();
    let mut read_chunk = [0u8; 8192];
    let mut client_name = String::new();

    'connection: loop {
        loop {
            match parse_command(&mut buf) {
                Ok(ParseStatus::Command(args)) => {
                    if args.is_empty() {
                        continue;
                    }
                    let should_close = dispatch(
                        &ctx,
                        &mut socket,
                        &args,
                        client_id,
                        &mut client_name,
                        home_shard,
                    )
                    .await;
                    if should_close {
                        break 'connection;
                    }
                    if killed(&ctx, home_shard, client_id).await {
                        break 'connection;
                    }
                }
                Ok(ParseStatus::Incomplete) => break,
                Err(e) => {
                    let _ = socket.write_all(&error_reply(&e.to_string())).await;
                    break 'connection;
                }
            }
        }

        match socket.read(&mut read_chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&read_chunk[..n]),
            Err(_) => break,
        }
    }

    let _ = call(home_handle.queue(), move |shard| {
        shard.registry.borrow_mut().unregister(client_id)
    })
    .await;
    ctx.directory.unregister(client_id);
}

async fn killed(ctx: &ConnectionContext, home_shard: usize, client_id: u64) -> bool {
    let Some(handle) = ctx.shards.handles.get(home_shard) else {
        return false;
    };
    call(handle.queue(), move |shard| shard.registry.borrow().close_requested(client_id))
        .await
        .unwrap_or(false)
}

/// Executes one parsed command, writing its reply to `socket`. Returns
/// `true` if the connection should close (`QUIT`, or a fatal write error).
async fn dispatch(
    ctx: &ConnectionContext,
    socket: &mut TcpStream,
    args: &[Obj],
    client_id: u64,
    client_name: &mut String,
    home_shard: usize,
) -> bool {
    let name = args[0].as_string().to_ascii_uppercase();
    let rest = &args[1..];

    if name == b"QUIT" {
        let _ = socket.write_all(&ok_reply()).await;
        return true;
    }

    let reply = run_command(ctx, &name, rest, client_id, client_name, home_shard).await;
    socket.write_all(&reply).await.is_err()
}

async fn run_command(
    ctx: &ConnectionContext,
    name: &[u8],
    args: &[Obj],
    client_id: u64,
    client_name: &mut String,
    home_shard: usize,
) -> Vec<u8> {
    match name {
        b"CLIENT" => return client_subcommand(ctx, args, client_id, client_name, home_shard).await,
        b"SAVE" => return admin::save(&ctx.shards, &ctx.state, &ctx.dbfilename).await,
        b"BGSAVE" => {
            let handles: ShardHandleList = ctx.shards.handles.clone();
            return admin::bgsave(handles, ctx.state.clone(), ctx.dbfilename.clone());
        }
        b"INFO" => return admin::info(&ctx.shards, &ctx.directory, ctx.started_at_ms).await,
        _ => {}
    }

    // `CONFIG GET/SET/RESETSTAT` are registered under underscore-joined
    // names (the registry has no notion of subcommands), so the wire-level
    // `CONFIG <sub> ...` is rewritten before generic dispatch.
    let (dispatch_name, dispatch_args): (Vec<u8>, &[Obj]) = if name == b"CONFIG" {
        let Some(sub) = args.first().map(|o| o.as_string().to_ascii_uppercase()) else {
            return error_reply("wrong number of arguments for 'config' command");
        };
        let mut full = b"CONFIG_".to_vec();
        full.extend_from_slice(&sub);
        (full, &args[1..])
    } else {
        (name.to_vec(), args)
    };

    let owning = owning_shard(hash_bytes(&key_bytes(dispatch_args)), ctx.shards.num_shards());
    let target_id = if dispatch_args.is_empty() { home_shard } else { owning };
    let Some(target) = ctx.shards.handles.get(target_id).cloned() else {
        return error_reply("internal error: no such shard");
    };

    let dispatch_args = dispatch_args.to_vec();
    let registry = ctx.registry.clone();
    let config = ctx.config.clone();
    let client_name_owned = client_name.clone();
    let result = call(target.queue(), move |shard| {
        let mut config = config.lock().unwrap();
        let mut db = shard.db.borrow_mut();
        let mut cctx = CommandContext::with_config(&mut db, client_id, &mut config);
        cctx.client_name = client_name_owned;
        registry.execute(&dispatch_name, &dispatch_args, &mut cctx)
    })
    .await;

    match result {
        Ok(bytes) => bytes,
        Err(e) => error_reply(&e.to_resp_message()),
    }
}

/// The key a routing decision hashes on is the command's first argument;
/// a key-less command (no first argument) falls back to the connection's
/// home shard rather than hashing an empty slice.
fn key_bytes(args: &[Obj]) -> Vec<u8> {
    args.first().map(|o| o.as_string()).unwrap_or_default()
}

async fn client_subcommand(
    ctx: &ConnectionContext,
    args: &[Obj],
    client_id: u64,
    client_name: &mut String,
    home_shard: usize,
) -> Vec<u8> {
    let Some(sub) = args.first().map(|o| o.as_string().to_ascii_uppercase()) else {
        return error_reply("wrong number of arguments for 'client' command");
    };
    let rest = &args[1..];
    match sub.as_slice() {
        b"LIST" => admin::client_list(&ctx.shards).await,
        b"KILL" => admin::client_kill(&ctx.shards, &ctx.directory, rest).await,
        b"PAUSE" => admin::client_pause(&ctx.state, rest),
        b"INFO" => admin::client_info(&ctx.shards, home_shard, client_id).await,
        b"GETNAME" => {
            if client_name.is_empty() {
                nano_redis_proto::null_bulk()
            } else {
                nano_redis_proto::bulk_string(client_name.as_bytes())
            }
        }
        b"SETNAME" => {
            let Some(new_name) = rest.first().map(|o| o.as_string()) else {
                return error_reply("wrong number of arguments for 'client|setname' command");
            };
            if new_name.iter().any(|b| b.is_ascii_whitespace()) {
                return error_reply(
                    "client names cannot contain spaces, newlines or special characters",
                );
            }
            *client_name = String::from_utf8_lossy(&new_name).into_owned();
            ok_reply()
        }
        b"ID" => nano_redis_proto::integer_reply(client_id as i64),
        other => error_reply(&format!(
            "unknown subcommand '{}'",
            String::from_utf8_lossy(other)
        )),
    }
}
