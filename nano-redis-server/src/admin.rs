// SPDX-License-Identifier: Apache-2.0

//! Admin commands that need more than one shard's `CommandContext` can see:
//! `CLIENT LIST`/`KILL`/`PAUSE`/`INFO`, the process-wide parts of `INFO`,
//! and `SAVE`/`BGSAVE`. The router (`router.rs`) special-cases these the
//! same way it special-cases `QUIT`, dispatching here instead of through
//! `nano_redis_commands::CommandRegistry`.

use crate::client_directory::ClientDirectory;
use crate::shard_set::ShardSet;
use nano_redis_common::error::{NanoError, NanoResult};
use nano_redis_common::state::ServerState;
use nano_redis_common::time::now_ms;
use nano_redis_common::version::redis_version_field;
use nano_redis_proto::{error_reply, integer_reply, ok_reply};
use nano_redis_shard::{call, ClientInfo};
use nano_redis_value::Obj;
use std::path::PathBuf;

fn arg(args: &[Obj], i: usize) -> NanoResult<Vec<u8>> {
    args.get(i)
        .map(|o| o.as_string())
        .ok_or_else(|| NanoError::InvalidArgument("missing argument".into()))
}

/// `CLIENT LIST`: one line per connected client, gathered from every shard
/// in shard-id order, since each shard keeps its own client registry and
/// listing fans out and concatenates.
pub async fn client_list(shards: &ShardSet) -> Vec<u8> {
    let mut lines = String::new();
    for handle in &shards.handles {
        let infos: Vec<ClientInfo> = match call(handle.queue(), |shard| shard.registry.borrow().list()).await
        {
            Ok(v) => v,
            Err(_) => continue,
        };
        for info in infos {
            lines.push_str(&format!(
                "id={} addr={} name={}\n",
                info.id, info.addr, info.name
            ));
        }
    }
    nano_redis_proto::bulk_string(lines.as_bytes())
}

/// `CLIENT KILL <id>`: routes to the client's home shard via the process-wide
/// directory, since a client registry entry only exists on the shard that
/// accepted the connection.
pub async fn client_kill(shards: &ShardSet, directory: &ClientDirectory, args: &[Obj]) -> Vec<u8> {
    let target_id = match arg(args, 0).and_then(|b| {
        std::str::from_utf8(&b)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| NanoError::InvalidArgument("invalid client id".into()))
    }) {
        Ok(id) => id,
        Err(e) => return error_reply(&e.to_resp_message()),
    };
    let Some(home) = directory.home_shard(target_id) else {
        return integer_reply(0);
    };
    let Some(handle) = shards.handles.get(home) else {
        return integer_reply(0);
    };
    match call(handle.queue(), move |shard| shard.registry.borrow_mut().kill(target_id)).await {
        Ok(true) => integer_reply(1),
        Ok(false) => integer_reply(0),
        Err(e) => error_reply(&e.to_resp_message()),
    }
}

/// `CLIENT PAUSE <ms>`: sets the process-wide pause deadline.
pub fn client_pause(state: &ServerState, args: &[Obj]) -> Vec<u8> {
    let ms = match arg(args, 0).and_then(|b| {
        std::str::from_utf8(&b)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| NanoError::InvalidArgument("value is not an integer or out of range".into()))
    }) {
        Ok(ms) => ms,
        Err(e) => return error_reply(&e.to_resp_message()),
    };
    state.pause_until(now_ms().saturating_add(ms));
    ok_reply()
}

/// `CLIENT INFO`: a single line describing the requesting connection,
/// looked up on its own home shard.
pub async fn client_info(shards: &ShardSet, home_shard: usize, client_id: u64) -> Vec<u8> {
    let Some(handle) = shards.handles.get(home_shard) else {
        return error_reply("internal error: unknown home shard");
    };
    let result = call(handle.queue(), move |shard| {
        shard.registry.borrow().get(client_id).cloned()
    })
    .await;
    match result {
        Ok(Some(info)) => nano_redis_proto::bulk_string(
            format!("id={} addr={} name={}", info.id, info.addr, info.name).as_bytes(),
        ),
        Ok(None) => error_reply("internal error: client not registered"),
        Err(e) => error_reply(&e.to_resp_message()),
    }
}

/// Full `INFO` reply: a `# Server`/`# Clients` header built from
/// process-wide state, followed by a `# Keyspace` section built by polling
/// each shard's own `Database` for its key count.
pub async fn info(shards: &ShardSet, directory: &ClientDirectory, started_at_ms: i64) -> Vec<u8> {
    let mut body = String::new();
    body.push_str("# Server\r\n");
    body.push_str(&format!("redis_version:{}\r\n", redis_version_field()));
    body.push_str(&format!(
        "uptime_in_seconds:{}\r\n",
        (now_ms().saturating_sub(started_at_ms)).max(0) / 1000
    ));
    body.push_str("# Clients\r\n");
    body.push_str(&format!("connected_clients:{}\r\n", directory.all_client_ids().len()));
    body.push_str("# Keyspace\r\n");
    for handle in &shards.handles {
        let id = handle.id();
        let size = call(handle.queue(), |shard| shard.db.borrow().size()).await.unwrap_or(0);
        if size > 0 {
            body.push_str(&format!("db0_shard{id}:keys={size}\r\n"));
        }
    }
    nano_redis_proto::bulk_string(body.as_bytes())
}

fn shard_snapshot_path(dbfilename: &std::path::Path, shard_id: usize) -> PathBuf {
    let mut name = dbfilename.as_os_str().to_owned();
    name.push(format!(".{shard_id}"));
    PathBuf::from(name)
}

/// Runs one shard's `SliceSnapshot` + on-disk write, returning whether it
/// succeeded. Never panics on I/O failure; any error surfaces as a
/// SAVE/BGSAVE error reply instead.
async fn save_one_shard(
    handle: &nano_redis_shard::ShardHandle,
    num_shards: usize,
    dbfilename: &std::path::Path,
    epoch: u64,
) -> Result<(), String> {
    let path = shard_snapshot_path(dbfilename, handle.id());
    let shard_id = handle.id() as u32;
    let total = num_shards as u32;
    let timestamp_ms = now_ms() as u64;
    let result = call(handle.queue(), move |shard| {
        let entries = nano_redis_snapshot::SliceSnapshot::capture(&mut shard.db.borrow_mut(), epoch)
            .into_entries();
        nano_redis_snapshot::save_to_path(&path, shard_id, total, timestamp_ms, nano_redis_db::NUM_DBS as u16, entries)
            .map_err(|e| e.to_string())
    })
    .await;
    match result {
        Ok(inner) => inner,
        Err(e) => Err(e.to_resp_message()),
    }
}

/// `SAVE`: blocks the requesting connection until every shard's snapshot is
/// written, issuing one cross-shard call per shard in turn.
pub async fn save(shards: &ShardSet, state: &ServerState, dbfilename: &std::path::Path) -> Vec<u8> {
    let epoch = state.next_snapshot_epoch();
    for handle in &shards.handles {
        if let Err(e) = save_one_shard(handle, shards.num_shards(), dbfilename, epoch).await {
            tracing::warn!(shard = handle.id(), error = %e, "SAVE failed for shard");
            return error_reply(&format!("snapshot failed: {e}"));
        }
    }
    ok_reply()
}

/// `BGSAVE`: rejects a concurrent background save, otherwise spawns the
/// same per-shard snapshot work without blocking the caller's reply.
pub fn bgsave(
    shards: ShardHandleList,
    state: std::sync::Arc<ServerState>,
    dbfilename: PathBuf,
) -> Vec<u8> {
    if !state.try_begin_bg_save() {
        return error_reply("BGSAVE already in progress");
    }
    let epoch = state.next_snapshot_epoch();
    let num_shards = shards.len();
    tokio::spawn(async move {
        for handle in &shards {
            if let Err(e) = save_one_shard(handle, num_shards, &dbfilename, epoch).await {
                tracing::warn!(shard = handle.id(), error = %e, "BGSAVE failed for shard");
            }
        }
        state.end_bg_save();
        tracing::info!("BGSAVE finished");
    });
    nano_redis_proto::simple_string("Background saving started")
}

pub type ShardHandleList = Vec<nano_redis_shard::ShardHandle>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_snapshot_path_appends_shard_suffix() {
        let p = shard_snapshot_path(std::path::Path::new("dump.nrdb"), 3);
        assert_eq!(p, PathBuf::from("dump.nrdb.3"));
    }
}
