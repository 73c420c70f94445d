// SPDX-License-Identifier: Apache-2.0

//! Spins up one OS thread per shard, each running a dedicated current-thread
//! `tokio` runtime and a
//! `LocalSet` so the shard's `!Send` `Database`/`ClientRegistry` never
//! leave their owning thread. Returns the `Send`-safe `ShardHandle`s the
//! router uses to reach every shard.

use nano_redis_shard::{Shard, ShardHandle, DEFAULT_EXPIRE_BUDGET, DEFAULT_EXPIRE_TICK};
use std::sync::mpsc as std_mpsc;

/// Default task-queue capacity per shard, rounded to a power of two inside
/// `nano_redis_shard::task_queue` regardless.
const TASK_QUEUE_CAPACITY: usize = 1024;

pub struct ShardSet {
    pub handles: Vec<ShardHandle>,
    // Kept alive for the process lifetime so the shard threads' LocalSets
    // keep running; dropping this would detach, not join, the threads.
    _threads: Vec<std::thread::JoinHandle<()>>,
}

impl ShardSet {
    pub fn num_shards(&self) -> usize {
        self.handles.len()
    }
}

/// Spawns `num_shards` shard threads and blocks until every one of them has
/// installed its task-queue consumer, returning once all `ShardHandle`s are
/// ready to accept work.
pub fn spawn_shards(num_shards: usize) -> ShardSet {
    let mut handles = Vec::with_capacity(num_shards);
    let mut threads = Vec::with_capacity(num_shards);

    for id in 0..num_shards {
        let (tx, rx) = std_mpsc::channel::<ShardHandle>();
        let thread = std::thread::Builder::new()
            .name(format!("nano-redis-shard-{id}"))
            .spawn(move || {
                let shard: &'static Shard = Box::leak(Box::new(Shard::new(id)));
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .expect("failed to build shard runtime");
                let local = tokio::task::LocalSet::new();
                local.block_on(&runtime, async move {
                    let handle = nano_redis_shard::spawn(
                        shard,
                        TASK_QUEUE_CAPACITY,
                        DEFAULT_EXPIRE_TICK,
                        DEFAULT_EXPIRE_BUDGET,
                    );
                    let _ = tx.send(handle);
                    // Keep the LocalSet alive until the task queue closes
                    // (all `ShardHandle`s dropped), at which point the
                    // spawned run loop above has already exited.
                    std::future::pending::<()>().await;
                });
            })
            .expect("failed to spawn shard thread");
        handles.push(rx.recv().expect("shard thread died before reporting its handle"));
        threads.push(thread);
    }

    ShardSet {
        handles,
        _threads: threads,
    }
}
