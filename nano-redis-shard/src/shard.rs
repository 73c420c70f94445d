// SPDX-License-Identifier: Apache-2.0

use crate::client_registry::ClientRegistry;
use crate::task_queue::{task_queue, ShardTask, TaskQueueHandle};
use nano_redis_db::Database;
use std::cell::RefCell;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default interval between active-expiration ticks, and the per-slot key
/// budget sampled on each tick.
pub const DEFAULT_EXPIRE_TICK: Duration = Duration::from_millis(100);
pub const DEFAULT_EXPIRE_BUDGET: usize = 20;

/// Everything a shard owns: a `Database`, a client registry, and
/// (via the runtime loop below) a task queue consumer. `Database` holds
/// `Rc`/`RefCell` internals, so `Shard` itself is `!Send` and must never
/// leave the OS thread it was created on; that thread-confinement is
/// exactly what routes all cross-shard access through [`TaskQueueHandle`]
/// instead of direct references.
pub struct Shard {
    pub id: usize,
    pub db: RefCell<Database>,
    pub registry: RefCell<ClientRegistry>,
}

impl Shard {
    pub fn new(id: usize) -> Self {
        Shard {
            id,
            db: RefCell::new(Database::new()),
            registry: RefCell::new(ClientRegistry::new()),
        }
    }
}

/// A `Send` reference to one shard, held by the router and by every other
/// shard, used to enqueue cross-shard work. Cloning is cheap.
#[derive(Clone)]
pub struct ShardHandle {
    id: usize,
    queue: TaskQueueHandle,
}

impl ShardHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn queue(&self) -> &TaskQueueHandle {
        &self.queue
    }
}

/// Spawns the shard's task-queue consumer and active-expiration ticker as
/// a `tokio::task::LocalSet`-bound task, returning a `Send` handle other
/// shards (and the router) can enqueue work through. Must be called from
/// within a `LocalSet::run_until` on the shard's own current-thread
/// runtime.
pub fn spawn(
    shard: &'static Shard,
    queue_capacity: usize,
    expire_tick: Duration,
    expire_budget: usize,
) -> ShardHandle {
    let (handle, rx) = task_queue(queue_capacity);
    let shard_handle = ShardHandle {
        id: shard.id,
        queue: handle,
    };
    tokio::task::spawn_local(run_loop(shard, rx, expire_tick, expire_budget));
    shard_handle
}

async fn run_loop(
    shard: &Shard,
    mut rx: mpsc::Receiver<ShardTask>,
    expire_tick: Duration,
    expire_budget: usize,
) {
    let mut interval = tokio::time::interval(expire_tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            maybe_task = rx.recv() => {
                match maybe_task {
                    Some(task) => task(shard),
                    None => break,
                }
            }
            _ = interval.tick() => {
                let evicted = shard.db.borrow_mut().active_expire_cycle(expire_budget);
                if evicted > 0 {
                    tracing::trace!(shard = shard.id, evicted, "active expiration swept keys");
                }
            }
        }
    }
    tracing::debug!(shard = shard.id, "shard task queue closed, run loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use nano_redis_value::Obj;

    #[tokio::test]
    async fn spawned_shard_processes_tasks_and_exits_when_handle_dropped() {
        let shard: &'static Shard = Box::leak(Box::new(Shard::new(0)));
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let handle = spawn(shard, 8, Duration::from_millis(10), 20);
                crate::task_queue::call(handle.queue(), |shard| {
                    shard
                        .db
                        .borrow_mut()
                        .set(Obj::from_string(b"a".to_vec()), Obj::from_int(1));
                })
                .await
                .unwrap();
                assert_eq!(shard.db.borrow().size(), 1);
                drop(handle);
                tokio::task::yield_now().await;
            })
            .await;
    }
}
