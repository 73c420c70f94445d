// SPDX-License-Identifier: Apache-2.0

use crate::shard::Shard;
use nano_redis_common::error::{NanoError, NanoResult};
use tokio::sync::{mpsc, oneshot};

/// A unit of work destined for exactly one shard's owning thread. Boxed
/// `FnOnce` rather than an enum of command variants, so the hot `try_add`
/// path just stores the closure. Takes `&Shard`
/// rather than just `&mut Database` so a task can also reach the shard's
/// client registry (`CLIENT LIST`/`KILL` and friends need both). `Shard`
/// itself is `!Send`, but that's fine here: only the boxed closure's
/// *captured environment* needs to be `Send` to cross the channel, not the
/// reference it's later called with on the shard's own thread.
pub type ShardTask = Box<dyn FnOnce(&Shard) + Send + 'static>;

/// The producer half of a shard's task queue. Cheap to clone and `Send`,
/// so every shard holds one of these for every *other* shard to route
/// cross-shard work through.
#[derive(Clone)]
pub struct TaskQueueHandle {
    sender: mpsc::Sender<ShardTask>,
}

impl TaskQueueHandle {
    /// Non-blocking push, `false` when the queue is full.
    pub fn try_add(&self, task: ShardTask) -> bool {
        self.sender.try_send(task).is_ok()
    }

    /// Suspends the calling task until there's room, the cooperative
    /// equivalent of "callers yield and retry" against a bounded ring.
    pub async fn add(&self, task: ShardTask) -> NanoResult<()> {
        self.sender
            .send(task)
            .await
            .map_err(|_| NanoError::ShardContext("shard task queue is closed".into()))
    }
}

/// Creates a bounded task queue. The requested capacity is rounded up to
/// a power of two, even though `tokio::sync::mpsc`'s implementation
/// doesn't require it, to keep the externally observable backpressure
/// behavior consistent across capacities.
pub fn task_queue(requested_capacity: usize) -> (TaskQueueHandle, mpsc::Receiver<ShardTask>) {
    let capacity = requested_capacity.max(1).next_power_of_two();
    let (sender, receiver) = mpsc::channel(capacity);
    (TaskQueueHandle { sender }, receiver)
}

/// Runs `f` on the shard owning `handle` and suspends the calling task
/// until it completes, propagating `f`'s result back.
pub async fn call<F, T>(handle: &TaskQueueHandle, f: F) -> NanoResult<T>
where
    F: FnOnce(&Shard) -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel::<T>();
    let task: ShardTask = Box::new(move |shard| {
        let _ = tx.send(f(shard));
    });
    handle.add(task).await?;
    rx.await
        .map_err(|_| NanoError::ShardContext("awaited shard task was dropped before completing".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_runs_closure_against_shard_database_and_returns_value() {
        let local = tokio::task::LocalSet::new();
        let (handle, mut rx) = task_queue(4);

        local
            .run_until(async move {
                let shard: &'static Shard = Box::leak(Box::new(Shard::new(0)));
                let consumer = tokio::task::spawn_local(async move {
                    while let Some(task) = rx.recv().await {
                        task(shard);
                    }
                });

                let result = call(&handle, |shard| {
                    shard.db.borrow_mut().set(
                        nano_redis_value::Obj::from_string(b"k".to_vec()),
                        nano_redis_value::Obj::from_int(9),
                    );
                    shard.db.borrow().size()
                })
                .await
                .unwrap();
                assert_eq!(result, 1);

                drop(handle);
                consumer.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn try_add_fails_once_the_queue_is_full() {
        let (handle, _rx) = task_queue(1);
        assert!(handle.try_add(Box::new(|_shard| {})));
        assert!(!handle.try_add(Box::new(|_shard| {})));
    }
}
