// SPDX-License-Identifier: Apache-2.0

//! Process-wide mutable state, encapsulated behind a small struct rather
//! than bare module-level statics.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Atomics shared by every shard in the process: the monotonic client-id
/// counter, the snapshot epoch, the background-save guard, the pause
/// deadline, and the shutdown flag.
#[derive(Debug, Default)]
pub struct ServerState {
    next_client_id: AtomicU64,
    snapshot_epoch: AtomicU64,
    bg_save_in_progress: AtomicBool,
    pause_until_ms: AtomicI64,
    shutting_down: AtomicBool,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            next_client_id: AtomicU64::new(1),
            snapshot_epoch: AtomicU64::new(0),
            bg_save_in_progress: AtomicBool::new(false),
            pause_until_ms: AtomicI64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Assigns the next monotonically increasing client id.
    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns a strictly-increasing snapshot version/epoch.
    pub fn next_snapshot_epoch(&self) -> u64 {
        self.snapshot_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_snapshot_epoch(&self) -> u64 {
        self.snapshot_epoch.load(Ordering::SeqCst)
    }

    /// Attempts to claim the BGSAVE slot; returns `false` if one is already
    /// in flight.
    pub fn try_begin_bg_save(&self) -> bool {
        self.bg_save_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_bg_save(&self) {
        self.bg_save_in_progress.store(false, Ordering::SeqCst);
    }

    pub fn bg_save_in_progress(&self) -> bool {
        self.bg_save_in_progress.load(Ordering::SeqCst)
    }

    /// Pauses client request processing until `until_ms` (CLIENT PAUSE).
    pub fn pause_until(&self, until_ms: i64) {
        self.pause_until_ms.store(until_ms, Ordering::SeqCst);
    }

    /// Whether the router should currently hold off on executing requests.
    pub fn is_paused(&self, now_ms: i64) -> bool {
        self.pause_until_ms.load(Ordering::SeqCst) > now_ms
    }

    pub fn request_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_monotonic_and_unique() {
        let state = ServerState::new();
        let a = state.next_client_id();
        let b = state.next_client_id();
        assert!(b > a);
    }

    #[test]
    fn bg_save_guard_rejects_concurrent_claims() {
        let state = ServerState::new();
        assert!(state.try_begin_bg_save());
        assert!(!state.try_begin_bg_save());
        state.end_bg_save();
        assert!(state.try_begin_bg_save());
    }

    #[test]
    fn pause_until_gates_on_wall_clock() {
        let state = ServerState::new();
        state.pause_until(1_000);
        assert!(state.is_paused(500));
        assert!(!state.is_paused(1_000));
        assert!(!state.is_paused(1_500));
    }
}
