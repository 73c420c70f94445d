// SPDX-License-Identifier: Apache-2.0

//! Per-shard database: 16 DB slots, each with a main `Dash<Obj, Obj>`
//! table and an expiry `Dash<Obj, i64>` table, lazy expiration on read, and
//! a budgeted active-expiration sweep.

use nano_redis_common::time::{now_ms, NO_EXPIRE};
use nano_redis_dash::Dash;
use nano_redis_value::Obj;

/// `SELECT` fails if the requested index is >= 16.
pub const NUM_DBS: usize = 16;

const DEFAULT_INITIAL_DEPTH: u32 = 0;
const DEFAULT_MAX_SEGMENT_SIZE: usize = 256;

/// One addressable database slot: a key/value table plus its expiry index.
pub struct DbSlot {
    pub main: Dash<Obj, Obj>,
    pub expiry: Dash<Obj, i64>,
}

impl DbSlot {
    fn new() -> Self {
        DbSlot {
            main: Dash::new(DEFAULT_INITIAL_DEPTH, DEFAULT_MAX_SEGMENT_SIZE),
            expiry: Dash::new(DEFAULT_INITIAL_DEPTH, DEFAULT_MAX_SEGMENT_SIZE),
        }
    }
}

/// The full per-shard database: `NUM_DBS` independently-addressable slots
/// and the currently `SELECT`-ed one.
pub struct Database {
    slots: Vec<DbSlot>,
    current: usize,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        let slots = (0..NUM_DBS).map(|_| DbSlot::new()).collect();
        Database { slots, current: 0 }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Fails (returns false, leaving the slot unchanged) if `i >= 16`.
    pub fn select(&mut self, i: usize) -> bool {
        if i >= NUM_DBS {
            return false;
        }
        self.current = i;
        true
    }

    pub fn slot(&self) -> &DbSlot {
        &self.slots[self.current]
    }

    pub fn slot_mut(&mut self) -> &mut DbSlot {
        &mut self.slots[self.current]
    }

    pub fn slot_at(&self, i: usize) -> Option<&DbSlot> {
        self.slots.get(i)
    }

    pub fn slot_at_mut(&mut self, i: usize) -> Option<&mut DbSlot> {
        self.slots.get_mut(i)
    }

    pub fn all_slots(&self) -> &[DbSlot] {
        &self.slots
    }

    /// Inserts into the main table, clears any existing expiry
    /// (a bare `SET` overwrites TTL, matching real Redis).
    pub fn set(&mut self, key: Obj, value: Obj) {
        let slot = self.slot_mut();
        slot.expiry.erase(&key);
        slot.main.insert(key, value);
    }

    /// Lazy-expires first, so a logically-expired key never
    /// surfaces even if the active-expiration cycle hasn't swept it yet.
    pub fn get(&mut self, key: &Obj) -> Option<std::cell::Ref<'_, Obj>> {
        self.expire_if_due(key);
        self.slot().main.find(key)
    }

    pub fn contains(&mut self, key: &Obj) -> bool {
        self.expire_if_due(key);
        self.slot().main.contains_key(key)
    }

    /// Checks (and applies) lazy expiration for one key without requiring a
    /// read afterward; used by commands that only need the side effect
    /// (e.g. `EXISTS`, `TTL`).
    pub fn expire_if_due(&mut self, key: &Obj) {
        let due = self
            .slot()
            .expiry
            .find(key)
            .map(|exp| *exp <= now_ms())
            .unwrap_or(false);
        if due {
            let slot = self.slot_mut();
            slot.main.erase(key);
            slot.expiry.erase(key);
        }
    }

    pub fn remove(&mut self, key: &Obj) -> bool {
        let slot = self.slot_mut();
        slot.expiry.erase(key);
        slot.main.erase(key)
    }

    /// Sets `expiry = now + ttl_ms` iff the main table
    /// contains the key.
    pub fn expire(&mut self, key: &Obj, ttl_ms: i64) -> bool {
        if !self.contains(key) {
            return false;
        }
        let at = now_ms().saturating_add(ttl_ms);
        self.slot_mut().expiry.insert(key.clone(), at);
        true
    }

    /// Removes the expiry entry, returns whether one was
    /// present.
    pub fn persist(&mut self, key: &Obj) -> bool {
        self.slot_mut().expiry.erase(key)
    }

    /// Remaining milliseconds, `NO_EXPIRE` (-1) if the key
    /// exists without a TTL, or `ABSENT` (-2) if the key doesn't exist.
    pub fn ttl(&mut self, key: &Obj) -> i64 {
        self.expire_if_due(key);
        if !self.slot().main.contains_key(key) {
            return nano_redis_common::time::ABSENT;
        }
        match self.slot().expiry.find(key) {
            Some(exp) => (*exp - now_ms()).max(0),
            None => NO_EXPIRE,
        }
    }

    /// Samples at most `budget` keys per slot
    /// from the expiry table and evicts elapsed ones. Idempotent, safe to
    /// call from an idle tick.
    pub fn active_expire_cycle(&mut self, budget: usize) -> usize {
        let now = now_ms();
        let mut evicted = 0;
        for slot in self.slots.iter_mut() {
            let mut sampled = 0;
            let mut expired_keys = Vec::new();
            slot.expiry.for_each(|k, exp| {
                if sampled >= budget {
                    return;
                }
                sampled += 1;
                if *exp <= now {
                    expired_keys.push(k.clone());
                }
            });
            for k in &expired_keys {
                slot.main.erase(k);
                slot.expiry.erase(k);
            }
            evicted += expired_keys.len();
        }
        evicted
    }

    /// `DBSIZE` for the current slot.
    pub fn size(&self) -> usize {
        self.slot().main.size()
    }

    /// `FLUSHDB`: empties the current slot's main and expiry tables.
    pub fn flush_current(&mut self) {
        let slot = self.slot_mut();
        slot.main.clear();
        slot.expiry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Obj {
        Obj::from_string(s.as_bytes().to_vec())
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut db = Database::new();
        db.set(key("a"), Obj::from_int(1));
        assert_eq!(*db.get(&key("a")).unwrap(), Obj::from_int(1));
    }

    #[test]
    fn set_clears_prior_expiry() {
        let mut db = Database::new();
        db.set(key("a"), Obj::from_int(1));
        db.expire(&key("a"), 1000);
        assert_ne!(db.ttl(&key("a")), NO_EXPIRE);
        db.set(key("a"), Obj::from_int(2));
        assert_eq!(db.ttl(&key("a")), NO_EXPIRE);
    }

    #[test]
    fn expired_key_lazily_disappears_on_get() {
        let mut db = Database::new();
        db.set(key("a"), Obj::from_int(1));
        db.expire(&key("a"), -1);
        assert!(db.get(&key("a")).is_none());
        assert!(!db.contains(&key("a")));
    }

    #[test]
    fn ttl_reports_absent_and_no_expire_sentinels() {
        let mut db = Database::new();
        assert_eq!(db.ttl(&key("missing")), nano_redis_common::time::ABSENT);
        db.set(key("a"), Obj::from_int(1));
        assert_eq!(db.ttl(&key("a")), NO_EXPIRE);
    }

    #[test]
    fn persist_removes_expiry_entry() {
        let mut db = Database::new();
        db.set(key("a"), Obj::from_int(1));
        db.expire(&key("a"), 100000);
        assert!(db.persist(&key("a")));
        assert_eq!(db.ttl(&key("a")), NO_EXPIRE);
    }

    #[test]
    fn select_rejects_out_of_range_index() {
        let mut db = Database::new();
        assert!(db.select(15));
        assert!(!db.select(16));
        assert_eq!(db.current_index(), 15);
    }

    #[test]
    fn active_expire_cycle_evicts_elapsed_keys_and_is_idempotent() {
        let mut db = Database::new();
        for i in 0..10 {
            db.set(key(&format!("k{i}")), Obj::from_int(i));
            db.expire(&key(&format!("k{i}")), -1);
        }
        let evicted = db.active_expire_cycle(100);
        assert_eq!(evicted, 10);
        let evicted_again = db.active_expire_cycle(100);
        assert_eq!(evicted_again, 0);
    }

    #[test]
    fn flush_current_empties_only_selected_slot() {
        let mut db = Database::new();
        db.set(key("a"), Obj::from_int(1));
        db.select(1);
        db.set(key("b"), Obj::from_int(2));
        db.select(0);
        db.flush_current();
        assert_eq!(db.size(), 0);
        db.select(1);
        assert_eq!(db.size(), 1);
    }
}
