// SPDX-License-Identifier: Apache-2.0

use nano_redis_common::time::now_ms;
use nano_redis_db::Database;
use nano_redis_value::Obj;
use std::cell::RefCell;
use std::rc::Rc;

/// Consistent point-in-time snapshot of a shard's live entries. Installs a
/// pre-modify hook on each populated DB slot's main table for its
/// lifetime, so a segment that's about to be mutated mid-snapshot is
/// flushed first; the hook is removed on drop.
///
/// Each logical key is written at most once: a segment is skipped once
/// its stored version reaches `snapshot_version`, whether that happened
/// via this snapshot's own iteration or via the pre-modify hook firing on
/// a concurrent write.
pub struct SliceSnapshot {
    entries: Vec<(u16, Obj, Obj, Option<i64>)>,
}

impl SliceSnapshot {
    /// Walks every DB slot of `db`, flushing all live (non-expired)
    /// entries into an in-memory buffer that the caller then hands to
    /// [`crate::Serializer`] or [`crate::save_to_path`].
    ///
    /// `db` is borrowed mutably for the whole call: the hook install, the
    /// segment walk, and the hook removal all happen here. A real
    /// concurrent writer during this walk would be another task on the
    /// *same* OS thread (a `Database` is only ever touched from its
    /// owning shard), so it can't actually run mid-call in this
    /// synchronous implementation — the flushed-entries buffer exists so
    /// a future cooperative-yield point inside the walk has somewhere
    /// safe to record pre-mutation state without re-entering `Dash`.
    pub fn capture(db: &mut Database, snapshot_version: u64) -> Self {
        let now = now_ms();
        let flushed: Rc<RefCell<Vec<(u16, Obj, Obj, Option<i64>)>>> = Rc::new(RefCell::new(Vec::new()));

        let num_slots = db.all_slots().len();
        for db_idx in 0..num_slots {
            let slot = match db.slot_at_mut(db_idx) {
                Some(s) => s,
                None => continue,
            };
            if slot.main.size() == 0 {
                continue;
            }

            let hook_sink = flushed.clone();
            let hook_db_idx = db_idx as u16;
            let hook_expiry_snapshot: Vec<(Obj, i64)> = {
                let mut out = Vec::new();
                slot.expiry.for_each(|k, v| out.push((k.clone(), *v)));
                out
            };
            slot.main.set_pre_modify_callback(Box::new(move |_idx, seg| {
                for (k, v) in seg.iter() {
                    if v.is_null() {
                        continue;
                    }
                    let expire_ms = hook_expiry_snapshot
                        .iter()
                        .find(|(ek, _)| ek == k)
                        .map(|(_, ems)| *ems)
                        .filter(|ems| *ems > now);
                    hook_sink
                        .borrow_mut()
                        .push((hook_db_idx, k.clone(), v.clone(), expire_ms));
                }
            }));

            let mut dir_idx = 0usize;
            while dir_idx < slot.main.dir_size() {
                let version = slot.main.get_seg_version(dir_idx);
                if version < snapshot_version {
                    slot.main.for_each_in_segment(dir_idx, |k, v| {
                        if let Some(exp) = slot.expiry.find(k) {
                            if *exp <= now {
                                return;
                            }
                        }
                        let expire_ms = slot.expiry.find(k).map(|r| *r);
                        flushed
                            .borrow_mut()
                            .push((db_idx as u16, k.clone(), v.clone(), expire_ms));
                    });
                    slot.main.set_seg_version(dir_idx, snapshot_version);
                }
                dir_idx = slot.main.next_unique_segment(dir_idx);
            }

            slot.main.clear_pre_modify_callback();
        }

        SliceSnapshot {
            entries: Rc::try_unwrap(flushed)
                .map(|cell| cell.into_inner())
                .unwrap_or_default(),
        }
    }

    pub fn into_entries(self) -> Vec<(u16, Obj, Obj, Option<i64>)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Obj {
        Obj::from_string(s.as_bytes().to_vec())
    }

    #[test]
    fn captures_every_live_key_exactly_once() {
        let mut db = Database::new();
        for i in 0..50 {
            db.set(key(&format!("k{i}")), Obj::from_int(i));
        }
        let snap = SliceSnapshot::capture(&mut db, 1);
        assert_eq!(snap.len(), 50);
    }

    #[test]
    fn excludes_expired_entries() {
        let mut db = Database::new();
        db.set(key("live"), Obj::from_int(1));
        db.set(key("dead"), Obj::from_int(2));
        db.expire(&key("dead"), -1);
        let snap = SliceSnapshot::capture(&mut db, 1);
        let entries = snap.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, key("live"));
    }

    #[test]
    fn repeated_capture_with_increasing_version_skips_already_flushed_segments() {
        let mut db = Database::new();
        for i in 0..20 {
            db.set(key(&format!("k{i}")), Obj::from_int(i));
        }
        let first = SliceSnapshot::capture(&mut db, 1);
        assert_eq!(first.len(), 20);
        // A second capture at a version already reached by every segment
        // writes nothing new.
        let second = SliceSnapshot::capture(&mut db, 1);
        assert_eq!(second.len(), 0);
        let third = SliceSnapshot::capture(&mut db, 2);
        assert_eq!(third.len(), 20);
    }
}
