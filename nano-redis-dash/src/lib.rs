// SPDX-License-Identifier: Apache-2.0

//! The extendible-hash table ("Dash"): a directory of segment references
//! plus the segments themselves, supporting directory doubling and local
//! segment splits without a global rehash.
//!
//! Segments are `Rc<RefCell<Segment<K, V>>>` rather than raw owned slots:
//! multiple directory entries legitimately alias the same segment after a
//! split, and the shard this table lives in is single-threaded (no
//! `Database` is ever touched from a thread other than its owning shard's),
//! so `Rc`/`RefCell` is the right-weight tool rather than `Arc`/`Mutex`.

mod segment;

pub use segment::Segment;

use nano_redis_common::hash::DashHash;
use std::cell::RefCell;
use std::rc::Rc;

/// Load factor at which a segment is split.
const SPLIT_LOAD_FACTOR: f64 = 0.8;

type SegRef<K, V> = Rc<RefCell<Segment<K, V>>>;

/// Callback invoked immediately before a segment's inner map is mutated by
/// `insert`/`erase`. Receives the directory index and a read-only view of
/// the segment about to change, so it can flush/serialize the pre-mutation
/// state without re-entering the table itself.
pub type PreModifyHook<K, V> = Box<dyn FnMut(usize, &Segment<K, V>)>;

pub struct Dash<K, V> {
    global_depth: u32,
    directory: Vec<SegRef<K, V>>,
    max_segment_size: usize,
    pre_modify: Option<PreModifyHook<K, V>>,
}

impl<K, V> Dash<K, V>
where
    K: DashHash + std::hash::Hash + Eq,
{
    /// Creates a table with a directory of size `2^initial_depth`, all
    /// slots initially referencing one empty, under-split segment.
    pub fn new(initial_depth: u32, max_segment_size: usize) -> Self {
        assert!(initial_depth <= 64, "initial depth exceeds 64 bits");
        let dir_size = 1usize << initial_depth;
        let segment = Rc::new(RefCell::new(Segment::new(0, 0, 0)));
        Dash {
            global_depth: initial_depth,
            directory: vec![segment; dir_size],
            max_segment_size: max_segment_size.max(1),
            pre_modify: None,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(0, 256)
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    pub fn dir_size(&self) -> usize {
        self.directory.len()
    }

    fn seg_index_for_hash(&self, hash: u64) -> usize {
        if self.global_depth == 0 {
            0
        } else {
            (hash >> (64 - self.global_depth)) as usize
        }
    }

    /// Computes the owning segment, fires the pre-modify hook, inserts or
    /// assigns, then splits (possibly repeatedly) while overloaded.
    pub fn insert(&mut self, key: K, value: V) {
        let hash = key.dash_hash();
        let seg_idx = self.seg_index_for_hash(hash);
        let seg_rc = self.directory[seg_idx].clone();

        if let Some(hook) = self.pre_modify.as_mut() {
            let seg_ref = seg_rc.borrow();
            hook(seg_idx, &seg_ref);
        }
        seg_rc.borrow_mut().map.insert(key, value);

        loop {
            let seg_idx = self.seg_index_for_hash(hash);
            let seg_rc = self.directory[seg_idx].clone();
            let len = seg_rc.borrow().map.len();
            let threshold = ((self.max_segment_size as f64) * SPLIT_LOAD_FACTOR) as usize;
            if len >= threshold.max(1) {
                self.split_segment(seg_idx);
            } else {
                break;
            }
        }
    }

    pub fn find(&self, key: &K) -> Option<std::cell::Ref<'_, V>> {
        let seg_idx = self.seg_index_for_hash(key.dash_hash());
        let seg_ref = self.directory[seg_idx].borrow();
        std::cell::Ref::filter_map(seg_ref, |seg| seg.map.get(key)).ok()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let seg_idx = self.seg_index_for_hash(key.dash_hash());
        self.directory[seg_idx].borrow().map.contains_key(key)
    }

    /// Fires the pre-modify hook before removing the entry.
    pub fn erase(&mut self, key: &K) -> bool {
        let seg_idx = self.seg_index_for_hash(key.dash_hash());
        let seg_rc = self.directory[seg_idx].clone();
        if let Some(hook) = self.pre_modify.as_mut() {
            let seg_ref = seg_rc.borrow();
            hook(seg_idx, &seg_ref);
        }
        seg_rc.borrow_mut().map.remove(key).is_some()
    }

    /// Total live entry count, summed over unique segments only (directory
    /// size may exceed segment count due to aliasing).
    pub fn size(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.directory.len() {
            let seg = self.directory[i].borrow();
            total += seg.map.len();
            i = self.next_unique_segment_locked(i, &seg);
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Empties every segment but keeps the directory structure. Does not
    /// fire the pre-modify hook — that hook fences per-entry mutation
    /// during an in-flight snapshot, and `FLUSHDB`-style whole-table clears
    /// invalidate the snapshot's premise entirely rather than needing a
    /// partial flush.
    pub fn clear(&mut self) {
        let mut i = 0;
        while i < self.directory.len() {
            let local_depth = {
                let mut seg = self.directory[i].borrow_mut();
                seg.map.clear();
                seg.local_depth
            };
            i += 1usize << (self.global_depth - local_depth);
        }
    }

    /// Visits every live `(k, v)` exactly once.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        let mut i = 0;
        while i < self.directory.len() {
            let seg = self.directory[i].borrow();
            for (k, v) in seg.map.iter() {
                f(k, v);
            }
            i = self.next_unique_segment_locked(i, &seg);
        }
    }

    /// Visits only the entries of the segment currently referenced at
    /// `dir_idx`, used by the snapshot engine to serialize exactly one
    /// segment.
    pub fn for_each_in_segment(&self, dir_idx: usize, mut f: impl FnMut(&K, &V)) {
        let seg = self.directory[dir_idx].borrow();
        for (k, v) in seg.map.iter() {
            f(k, v);
        }
    }

    /// The next directory index that can hold a *different* segment from
    /// the one at `dir_idx`.
    pub fn next_unique_segment(&self, dir_idx: usize) -> usize {
        let seg = self.directory[dir_idx].borrow();
        self.next_unique_segment_locked(dir_idx, &seg)
    }

    fn next_unique_segment_locked(&self, dir_idx: usize, seg: &Segment<K, V>) -> usize {
        dir_idx + (1usize << (self.global_depth - seg.local_depth))
    }

    pub fn get_seg_version(&self, dir_idx: usize) -> u64 {
        self.directory[dir_idx].borrow().version
    }

    pub fn set_seg_version(&self, dir_idx: usize, version: u64) {
        self.directory[dir_idx].borrow_mut().version = version;
    }

    pub fn segment_id(&self, dir_idx: usize) -> usize {
        self.directory[dir_idx].borrow().segment_id
    }

    pub fn local_depth(&self, dir_idx: usize) -> u32 {
        self.directory[dir_idx].borrow().local_depth
    }

    pub fn set_pre_modify_callback(&mut self, hook: PreModifyHook<K, V>) {
        self.pre_modify = Some(hook);
    }

    pub fn clear_pre_modify_callback(&mut self) {
        self.pre_modify = None;
    }

    /// Splits the segment currently at directory index `i`, doubling the
    /// directory first if the segment's local depth has caught up with the
    /// global depth.
    fn split_segment(&mut self, i: usize) {
        let local_depth = self.directory[i].borrow().local_depth;
        let i = if local_depth == self.global_depth {
            self.double_directory();
            // `double_directory` maps old position `p` to new positions
            // `{2p, 2p+1}`, both still pointing at the same segment, so `i`
            // must be remapped before `start`/`mid` are computed below.
            i * 2
        } else {
            i
        };
        let g = self.global_depth;
        let l = local_depth;
        let chunk_size = 1usize << (g - l);
        let start = i & !(chunk_size - 1);
        let mid = start + chunk_size / 2;

        let old_rc = self.directory[start].clone();
        let version = old_rc.borrow().version;
        let mut new_seg = Segment::new(l + 1, mid, version);

        let old_map = {
            let mut old_seg = old_rc.borrow_mut();
            old_seg.local_depth = l + 1;
            old_seg.segment_id = start;
            std::mem::take(&mut old_seg.map)
        };
        for (k, v) in old_map {
            let h = k.dash_hash();
            let idx = self.seg_index_for_hash(h);
            if idx >= mid && idx < start + chunk_size {
                new_seg.map.insert(k, v);
            } else {
                old_rc.borrow_mut().map.insert(k, v);
            }
        }

        let new_rc = Rc::new(RefCell::new(new_seg));
        for slot in self.directory.iter_mut().take(start + chunk_size).skip(mid) {
            *slot = new_rc.clone();
        }

        debug_assert!(self.check_directory_invariant());
    }

    fn double_directory(&mut self) {
        assert!(self.global_depth < 64, "global depth would exceed 64 bits");
        let new_len = self.directory.len() * 2;
        let mut new_dir = Vec::with_capacity(new_len);
        for seg in &self.directory {
            new_dir.push(seg.clone());
            new_dir.push(seg.clone());
        }
        self.directory = new_dir;
        self.global_depth += 1;

        let mut i = 0;
        while i < self.directory.len() {
            let local_depth = self.directory[i].borrow().local_depth;
            self.directory[i].borrow_mut().segment_id = i;
            i += 1usize << (self.global_depth - local_depth);
        }
    }

    /// Debug-only directory consistency check.
    #[cfg(debug_assertions)]
    fn check_directory_invariant(&self) -> bool {
        let mut i = 0;
        while i < self.directory.len() {
            let seg = self.directory[i].borrow();
            if seg.local_depth > self.global_depth || seg.segment_id != i {
                return false;
            }
            let span = 1usize << (self.global_depth - seg.local_depth);
            for j in i..(i + span).min(self.directory.len()) {
                if !Rc::ptr_eq(&self.directory[j], &self.directory[i]) {
                    return false;
                }
            }
            i += span;
        }
        true
    }

    #[cfg(not(debug_assertions))]
    fn check_directory_invariant(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Hash, Eq, PartialEq, Clone, Debug)]
    struct IntKey(u64);

    impl DashHash for IntKey {
        fn dash_hash(&self) -> u64 {
            // Spread bits so different keys land in different segments.
            self.0.wrapping_mul(0x9E3779B97F4A7C15)
        }
    }

    #[test]
    fn insert_and_find_round_trip() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 4);
        for i in 0..200u64 {
            dash.insert(IntKey(i), i * 2);
        }
        for i in 0..200u64 {
            assert_eq!(*dash.find(&IntKey(i)).unwrap(), i * 2);
        }
        assert_eq!(dash.size(), 200);
    }

    #[test]
    fn erase_removes_entry() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 4);
        dash.insert(IntKey(1), 10);
        assert!(dash.erase(&IntKey(1)));
        assert!(dash.find(&IntKey(1)).is_none());
        assert!(!dash.erase(&IntKey(1)));
    }

    #[test]
    fn for_each_visits_every_live_entry_exactly_once() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 4);
        for i in 0..500u64 {
            dash.insert(IntKey(i), i);
        }
        let mut seen = HashSet::new();
        let mut count = 0;
        dash.for_each(|k, _v| {
            assert!(seen.insert(k.0));
            count += 1;
        });
        assert_eq!(count, 500);
        assert_eq!(count, dash.size());
    }

    #[test]
    fn depth_invariant_holds_after_many_splits() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 4);
        for i in 0..4000u64 {
            dash.insert(IntKey(i), i);
        }
        assert!(dash.global_depth() <= 64);
        let mut i = 0;
        while i < dash.dir_size() {
            assert!(dash.local_depth(i) <= dash.global_depth());
            i = dash.next_unique_segment(i);
        }
    }

    #[test]
    fn pre_modify_hook_fires_before_mutation() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 64);
        let fired = Rc::new(RefCell::new(Vec::new()));
        let fired2 = fired.clone();
        dash.set_pre_modify_callback(Box::new(move |idx, seg| {
            fired2.borrow_mut().push((idx, seg.map.len()));
        }));
        for i in 0..10u64 {
            dash.insert(IntKey(i), i);
        }
        assert_eq!(fired.borrow().len(), 10);
        // Every hook call observed the segment *before* the insert that
        // triggered it, so lengths are non-decreasing but never see the
        // post-insert state for that same call.
        for (idx, (_, len)) in fired.borrow().iter().enumerate() {
            assert!(*len <= idx);
        }
    }

    #[test]
    fn clear_keeps_directory_but_empties_segments() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 4);
        for i in 0..100u64 {
            dash.insert(IntKey(i), i);
        }
        let dir_size_before = dash.dir_size();
        dash.clear();
        assert_eq!(dash.size(), 0);
        assert_eq!(dash.dir_size(), dir_size_before);
    }

    #[test]
    fn directory_aliasing_invariant_after_inserts() {
        let mut dash: Dash<IntKey, u64> = Dash::new(0, 4);
        for i in 0..1000u64 {
            dash.insert(IntKey(i), i);
        }
        assert!(dash.check_directory_invariant());
    }
}
