// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

/// One bucket of the extendible-hash directory. `local_depth` is the
/// number of leading hash bits this segment's directory slots share;
/// `version` is a monotonically-increasing counter bumped by the snapshot
/// engine to detect segments that changed since they were last serialized.
pub struct Segment<K, V> {
    pub(crate) local_depth: u32,
    pub(crate) segment_id: usize,
    pub(crate) version: u64,
    pub(crate) map: HashMap<K, V>,
}

impl<K, V> Segment<K, V>
where
    K: std::hash::Hash + Eq,
{
    pub(crate) fn new(local_depth: u32, segment_id: usize, version: u64) -> Self {
        Segment {
            local_depth,
            segment_id,
            version,
            map: HashMap::new(),
        }
    }

    pub fn local_depth(&self) -> u32 {
        self.local_depth
    }

    pub fn segment_id(&self) -> usize {
        self.segment_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, K, V> {
        self.map.iter()
    }
}
