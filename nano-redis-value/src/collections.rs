// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet, VecDeque};

/// A hash value: mapping from field bytes to value bytes.
pub type HashValue = HashMap<Vec<u8>, Vec<u8>>;

/// A set value: a set of member byte strings.
pub type SetValue = HashSet<Vec<u8>>;

/// A list value: an ordered sequence of elements, backed by a deque so
/// `LPUSH`/`RPUSH`/`LPOP`/`RPOP` are O(1) at both ends.
pub type ListValue = VecDeque<super::Obj>;
