// SPDX-License-Identifier: Apache-2.0

use ahash::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};

/// Fixed seeds so that every shard and every `Dash` instance in the process
/// agrees on the same 64-bit hash for a given key. Routing and Dash
/// directory indexing both call this function, so keeping it in one place
/// is load-bearing, not stylistic.
const SEED0: u64 = 0x5bd1_e995_9e37_79b9;
const SEED1: u64 = 0x27d4_eb2f_1656_67c5;
const SEED2: u64 = 0x1656_67c5_27d4_eb2f;
const SEED3: u64 = 0x9e37_79b9_5bd1_e995;

fn build_hasher() -> RandomState {
    RandomState::with_seeds(SEED0, SEED1, SEED2, SEED3)
}

/// Hashes raw key bytes. Used for both table-routing and Dash indexing so the
/// two stay consistent modulo their respective moduli (`num_shards`,
/// `directory_size`).
pub fn hash_bytes(key: &[u8]) -> u64 {
    let mut hasher = build_hasher().build_hasher();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Hashes an integer key by its canonical decimal bytes, so an
/// integer-encoded key and its equivalent string-encoded key land in the
/// same shard and the same Dash segment.
pub fn hash_int_key(value: i64) -> u64 {
    let mut tmp = [0u8; 20];
    let bytes = format_i64(value, &mut tmp);
    hash_bytes(bytes)
}

/// Formats `value` as canonical decimal ASCII into `tmp`, returning the
/// populated suffix. Mirrors `nano_redis_value::obj::format_i64`; kept
/// duplicated here (rather than depending on `nano-redis-value`) to avoid an
/// upward dependency edge from the leaf `common` crate.
pub fn format_i64(mut value: i64, tmp: &mut [u8; 20]) -> &[u8] {
    let neg = value < 0;
    let mut i = 20;
    if value == 0 {
        i -= 1;
        tmp[i] = b'0';
    } else {
        while value != 0 {
            let digit = (value % 10).unsigned_abs() as u8;
            value /= 10;
            i -= 1;
            tmp[i] = b'0' + digit;
        }
    }
    if neg {
        i -= 1;
        tmp[i] = b'-';
    }
    &tmp[i..]
}

/// Keys stored in a `Dash` table (and routed across shards) must be able to
/// produce the one project-wide 64-bit hash. Implemented once per key type
/// in the crate that owns that type, to respect the orphan rule while
/// keeping `nano-redis-dash` generic.
pub trait DashHash {
    fn dash_hash(&self) -> u64;
}

impl DashHash for Vec<u8> {
    fn dash_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl DashHash for String {
    fn dash_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_bytes(b"foo"), hash_bytes(b"foo"));
    }

    #[test]
    fn different_keys_usually_differ() {
        assert_ne!(hash_bytes(b"foo"), hash_bytes(b"bar"));
    }

    #[test]
    fn format_i64_matches_std() {
        let mut buf = [0u8; 20];
        for v in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN] {
            let got = format_i64(v, &mut buf);
            assert_eq!(std::str::from_utf8(got).unwrap(), v.to_string());
        }
    }

    #[test]
    fn int_key_hashes_like_its_decimal_string() {
        assert_eq!(hash_int_key(42), hash_bytes(b"42"));
        assert_eq!(hash_int_key(-7), hash_bytes(b"-7"));
    }
}
