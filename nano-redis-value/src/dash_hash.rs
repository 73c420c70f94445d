// SPDX-License-Identifier: Apache-2.0

use crate::obj::Obj;
use nano_redis_common::hash::{hash_bytes, hash_int_key, DashHash};

/// `Obj` is the key type for both the main table and the expiry table, so
/// it must hash consistently with `PartialEq`/routing: an integer-encoded
/// key and the equivalent string-encoded key hash alike.
impl DashHash for Obj {
    fn dash_hash(&self) -> u64 {
        match self {
            Obj::Int(v) => hash_int_key(*v),
            Obj::Null => hash_bytes(&[]),
            _ => hash_bytes(self.as_bytes().unwrap_or(&[])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_equivalent_string_hash_alike() {
        assert_eq!(
            Obj::from_int(42).dash_hash(),
            Obj::from_string(b"42".to_vec()).dash_hash()
        );
    }
}
