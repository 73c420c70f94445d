// SPDX-License-Identifier: Apache-2.0

use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel returned by `Database::ttl` for a key with no expiry, or for a
/// missing key.
pub const NO_EXPIRE: i64 = -1;
pub const ABSENT: i64 = -2;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// All expiry bookkeeping in `nano-redis-db` is expressed against this
/// clock.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_positive_and_monotonic_ish() {
        let a = now_ms();
        let b = now_ms();
        assert!(a > 0);
        assert!(b >= a);
    }
}
