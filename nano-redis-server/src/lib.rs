// SPDX-License-Identifier: Apache-2.0

//! Library half of the `nano-redis-server` binary, split out so
//! `tests/` can drive the router and shard set directly instead of only
//! through the compiled binary.

pub mod admin;
pub mod cli;
pub mod client_directory;
pub mod router;
pub mod shard_set;
