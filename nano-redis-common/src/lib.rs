// SPDX-License-Identifier: Apache-2.0

//! Shared plumbing used by every other `nano-redis-*` crate: the error type,
//! process-wide atomic state, the routing/indexing hash function, wall-clock
//! helpers, and logging bootstrap.

pub mod error;
pub mod hash;
pub mod logging;
pub mod state;
pub mod time;
pub mod version;

pub use error::NanoError;
pub use version::{version, VERSION};
