// SPDX-License-Identifier: Apache-2.0

//! The command surface and the registry that dispatches into it.
//!
//! Everything here operates purely in terms of [`CommandContext`]: a
//! handler never reaches across shards and never touches another
//! connection's state. Commands that need broader process state (the
//! per-shard client registry, cross-shard snapshot orchestration) are
//! special-cased by the router in `nano-redis-server` — see `server`'s
//! module doc comment and DESIGN.md.

mod context;
mod glob;
mod hashes;
mod lists;
mod meta;
mod registry;
mod reply;
mod server;
mod sets;
mod strings;

pub use context::CommandContext;
pub use meta::{CommandFlags, CommandMeta};
pub use registry::{build_default_registry, CommandRegistry, HandlerFn};
pub use server::ConfigStore;
