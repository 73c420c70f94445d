// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use std::path::PathBuf;

/// CLI flags: `--port`, `--num_shards`, `--tcp_nodelay`,
/// `--use_iouring_tcp_server`, `--photon_handler_stack_kb`.
#[derive(Parser, Debug, Clone)]
#[command(name = "nano-redis-server", version = nano_redis_common::VERSION)]
pub struct Cli {
    #[arg(long, default_value_t = 9527)]
    pub port: u16,

    /// 1 selects single-shard mode.
    #[arg(long, default_value_t = 8)]
    pub num_shards: usize,

    #[arg(long, default_value_t = true)]
    pub tcp_nodelay: bool,

    /// This implementation always uses tokio's epoll/kqueue-based reactor,
    /// so the flag is accepted but has no effect beyond being reported by
    /// `--help`.
    #[arg(long, default_value_t = true)]
    pub use_iouring_tcp_server: bool,

    /// Stack size hint, kept for flag-surface compatibility; tokio tasks are
    /// not stackful fibers, so this has no runtime effect here.
    #[arg(long, default_value_t = 256)]
    pub photon_handler_stack_kb: u32,

    /// Snapshot file path.
    #[arg(long, default_value = "dump.nrdb")]
    pub dbfilename: PathBuf,
}
