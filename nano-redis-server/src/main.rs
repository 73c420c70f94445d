// SPDX-License-Identifier: Apache-2.0

//! Process entry point: parses CLI flags, boots logging, spawns the shard
//! set, loads any existing snapshot files, then runs the accept loop until
//! `SIGINT`/`SIGTERM`.

use anyhow::{Context, Result};
use clap::Parser;
use nano_redis_common::state::ServerState;
use nano_redis_common::time::now_ms;
use nano_redis_server::cli::Cli;
use nano_redis_server::client_directory::ClientDirectory;
use nano_redis_server::router::{self, ConnectionContext};
use nano_redis_server::shard_set::{spawn_shards, ShardSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

fn main() -> Result<()> {
    let cli = Cli::parse();
    nano_redis_common::logging::init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the accept-loop runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    tracing::info!(
        port = cli.port,
        num_shards = cli.num_shards,
        "starting nano-redis-server {}",
        nano_redis_common::VERSION
    );

    let shards = Arc::new(spawn_shards(cli.num_shards));
    load_snapshots(&shards, &cli).await;

    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{}", cli.port))?;

    let directory = Arc::new(ClientDirectory::new());
    let state = Arc::new(ServerState::new());
    let ctx = Arc::new(ConnectionContext::new(
        shards.clone(),
        directory,
        state.clone(),
        cli.dbfilename.clone(),
        now_ms(),
    ));
    let next_home = Arc::new(AtomicUsize::new(0));

    tokio::select! {
        result = accept_loop(listener, ctx.clone(), shards.clone(), next_home, cli.tcp_nodelay) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    state.request_shutdown();
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
    shards: Arc<ShardSet>,
    next_home: Arc<AtomicUsize>,
    tcp_nodelay: bool,
) -> Result<()> {
    loop {
        let (socket, peer) = listener.accept().await.context("accept failed")?;
        if let Err(e) = socket.set_nodelay(tcp_nodelay) {
            tracing::warn!(error = %e, "failed to set TCP_NODELAY on accepted socket");
        }
        let home_shard = next_home.fetch_add(1, Ordering::Relaxed) % shards.num_shards();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            router::handle_connection(ctx, socket, home_shard, peer.to_string()).await;
        });
    }
}

/// Loads `<dbfilename>.<shard_id>` into each shard's `Database` at startup,
/// if present. A missing file is the ordinary cold-start case, not an
/// error; a present-but-corrupt file is logged and skipped rather than
/// treated as fatal; process exit is reserved for bind/allocation failure.
async fn load_snapshots(shards: &ShardSet, cli: &Cli) {
    for handle in &shards.handles {
        let shard_id = handle.id();
        let mut path = cli.dbfilename.clone().into_os_string();
        path.push(format!(".{shard_id}"));
        let path = std::path::PathBuf::from(path);
        if !path.exists() {
            continue;
        }
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(shard = shard_id, error = %e, "failed to read snapshot file");
                continue;
            }
        };
        let result = nano_redis_shard::call(handle.queue(), move |shard| {
            nano_redis_snapshot::load(&bytes[..], shard_id as u32, &mut shard.db.borrow_mut())
        })
        .await;
        match result {
            Ok(Ok(header)) => {
                tracing::info!(shard = shard_id, timestamp_ms = header.timestamp_ms, "loaded snapshot");
            }
            Ok(Err(e)) => tracing::warn!(shard = shard_id, error = %e, "snapshot load failed"),
            Err(e) => tracing::warn!(shard = shard_id, error = %e, "snapshot load task failed"),
        }
    }
}

/// Waits for either `SIGINT` or `SIGTERM`. `SIGPIPE` needs no handling:
/// Rust's runtime already ignores it by default.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        tokio::select! {
            _ = term.recv() => {}
            _ = int.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
