// SPDX-License-Identifier: Apache-2.0

//! Logging bootstrap, matching `datadog-sidecar`'s use of `tracing` +
//! `tracing-subscriber::EnvFilter` for configurable, leveled logs.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber reading its filter from
/// `NANO_REDIS_LOG` (falling back to `info`). Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("NANO_REDIS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
