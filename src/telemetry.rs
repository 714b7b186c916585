// SPDX-License-Identifier: MPL-2.0

//! Logging setup.
//!
//! Everything in the crate logs through `tracing`; the embedding app calls
//! [`init`] once at startup to get formatted output on stderr.

use crate::config::IS_DEVEL;
use tracing_subscriber::EnvFilter;

fn default_directive() -> &'static str {
    if IS_DEVEL { "flashdeck=debug" } else { "flashdeck=info" }
}

/// Install a global fmt subscriber filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
