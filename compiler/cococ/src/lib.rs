//! Library half of the `coco` driver.
//!
//! The binary is a thin argument dispatcher; everything it runs lives in
//! [`commands`] so it can be exercised without spawning a process.

pub mod commands;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=coco_bounds=debug`
/// or `RUST_LOG=coco_bounds=trace` for per-site output.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
