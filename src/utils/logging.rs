//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::{Env, Target};

/// Setup logging for the bridge.
///
/// Log lines go to stderr so stdout stays free for the host channel.
/// `RUST_LOG` overrides the default `info` filter.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();
}
