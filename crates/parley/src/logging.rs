//! Log output for binaries built on Parley.
//!
//! Library crates only emit `tracing` events. Binaries call [`init`] once
//! at startup to print them.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber on stderr.
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` (for example
/// `"info"` or `"parley_session=debug"`) selects what is shown. Calling
/// this more than once, or after another subscriber was installed, is a
/// no-op.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(default_directive, "logging initialized");
    }
}
