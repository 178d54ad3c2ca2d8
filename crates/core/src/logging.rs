//! Tracing setup
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`,
//! falling back to the directive the caller passes in.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "info,figmagen_common=info,figmagen_core=info";

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `default_directive`. Returns `false` if a
/// global subscriber was already installed (by an earlier call or by the
/// host application), in which case nothing changes.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let installed =
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok();

    if installed {
        tracing::debug!(default_directive, "tracing subscriber installed");
    }
    installed
}
