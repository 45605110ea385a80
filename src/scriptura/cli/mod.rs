pub mod args;
pub mod commands;
pub mod render;

use tracing_subscriber::EnvFilter;

/// Log to stderr so rendered output on stdout stays clean.
///
/// `SCRIPTURA_LOG` takes an `EnvFilter` directive and wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "scriptura=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SCRIPTURA_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
