//! Diagnostic logging setup.
//!
//! Builds a `tracing` dispatcher that writes to stderr. It is handed to
//! the pipeline inside its `Context` instead of being installed as the
//! process-wide default. `RUST_LOG` overrides the `-v` level.

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count to a filter directive.
fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Build the stderr dispatcher for the given verbosity.
pub fn dispatch(verbose: u8) -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level(verbose).into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    Dispatch::new(subscriber)
}
