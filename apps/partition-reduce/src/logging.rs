//! Tracing setup for the binaries.

use tracing::{debug, trace};

/// Filter directive for a `-v` count
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing on stderr; stdout stays reserved for results.
pub fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2) // Show target module for -vv and above
        .with_thread_names(verbose >= 1)
        .with_line_number(verbose >= 3)
        .init();

    debug!("logging initialized at verbosity {}", verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}
