//! Log output for the command line.
//!
//! `RUST_LOG` takes precedence over the verbosity flag:
//! ```bash
//! RUST_LOG=startkit_watch=debug startkit watch -g 'src/**/*.ts' -- make
//! ```

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
