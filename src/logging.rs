//! Tracing setup for the CLI.
//!
//! `RUST_LOG` wins when set; otherwise the crate logs at `warn`, or `debug`
//! with `--verbose`. Output goes to stderr so it never mixes with tool reports.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("datascribe=debug")
        } else {
            EnvFilter::new("datascribe=warn")
        }
    });

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .without_time()
            .compact(),
    );

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
