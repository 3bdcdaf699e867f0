//! Command-line interface for rangebench
//!
//! Parsing is done with clap; each subcommand lives in its own module under
//! [`commands`].

pub mod commands;
pub mod output;

pub use commands::{Cli, Commands};
pub use output::Output;

/// Install the tracing subscriber for the requested verbosity.
///
/// `RUST_LOG` takes precedence over `-v` when set.
pub fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,sqlx=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,sqlx=info"),
            _ => tracing_subscriber::EnvFilter::new("trace"), // -vvv shows everything including sqlx
        }
    });

    // Logs go to stderr so reports on stdout stay machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
