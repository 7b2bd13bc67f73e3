//! Logger setup for binaries, demos and tests.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Installs the global `env_logger`.
///
/// `RUST_LOG` wins when set. Otherwise the filter is `info`, or `debug` when
/// `verbose` is true. Safe to call more than once.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);
    builder.format_timestamp_millis();

    // Fails only if a logger is already installed.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(false);
        init(true);
        log::info!("logger installed");
    }
}
