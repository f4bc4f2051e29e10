use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level.
///
/// `quiet` wins over `verbose`. `RUST_LOG`, when set, replaces this entirely.
pub fn default_directive(verbose: u8, quiet: bool) -> String {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    format!("glmirror={}", level)
}

/// Install the global `tracing` subscriber writing to stderr.
///
/// # Errors
/// Returns an error if a global subscriber is already set.
pub fn init(verbose: u8, quiet: bool) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_directive(verbose, quiet)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_follows_flags() {
        assert_eq!(default_directive(0, false), "glmirror=info");
        assert_eq!(default_directive(1, false), "glmirror=debug");
        assert_eq!(default_directive(4, false), "glmirror=trace");
        assert_eq!(default_directive(2, true), "glmirror=warn");
    }
}
