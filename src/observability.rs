//! Tracing subscriber setup.
//!
//! The crate itself only emits `tracing` events; installing a subscriber is
//! the embedding process's call. `init_tracing` is a convenience for binaries
//! and tests that want the stock stdout setup driven by [`ServiceConfig`]'s
//! `log` and `log_format` fields.
//!
//! [`ServiceConfig`]: crate::config::ServiceConfig

use anyhow::Context;

/// Install a global stdout tracing subscriber.
///
/// `filter` is an env-filter directive string (for example `"info"` or
/// `"repograph=debug,warn"`). `format` selects `"json"` for structured
/// line-delimited output; anything else gets the compact human form.
///
/// Fails if a global subscriber is already installed. Callers embedding this
/// crate in a process that configures its own logging should skip this and
/// let their subscriber receive our events.
pub fn init_tracing(filter: &str, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to install json tracing subscriber")?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to install tracing subscriber")?;
    }
    Ok(())
}
