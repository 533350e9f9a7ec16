use std::io;

use anyhow::anyhow;
use tracing::Level;

use crate::fmt::Formatter;

/// Installs the global subscriber. Diagnostics go to stderr, so they never
/// mix with results on stdout.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let max_level = if verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .event_format(Formatter::new(verbose))
        .try_init()
        .map_err(|err| anyhow!("failed to install the logger: {}", err))
}
