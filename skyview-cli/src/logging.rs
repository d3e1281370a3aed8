use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr. `RUST_LOG` wins over the `-v` flag.
pub fn init(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?
        .add_directive("hyper=warn".parse().context("Invalid log directive")?)
        .add_directive("reqwest=warn".parse().context("Invalid log directive")?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
