pub mod normalize;
#[cfg(feature = "http-server")]
pub mod serve;
pub mod version;

use clap::{ArgMatches, Command};
use tokio_util::sync::CancellationToken;

use crate::config::ProcessorConfig;
use crate::errors::{RestwireError, Result};

/// Attach every available subcommand to the root command.
pub fn register_commands(root: Command) -> Command {
    let root = root
        .subcommand(version::version_command())
        .subcommand(normalize::normalize_command());

    #[cfg(feature = "http-server")]
    let root = root.subcommand(serve::serve_command());

    root
}

/// Dispatch a parsed subcommand to its handler.
#[cfg_attr(not(feature = "http-server"), allow(unused_variables))]
pub async fn dispatch_command(
    name: &str,
    matches: &ArgMatches,
    config: &ProcessorConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    match name {
        "version" => version::handle_version(matches, &config.processor())?,
        "normalize" => normalize::handle_normalize(matches, &config.mapper)?,
        #[cfg(feature = "http-server")]
        "serve" => serve::handle_serve(matches, config, shutdown).await?,
        other => return Err(RestwireError::Command(format!("Unknown command: {}", other))),
    }
    Ok(())
}
