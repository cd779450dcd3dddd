//! HTTP server command.
//!
//! Provides the `serve` command (aliases: `http`, `server`). Host and port
//! fall back to the configuration file when not given.

use clap::{value_parser, Arg, ArgMatches, Command};
use tokio_util::sync::CancellationToken;

use crate::config::{ProcessorConfig, ServerSettings};
use crate::errors::Result;
use crate::output;
use crate::server;

/// Build the `serve` clap command.
pub fn serve_command() -> Command {
    Command::new("serve")
        .about("Start the JSON HTTP server")
        .aliases(["http", "server"])
        .arg(Arg::new("host").long("host").help("Host to bind HTTP server to"))
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16).range(1..))
                .help("Port to run HTTP server on"),
        )
}

/// Merge command-line overrides onto the configured listener settings.
pub fn server_settings(matches: &ArgMatches, config: &ProcessorConfig) -> ServerSettings {
    let mut settings = config.server.clone();
    if let Some(host) = matches.get_one::<String>("host") {
        settings.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        settings.port = *port;
    }
    settings
}

/// Handle the `serve` command. Runs until `shutdown` is cancelled.
pub async fn handle_serve(
    matches: &ArgMatches,
    config: &ProcessorConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let settings = server_settings(matches, config);
    let handle = server::start_server(&settings, config.processor(), shutdown).await?;
    output::success(&format!("Listening on http://{}", handle.local_addr()));
    handle.wait().await
}
