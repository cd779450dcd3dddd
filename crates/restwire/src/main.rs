use restwire_lib::cli::{config_path, create_root_command, is_verbose};
use restwire_lib::commands::{dispatch_command, register_commands};
use restwire_lib::config::ProcessorConfig;
use restwire_lib::errors::{handle_command_error, handle_fatal, RestwireError};
use restwire_lib::signal::SignalHandler;

#[tokio::main]
async fn main() {
    // Step 1: Build the command tree and parse arguments
    let root = register_commands(create_root_command());
    let matches = root.get_matches();

    // Step 2: Initialize logging; --verbose raises the level to DEBUG
    let verbose = is_verbose(&matches);
    restwire_lib::logger::set_verbose(verbose);
    restwire_lib::logger::init(verbose);

    // Step 3: Load configuration (--config, then $RESTWIRE_CONFIG, then defaults)
    let config = match config_path(&matches) {
        Some(path) => ProcessorConfig::load(path),
        None => ProcessorConfig::from_env(),
    }
    .unwrap_or_else(|e| handle_fatal(e));

    // Step 4: Cancel the shutdown token on SIGINT / SIGTERM
    let signal_handler = SignalHandler::new();
    let shutdown = signal_handler.token();
    signal_handler.spawn();

    // Step 5: Dispatch to subcommand handler
    match matches.subcommand() {
        Some((name, sub_matches)) => {
            tracing::debug!(command = name, "Executing command");
            if let Err(e) = dispatch_command(name, sub_matches, &config, shutdown).await {
                handle_command_error(&e);
                std::process::exit(1);
            }
        }
        None => {
            let mut cmd = register_commands(create_root_command());
            if let Err(e) = cmd.print_help() {
                handle_fatal(RestwireError::Command(format!("Failed to print help: {e}")));
            }
        }
    }
}
