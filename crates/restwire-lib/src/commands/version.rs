//! Version CLI command: display application version.
//!
//! Supports `--json` for machine-readable output.

use clap::{Arg, ArgMatches, Command};
use serde::Serialize;

use crate::errors::Result;
use crate::json::JsonProcessor;
use crate::processor::SerializationProcessor;

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

/// Build the `version` clap command.
pub fn version_command() -> Command {
    Command::new("version")
        .about("Show version information")
        .arg(
            Arg::new("json")
                .long("json")
                .action(clap::ArgAction::SetTrue)
                .help("Output version information as JSON"),
        )
}

/// Render the version line.
pub fn render_version(json: bool, processor: &JsonProcessor) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        let info = VersionInfo {
            name: "restwire",
            version,
        };
        Ok(processor.serialize(&info)?)
    } else {
        Ok(format!("restwire version {}", version))
    }
}

/// Handle the `version` command.
pub fn handle_version(matches: &ArgMatches, processor: &JsonProcessor) -> Result<()> {
    println!("{}", render_version(matches.get_flag("json"), processor)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_command_parses() {
        let cmd = version_command();
        let matches = cmd.try_get_matches_from(["version"]).unwrap();
        assert!(!matches.get_flag("json"));
    }

    #[test]
    fn test_version_command_json_flag() {
        let cmd = version_command();
        let matches = cmd.try_get_matches_from(["version", "--json"]).unwrap();
        assert!(matches.get_flag("json"));
    }

    #[test]
    fn test_render_version() {
        let processor = JsonProcessor::new();
        let plain = render_version(false, &processor).unwrap();
        assert!(plain.starts_with("restwire version "));

        let json = render_version(true, &processor).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "restwire");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
