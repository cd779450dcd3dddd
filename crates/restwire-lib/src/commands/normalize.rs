//! Normalize CLI command: read a JSON document and write it back through the
//! processor, applying its input and output rules.

use std::io::Read;
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};
use serde_json::Value;

use crate::errors::Result;
use crate::json::{JsonProcessor, MapperOptions};
use crate::processor::SerializationProcessor;

/// Build the `normalize` clap command.
pub fn normalize_command() -> Command {
    Command::new("normalize")
        .about("Rewrite a JSON document through the configured processor")
        .aliases(["fmt"])
        .arg(
            Arg::new("file")
                .value_parser(value_parser!(PathBuf))
                .help("Input file; reads stdin when omitted"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .action(clap::ArgAction::SetTrue)
                .help("Indent the output"),
        )
}

/// Rewrite `input` with a processor built from `options`. Blank input yields
/// an empty string.
pub fn normalize(input: &[u8], options: &MapperOptions, pretty: bool) -> Result<String> {
    let processor = JsonProcessor::builder()
        .options(options.clone())
        .configure_options(move |o| o.indent_output |= pretty)
        .build();

    match processor.deserialize_bytes::<Value, _>(input)? {
        Some(document) => Ok(processor.serialize(&document)?),
        None => Ok(String::new()),
    }
}

/// Handle the `normalize` command.
pub fn handle_normalize(matches: &ArgMatches, options: &MapperOptions) -> Result<()> {
    let input = match matches.get_one::<PathBuf>("file") {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let output = normalize(&input, options, matches.get_flag("pretty"))?;
    tracing::debug!(input = input.len(), output = output.len(), "normalized document");
    println!("{}", output);
    Ok(())
}
