use std::path::PathBuf;

/// Creates the root clap Command with global `--verbose` and `--config` flags.
pub fn create_root_command() -> clap::Command {
    clap::Command::new("restwire")
        .about("JSON wire codec toolkit")
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Configuration file (.json, .yaml or .yml); defaults to $RESTWIRE_CONFIG"),
        )
}

/// Returns whether verbose mode is active based on parsed matches.
pub fn is_verbose(matches: &clap::ArgMatches) -> bool {
    matches.get_flag("verbose")
}

/// Returns the configuration file given on the command line, if any.
pub fn config_path(matches: &clap::ArgMatches) -> Option<PathBuf> {
    matches.get_one::<PathBuf>("config").cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_command_has_verbose_flag() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["restwire", "--verbose"]).unwrap();
        assert!(is_verbose(&matches));
    }

    #[test]
    fn test_short_verbose_flag() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["restwire", "-v"]).unwrap();
        assert!(is_verbose(&matches));
    }

    #[test]
    fn test_no_flags_not_verbose() {
        let cmd = create_root_command();
        let matches = cmd.try_get_matches_from(["restwire"]).unwrap();
        assert!(!is_verbose(&matches));
        assert_eq!(config_path(&matches), None);
    }

    #[test]
    fn test_config_flag() {
        let cmd = create_root_command();
        let matches = cmd
            .try_get_matches_from(["restwire", "--config", "restwire.yaml"])
            .unwrap();
        assert_eq!(config_path(&matches), Some(PathBuf::from("restwire.yaml")));
    }

    #[test]
    fn test_global_flags_reach_subcommands() {
        let cmd = create_root_command().subcommand(clap::Command::new("serve"));
        let matches = cmd
            .try_get_matches_from(["restwire", "serve", "-v", "-c", "cfg.json"])
            .unwrap();
        assert!(is_verbose(&matches));
        assert_eq!(config_path(&matches), Some(PathBuf::from("cfg.json")));
    }
}
