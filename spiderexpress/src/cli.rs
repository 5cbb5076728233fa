// spiderexpress/src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spiderexpress")]
#[command(version)]
#[command(about = "A connector-agnostic network-sampling crawler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit a default project configuration at the given path.
    Create {
        /// Where to write the new configuration file.
        config_path: PathBuf,

        #[arg(long, conflicts_with = "non_interactive")]
        interactive: bool,

        #[arg(long, conflicts_with = "interactive")]
        non_interactive: bool,
    },

    /// Load a project configuration and run the crawl to completion.
    Start {
        /// Path to the project's configuration file.
        config_path: PathBuf,
    },

    /// Print the registered connectors and strategies.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_defaults_to_non_interactive() {
        let args = Cli::parse_from(["spiderexpress", "create", "spider.yaml"]);
        match args.command {
            Commands::Create {
                config_path,
                interactive,
                non_interactive,
            } => {
                assert_eq!(config_path, PathBuf::from("spider.yaml"));
                assert!(!interactive);
                assert!(!non_interactive);
            }
            _ => panic!("expected Create command"),
        }
    }

    #[test]
    fn parses_create_interactive_flag() {
        let args = Cli::parse_from(["spiderexpress", "create", "spider.yaml", "--interactive"]);
        match args.command {
            Commands::Create { interactive, .. } => assert!(interactive),
            _ => panic!("expected Create command"),
        }
    }

    #[test]
    fn parses_start_with_config_path() {
        let args = Cli::parse_from(["spiderexpress", "start", "project/spider.yaml"]);
        match args.command {
            Commands::Start { config_path } => {
                assert_eq!(config_path, PathBuf::from("project/spider.yaml"));
            }
            _ => panic!("expected Start command"),
        }
    }

    #[test]
    fn parses_list() {
        let args = Cli::parse_from(["spiderexpress", "list"]);
        assert!(matches!(args.command, Commands::List));
    }
}
