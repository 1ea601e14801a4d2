//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// On-demand merger and minifier for script and stylesheet groups
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: wrought.toml)
    #[arg(short = 'C', long, default_value = "wrought.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve groups over HTTP
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable the admin API (reloadCache / reloadModel)
        #[arg(short, long)]
        debug: bool,

        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },

    /// Build every group once and report resources that fail
    #[command(visible_alias = "c")]
    Check {
        /// Groups to check. If omitted, checks the whole model.
        #[arg(value_name = "GROUP")]
        groups: Vec<String>,

        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },
}

impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["wrought", "serve", "-p", "9000", "--debug"]).unwrap();
        assert!(cli.is_serve());
        let Commands::Serve { port, debug, interface, verbose } = cli.command else {
            unreachable!();
        };
        assert_eq!(port, Some(9000));
        assert!(debug);
        assert!(interface.is_none());
        assert!(!verbose);
        assert_eq!(cli.config, PathBuf::from("wrought.toml"));
    }

    #[test]
    fn test_parse_check_with_config() {
        let cli = Cli::try_parse_from(["wrought", "-C", "site.toml", "check", "all", "core", "-V"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        let Commands::Check { groups, verbose } = cli.command else {
            unreachable!();
        };
        assert_eq!(groups, ["all", "core"]);
        assert!(verbose);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
