use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ncs",
    about = "Node Coordination Service: node registry and state synchronization",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the coordination server
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Seconds a wait request may block (0 = no limit)
    #[arg(long)]
    pub wait_timeout: Option<u64>,
    /// Comma separated list of recognized states (default: any)
    #[arg(long, value_delimiter = ',')]
    pub states: Option<Vec<String>>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the built-in defaults, ignoring --config
    #[arg(long)]
    pub defaults: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from([
            "ncs", "serve", "--bind", "0.0.0.0:9000", "--wait-timeout", "10", "--states", "running,done",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
        assert_eq!(args.wait_timeout, Some(10));
        assert_eq!(args.states, Some(vec!["running".to_string(), "done".to_string()]));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ncs", "config", "--defaults", "-v", "--config", "ncs.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ncs.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigArgs { defaults: true })));
    }
}
