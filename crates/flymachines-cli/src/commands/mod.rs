//! Command line surface.
//!
//! Every subcommand is a single API exchange. The global `--timeout` bounds
//! it end to end; Ctrl-C cancels it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flymachines_client::{ClientConfig, MachinesClient, RequestContext};
use std::time::Duration;

pub mod lease;
pub mod machine;
pub mod wait;

/// flymachines - manage Fly machines, leases and state waits
#[derive(Parser)]
#[command(name = "flymachines")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Application the machines belong to
    #[arg(long, short, global = true, env = "FLY_APP_NAME", default_value = "")]
    pub app: String,

    /// Override the API base URL
    ///
    /// Defaults to FLY_API_HOSTNAME, then the public endpoint.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Overall deadline for the command, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List machines
    #[command(alias = "ls")]
    List(machine::ListArgs),

    /// Show one machine
    Get(machine::GetArgs),

    /// Create a machine from an image
    Create(machine::CreateArgs),

    /// Stop a machine
    Stop(machine::StopArgs),

    /// Delete a machine
    #[command(alias = "rm")]
    Delete(machine::DeleteArgs),

    /// Block until a machine reaches started, stopped or destroyed
    Wait(wait::WaitArgs),

    /// Acquire or release a machine lease
    #[command(subcommand)]
    Lease(lease::LeaseCommands),
}

impl Cli {
    pub fn config(&self) -> ClientConfig {
        let config = ClientConfig::from_env(self.app.as_str());
        match &self.base_url {
            Some(base_url) => config.with_base_url(base_url.as_str()),
            None => config,
        }
    }

    pub fn client(&self) -> Result<MachinesClient> {
        let config = self.config();
        config.validate().context("invalid client configuration")?;
        MachinesClient::with_reqwest(config).context("failed to build http client")
    }

    pub fn context(&self) -> RequestContext {
        let ctx = RequestContext::background();
        match self.timeout {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use flymachines_core::State;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "flymachines",
            "get",
            "4d89040f431938",
            "--app",
            "my-app",
            "--base-url",
            "http://localhost:4280",
        ])
        .unwrap();

        assert_eq!(cli.app, "my-app");
        assert_eq!(
            cli.config().url_for(&["machines"]).unwrap().as_str(),
            "http://localhost:4280/v1/apps/my-app/machines"
        );
        assert!(matches!(cli.command, Commands::Get(ref args) if args.machine_id == "4d89040f431938"));
    }

    #[test]
    fn test_wait_state_is_parsed() {
        let cli = Cli::try_parse_from(["flymachines", "wait", "1", "--state", "stopped"]).unwrap();
        match cli.command {
            Commands::Wait(args) => assert_eq!(args.state, State::Stopped),
            _ => panic!("expected wait"),
        }

        assert!(Cli::try_parse_from(["flymachines", "wait", "1", "--state", "sleeping"]).is_err());
    }

    #[test]
    fn test_timeout_sets_deadline() {
        let cli = Cli::try_parse_from(["flymachines", "list", "--timeout", "5"]).unwrap();
        assert!(cli.context().deadline().is_some());

        let cli = Cli::try_parse_from(["flymachines", "list"]).unwrap();
        assert!(cli.context().deadline().is_none());
    }
}
