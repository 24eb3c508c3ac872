//! Lease commands.
//!
//! `acquire` prints the nonce on stdout so it can be captured by a script
//! and handed back to `release`.

use anyhow::Result;
use clap::{Args, Subcommand};
use flymachines_client::{MachinesClient, RequestContext};

#[derive(Subcommand)]
pub enum LeaseCommands {
    /// Acquire a lease on a machine
    Acquire(AcquireArgs),
    /// Release a lease held on a machine
    Release(ReleaseArgs),
}

#[derive(Args)]
pub struct AcquireArgs {
    /// Machine ID
    pub machine_id: String,

    /// Lease lifetime in seconds
    #[arg(long)]
    pub ttl: Option<u64>,
}

#[derive(Args)]
pub struct ReleaseArgs {
    /// Machine ID
    pub machine_id: String,

    /// Nonce returned when the lease was acquired
    #[arg(long, env = "FLY_MACHINE_LEASE_NONCE", hide_env_values = true)]
    pub nonce: String,
}

pub async fn execute(client: &MachinesClient, ctx: &RequestContext, cmd: LeaseCommands) -> Result<()> {
    match cmd {
        LeaseCommands::Acquire(args) => {
            let lease = client.acquire_lease(ctx, &args.machine_id, args.ttl).await?;
            println!("{}", lease.nonce);
            if let Some(expires_at) = lease.expires_at_time() {
                eprintln!("owner {} expires {}", lease.owner, expires_at.to_rfc3339());
            }
            Ok(())
        }
        LeaseCommands::Release(args) => {
            client
                .release_lease(ctx, &args.machine_id, &args.nonce)
                .await?;
            Ok(())
        }
    }
}
