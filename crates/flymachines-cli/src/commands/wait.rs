//! Wait command implementation.

use anyhow::Result;
use clap::Args;
use flymachines_client::{MachinesClient, RequestContext, WaitRequest};
use flymachines_core::State;
use std::time::Duration;

#[derive(Args)]
pub struct WaitArgs {
    /// Machine ID
    pub machine_id: String,

    /// Target state: started, stopped or destroyed
    #[arg(long, default_value = "started")]
    pub state: State,

    /// Only accept the transition on this instance
    #[arg(long)]
    pub instance_id: Option<String>,

    /// Seconds the server may hold the request open
    #[arg(long = "wait-timeout")]
    pub wait_timeout: Option<u64>,
}

pub async fn execute(client: &MachinesClient, ctx: &RequestContext, args: WaitArgs) -> Result<()> {
    let mut request = WaitRequest::new(&args.machine_id, args.state);
    if let Some(instance_id) = args.instance_id {
        request = request.with_instance_id(instance_id);
    }
    if let Some(secs) = args.wait_timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }

    client.wait(ctx, request).await?;
    println!("{} {}", args.machine_id, args.state);
    Ok(())
}
