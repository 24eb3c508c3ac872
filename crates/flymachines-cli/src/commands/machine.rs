//! Machine lifecycle commands.

use anyhow::{bail, Result};
use clap::Args;
use flymachines_client::{
    CreateMachineRequest, DeleteMachineRequest, ListMachinesRequest, MachinesClient,
    RequestContext, StopMachineRequest,
};
use flymachines_core::{Config, State};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Args)]
pub struct ListArgs {
    /// Only show machines in this state
    #[arg(long)]
    pub state: Option<State>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct GetArgs {
    /// Machine ID
    pub machine_id: String,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Image to run
    pub image: String,

    /// Machine name
    #[arg(long)]
    pub name: Option<String>,

    /// Region to place the machine in
    #[arg(long)]
    pub region: Option<String>,

    /// Environment variables (KEY=VALUE)
    #[arg(short, long)]
    pub env: Vec<String>,

    /// Destroy the machine once it exits
    #[arg(long)]
    pub auto_destroy: bool,
}

#[derive(Args)]
pub struct StopArgs {
    /// Machine ID
    pub machine_id: String,

    /// Signal to send instead of the default
    #[arg(short, long)]
    pub signal: Option<String>,

    /// Seconds to wait before the machine is killed
    #[arg(short, long)]
    pub time: Option<u64>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Machine ID
    pub machine_id: String,

    /// Kill a running machine instead of refusing
    #[arg(short, long)]
    pub force: bool,
}

pub async fn list(client: &MachinesClient, ctx: &RequestContext, args: ListArgs) -> Result<()> {
    let machines = client
        .list(ctx, ListMachinesRequest { state: args.state })
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&machines)?);
        return Ok(());
    }

    println!(
        "{:<16} {:<24} {:<12} {:<8} {}",
        "ID", "NAME", "STATE", "REGION", "IMAGE"
    );
    for machine in &machines {
        println!(
            "{:<16} {:<24} {:<12} {:<8} {}",
            machine.id,
            machine.name,
            machine.state.as_str(),
            machine.region,
            machine.config.image
        );
    }

    Ok(())
}

pub async fn get(client: &MachinesClient, ctx: &RequestContext, args: GetArgs) -> Result<()> {
    let machine = client.get(ctx, &args.machine_id).await?;
    println!("{}", serde_json::to_string_pretty(&machine)?);
    Ok(())
}

pub async fn create(client: &MachinesClient, ctx: &RequestContext, args: CreateArgs) -> Result<()> {
    let request = CreateMachineRequest {
        name: args.name,
        region: args.region,
        config: Some(Config {
            image: args.image,
            env: parse_env(&args.env)?,
            auto_destroy: args.auto_destroy,
            ..Config::default()
        }),
        ..CreateMachineRequest::default()
    };

    let machine = client.create(ctx, request).await?;
    println!("{}", machine.id);
    Ok(())
}

pub async fn stop(client: &MachinesClient, ctx: &RequestContext, args: StopArgs) -> Result<()> {
    let request = StopMachineRequest {
        machine_id: args.machine_id.clone(),
        signal: args.signal,
        timeout: args.time.map(Duration::from_secs),
    };

    client.stop(ctx, request).await?;
    println!("{}", args.machine_id);
    Ok(())
}

pub async fn delete(client: &MachinesClient, ctx: &RequestContext, args: DeleteArgs) -> Result<()> {
    let request = DeleteMachineRequest {
        machine_id: args.machine_id.clone(),
        kill: args.force,
    };

    client.delete(ctx, request).await?;
    println!("{}", args.machine_id);
    Ok(())
}

fn parse_env(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut env = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                env.insert(key.to_string(), value.to_string());
            }
            _ => bail!("invalid environment variable '{pair}', expected KEY=VALUE"),
        }
    }
    Ok(env)
}
