//! flymachines - drive the Fly Machines API from the shell.

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "flymachines=debug,flymachines_client=debug"
    } else {
        "flymachines=info,flymachines_client=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let client = cli.client()?;
    let (ctx, cancel) = cli.context().with_cancel();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight request");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::List(args) => commands::machine::list(&client, &ctx, args).await,
        Commands::Get(args) => commands::machine::get(&client, &ctx, args).await,
        Commands::Create(args) => commands::machine::create(&client, &ctx, args).await,
        Commands::Stop(args) => commands::machine::stop(&client, &ctx, args).await,
        Commands::Delete(args) => commands::machine::delete(&client, &ctx, args).await,
        Commands::Wait(args) => commands::wait::execute(&client, &ctx, args).await,
        Commands::Lease(cmd) => commands::lease::execute(&client, &ctx, cmd).await,
    }
}
