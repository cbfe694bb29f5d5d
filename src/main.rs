use clap::{Parser, Subcommand};
use kube::{Client, CustomResourceExt};
use log::info;
use logstack::{config::Config, errors::*, manager::Manager, stack::LogStack};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Schedules and applies LogStack storage schema upgrades")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the operator against the current kubernetes context.
    Run {
        /// YAML operator configuration.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the LogStack CustomResourceDefinition.
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Crd => {
            print!("{}", serde_yaml::to_string(&LogStack::crd())?);
            Ok(())
        }
        Command::Run { config } => run(Config::load(config.as_deref())?).await,
    }
}

async fn run(config: Config) -> Result<()> {
    // Read the environment to find config for kube client.
    // Note that this tries an in-cluster configuration first,
    // then falls back on a kubeconfig file.
    let client = Client::try_default().await?;

    let (_manager, drainer) = Manager::new(client, config).await?;
    drainer.await;
    info!("controller stream finished");
    Ok(())
}
