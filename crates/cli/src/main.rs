use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser};
use commands::Command;
use config::DeployerConfig;
use console::style;
use token_deployer::{
    artifacts::HardhatArtifacts, gateway::EthersGateway, store::FileBlobStore, ChainContext,
    NetworkConfig,
};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::messages::{MSG_CONNECTING_TO_NODE, MSG_LOADING_CONFIG};

mod commands;
mod config;
mod messages;

#[derive(Parser, Debug)]
#[command(version, about)]
struct TokenDeployer {
    #[command(subcommand)]
    command: Command,
    #[clap(flatten)]
    global: DeployerGlobalArgs,
}

#[derive(Args, Debug)]
struct DeployerGlobalArgs {
    /// Verbose mode
    #[clap(short, long, global = true)]
    verbose: bool,
}

fn start_logger(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn chain_context(config: &DeployerConfig) -> anyhow::Result<ChainContext> {
    let gateway = EthersGateway::connect(&config.rpc_url, config.private_key.as_deref())
        .await
        .context(MSG_CONNECTING_TO_NODE)?;
    Ok(ChainContext::new(
        Arc::new(gateway),
        Arc::new(HardhatArtifacts::new(config.artifacts_dir())),
        FileBlobStore::arc(),
        NetworkConfig {
            name: config.network.clone(),
            project_root: config.project_root.clone(),
        },
    ))
}

async fn run_subcommand(command: Command, config: &DeployerConfig) -> anyhow::Result<()> {
    match command {
        Command::Deploy(args) => {
            let options = args.to_options()?;
            commands::deploy::run(options, config, &chain_context(config).await?).await
        }
        Command::Inspect => commands::inspect::run(&chain_context(config).await?).await,
        Command::Upgrade(args) => {
            let request = commands::upgrade::UpgradeRequest::new(args).await?;
            commands::upgrade::run(request, &chain_context(config).await?).await
        }
        Command::ListFunctions(args) => {
            let artifacts = HardhatArtifacts::new(config.artifacts_dir());
            commands::list_functions::run(args, &artifacts)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let deployer = TokenDeployer::parse();
    start_logger(deployer.global.verbose);

    let result = match DeployerConfig::from_env().context(MSG_LOADING_CONFIG) {
        Ok(config) => run_subcommand(deployer.command, &config).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        eprintln!("{} {err}", style("error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
        std::process::exit(1);
    }
    Ok(())
}
