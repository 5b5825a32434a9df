use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use console::style;
use token_deployer::{prepare_upgrade, ChainContext, ConfigError, ContractCall, UpgradeOptions};

use super::{deployer_account, inspect::load_recorded, FeeArgs};
use crate::messages::{
    MSG_MIGRATION_CALL_DATA, MSG_NEW_IMPLEMENTATION, MSG_NO_MIGRATION_CALL, MSG_READING_CALL_ARGS,
};

#[derive(Debug, Parser)]
pub struct UpgradeArgs {
    /// Name of the compiled contract providing the new implementation
    #[clap(long)]
    pub new_implementation_contract: String,
    /// JSON file with a `{ "name": ..., "args": [...] }` migration call
    #[clap(long)]
    pub call_args: Option<PathBuf>,
    #[clap(long, default_value_t = 1)]
    pub confirmations: u64,
    #[clap(flatten)]
    pub fees: FeeArgs,
    #[clap(long)]
    pub token_gas_limit: Option<u64>,
    #[clap(long)]
    pub nonce: Option<u64>,
}

impl UpgradeArgs {
    pub fn to_options(&self) -> Result<UpgradeOptions, ConfigError> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self.fees.to_wei()?;
        let options = UpgradeOptions {
            confirmations: self.confirmations,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            implementation_gas_limit: self.token_gas_limit.map(Into::into),
            nonce: self.nonce.map(Into::into),
        };
        options.validate()?;
        Ok(options)
    }
}

async fn read_call(path: &Path) -> anyhow::Result<ContractCall> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("{MSG_READING_CALL_ARGS} {}", path.display()))?;
    Ok(ContractCall::from_json(&raw)?)
}

/// Upgrade inputs checked before connecting to the node.
#[derive(Debug)]
pub(crate) struct UpgradeRequest {
    contract_name: String,
    options: UpgradeOptions,
    call: Option<ContractCall>,
}

impl UpgradeRequest {
    pub(crate) async fn new(args: UpgradeArgs) -> anyhow::Result<Self> {
        let options = args.to_options()?;
        let call = match &args.call_args {
            Some(path) => Some(read_call(path).await?),
            None => None,
        };
        Ok(Self {
            contract_name: args.new_implementation_contract,
            options,
            call,
        })
    }
}

pub(crate) async fn run(request: UpgradeRequest, ctx: &ChainContext) -> anyhow::Result<()> {
    let UpgradeRequest {
        contract_name,
        options,
        call,
    } = request;
    let system = load_recorded(ctx).await?;
    let proxy_address = system.token.record.deployment.address();
    let deployer = deployer_account(ctx).await?;
    let factory = ctx.contract_factory(&contract_name, deployer)?;
    let upgrade = prepare_upgrade(ctx, &factory, proxy_address, &options, call.as_ref()).await?;

    println!(
        "{MSG_NEW_IMPLEMENTATION}: {}",
        style(format!("{:?}", upgrade.implementation)).green()
    );
    match upgrade.init_data {
        Some(data) => println!("{MSG_MIGRATION_CALL_DATA}: {data}"),
        None => println!("{}", style(MSG_NO_MIGRATION_CALL).dim()),
    }
    Ok(())
}
