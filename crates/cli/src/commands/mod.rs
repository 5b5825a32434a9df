use clap::{Args, Subcommand};
use ethers::types::{Address, U256};
use token_deployer::{parse_gwei, ChainContext, ConfigError};

pub(crate) mod deploy;
pub(crate) mod inspect;
pub(crate) mod list_functions;
pub(crate) mod upgrade;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy the token behind a transparent upgrade proxy and record it
    Deploy(deploy::DeployArgs),
    /// Print the recorded deployment for the configured network
    Inspect,
    /// Deploy a new token implementation for a later proxy upgrade
    Upgrade(upgrade::UpgradeArgs),
    /// List ABI functions of compiled contracts
    ListFunctions(list_functions::ListFunctionsArgs),
}

/// EIP-1559 fee pair in gwei. Both values must be given together.
#[derive(Debug, Default, Args)]
pub struct FeeArgs {
    #[clap(long)]
    pub max_fee_per_gas: Option<String>,
    #[clap(long)]
    pub max_priority_fee_per_gas: Option<String>,
}

impl FeeArgs {
    pub fn to_wei(&self) -> Result<(Option<U256>, Option<U256>), ConfigError> {
        let max_fee = self.max_fee_per_gas.as_deref().map(parse_gwei).transpose()?;
        let max_priority_fee = self
            .max_priority_fee_per_gas
            .as_deref()
            .map(parse_gwei)
            .transpose()?;
        Ok((max_fee, max_priority_fee))
    }
}

/// Account deploying contracts: the configured signer if any, else the node's first account.
pub(crate) async fn deployer_account(ctx: &ChainContext) -> anyhow::Result<Address> {
    let accounts = ctx.gateway().accounts().await?;
    accounts
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!(crate::messages::MSG_NO_DEPLOYER_ACCOUNT))
}
