use anyhow::Context as _;
use clap::Parser;
use console::style;
use token_deployer::{
    default_deployment_path, deploy_token, deployment_exists, parse_address, store_deployment,
    ChainContext, ConfigError, DeploymentOptions, StateError,
};

use super::{deployer_account, FeeArgs};
use crate::{
    config::DeployerConfig,
    messages::{
        MSG_DEPLOYING_TOKEN, MSG_DEPLOYMENT_STORED, MSG_IMPLEMENTATION, MSG_PROXY_ADMIN,
        MSG_TOKEN_ADDRESS, MSG_TOKEN_ADMIN, MSG_TOKEN_DEPLOYED,
    },
};

#[derive(Debug, Parser)]
pub struct DeployArgs {
    /// Address administering the token contract
    #[clap(long)]
    pub token_admin: String,
    /// Address administering the proxy. Defaults to the deployer
    #[clap(long)]
    pub proxy_admin: Option<String>,
    #[clap(long, default_value_t = 1)]
    pub confirmations: u64,
    #[clap(flatten)]
    pub fees: FeeArgs,
    #[clap(long)]
    pub proxy_gas_limit: Option<u64>,
    /// Gas limit for the token implementation deployment
    #[clap(long)]
    pub token_gas_limit: Option<u64>,
    /// Nonce of the first deployment transaction
    #[clap(long)]
    pub nonce: Option<u64>,
}

impl DeployArgs {
    pub fn to_options(&self) -> Result<DeploymentOptions, ConfigError> {
        let token_admin = parse_address("token administrator", &self.token_admin)?;
        let proxy_admin = self
            .proxy_admin
            .as_deref()
            .map(|value| parse_address("proxy administrator", value))
            .transpose()?;
        let (max_fee_per_gas, max_priority_fee_per_gas) = self.fees.to_wei()?;
        let options = DeploymentOptions {
            proxy_admin,
            confirmations: self.confirmations,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            proxy_gas_limit: self.proxy_gas_limit.map(Into::into),
            implementation_gas_limit: self.token_gas_limit.map(Into::into),
            nonce: self.nonce.map(Into::into),
            ..DeploymentOptions::new(token_admin)
        };
        options.validate()?;
        Ok(options)
    }
}

pub(crate) async fn run(
    options: DeploymentOptions,
    config: &DeployerConfig,
    ctx: &ChainContext,
) -> anyhow::Result<()> {
    let dir = default_deployment_path(ctx);
    if deployment_exists(ctx, &dir).await? && !config.is_redeployable() {
        return Err(StateError::DeploymentExists {
            network: config.network.clone(),
        }
        .into());
    }

    let deployer = deployer_account(ctx).await?;
    println!("{MSG_DEPLOYING_TOKEN} from {}", style(format!("{deployer:?}")).cyan());
    let system = deploy_token(ctx, deployer, &options)
        .await
        .context(MSG_DEPLOYING_TOKEN)?;

    let deployment = &system.token.record.deployment;
    println!("{}", style(MSG_TOKEN_DEPLOYED).green().bold());
    println!("  {MSG_TOKEN_ADDRESS}: {:?}", deployment.address());
    println!("  {MSG_TOKEN_ADMIN}: {:?}", system.token.token_admin);
    if let Some(proxy) = deployment.proxy() {
        println!("  {MSG_PROXY_ADMIN}: {:?}", proxy.proxy_admin);
        println!("  {MSG_IMPLEMENTATION}: {:?}", proxy.implementation_address);
    }

    store_deployment(ctx, &system, &dir).await?;
    println!("{MSG_DEPLOYMENT_STORED} {}", style(dir.display()).green());
    Ok(())
}
