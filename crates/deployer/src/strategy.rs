use ethers::{
    abi::Token,
    types::{Address, Eip1559TransactionRequest, U256},
};

use crate::{
    context::ChainContext,
    deploy::{DeployResult, ProxyInfo},
    error::DeployError,
    gateway::{ContractFactory, ContractHandle},
    options::{FeeOverrides, TxOverrides},
    proxy::{self, ProxyDeployOptions},
};

/// Inputs shared by all deployment strategies.
#[derive(Debug, Clone, Default)]
pub struct StrategyOptions {
    /// Initializer arguments. Passed to the constructor by [`DeployStrategy::Plain`].
    pub init_args: Vec<Token>,
    pub confirmations: u64,
    pub fees: Option<FeeOverrides>,
    /// Nonce of the first transaction; later transactions use the following nonces.
    pub nonce: Option<U256>,
    /// Proxy administrator, defaults to the deploying signer.
    /// Only used by [`DeployStrategy::Proxy`].
    pub proxy_admin: Option<Address>,
    pub proxy_gas_limit: Option<U256>,
    /// Gas limit for the contract itself (the implementation if deployed behind a proxy).
    pub implementation_gas_limit: Option<U256>,
}

impl StrategyOptions {
    fn overrides(&self, gas_limit: Option<U256>) -> TxOverrides {
        TxOverrides {
            fees: self.fees,
            gas_limit,
            nonce: self.nonce,
        }
    }
}

/// How a contract gets onto the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeployStrategy {
    /// Single deployment with the initializer arguments passed to the constructor.
    #[default]
    Plain,
    /// Deployment followed by a separate `initialize` call. Not meant for production:
    /// anyone can front-run the initializer.
    PlainWithInit,
    /// Implementation behind a transparent upgrade proxy, initialized in the proxy constructor.
    Proxy,
}

impl DeployStrategy {
    #[tracing::instrument(
        name = "DeployStrategy::execute",
        skip_all,
        fields(strategy = ?self, contract = %factory.name)
    )]
    pub async fn execute(
        self,
        ctx: &ChainContext,
        factory: &ContractFactory,
        options: &StrategyOptions,
    ) -> Result<DeployResult, DeployError> {
        match self {
            Self::Plain => deploy_plain(ctx, factory, options).await,
            Self::PlainWithInit => deploy_plain_with_init(ctx, factory, options).await,
            Self::Proxy => deploy_behind_proxy(ctx, factory, options).await,
        }
    }
}

async fn deploy_and_wait(
    ctx: &ChainContext,
    factory: &ContractFactory,
    constructor_args: &[Token],
    options: &StrategyOptions,
) -> Result<ContractHandle, DeployError> {
    let overrides = options.overrides(options.implementation_gas_limit);
    let tx_hash =
        proxy::send_deployment(ctx.gateway(), factory, constructor_args, &overrides).await?;
    let receipt = ctx
        .gateway()
        .wait_for_confirmations(tx_hash, options.confirmations)
        .await?;
    let address = proxy::created_address(&receipt)?;
    tracing::info!("Deployed `{}` at {address:?}", factory.name);
    Ok(ContractHandle::new(address, factory.abi.clone()))
}

async fn deploy_plain(
    ctx: &ChainContext,
    factory: &ContractFactory,
    options: &StrategyOptions,
) -> Result<DeployResult, DeployError> {
    let contract = deploy_and_wait(ctx, factory, &options.init_args, options).await?;
    Ok(DeployResult::Basic { contract })
}

async fn deploy_plain_with_init(
    ctx: &ChainContext,
    factory: &ContractFactory,
    options: &StrategyOptions,
) -> Result<DeployResult, DeployError> {
    let init_data = proxy::encode_initializer(factory, &options.init_args)?;
    let contract = deploy_and_wait(ctx, factory, &[], options).await?;

    let init_tx = Eip1559TransactionRequest::new()
        .from(factory.signer)
        .to(contract.address)
        .data(init_data);
    let init_tx = options.overrides(None).next_nonce().apply(init_tx);
    let tx_hash = ctx.gateway().send_transaction(init_tx).await?;
    ctx.gateway()
        .wait_for_confirmations(tx_hash, options.confirmations)
        .await?;
    tracing::info!("Initialized `{}` at {:?}", factory.name, contract.address);
    Ok(DeployResult::Basic { contract })
}

async fn deploy_behind_proxy(
    ctx: &ChainContext,
    factory: &ContractFactory,
    options: &StrategyOptions,
) -> Result<DeployResult, DeployError> {
    let proxy_admin = options.proxy_admin.unwrap_or(factory.signer);
    let proxy_options = ProxyDeployOptions {
        overrides: options.overrides(None),
        proxy_gas_limit: options.proxy_gas_limit,
        implementation_gas_limit: options.implementation_gas_limit,
        timeout: None,
        ..ProxyDeployOptions::new(proxy_admin)
    };
    let deployed = proxy::deploy_proxy(ctx, factory, &options.init_args, &proxy_options).await?;
    ctx.gateway()
        .wait_for_confirmations(deployed.deploy_tx, options.confirmations)
        .await?;

    let implementation_address =
        proxy::implementation_address(ctx.gateway(), deployed.contract.address).await?;
    Ok(DeployResult::Proxied {
        contract: deployed.contract,
        proxy: ProxyInfo {
            proxy_admin,
            init_data: deployed.init_data,
            implementation_address,
        },
    })
}
