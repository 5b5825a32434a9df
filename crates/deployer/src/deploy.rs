//! Contract deployment orchestration.

use ethers::{
    abi::Token,
    types::{Address, Bytes, U256},
};

use crate::{
    context::ChainContext,
    error::{ConfigError, DeployError},
    gateway::ContractHandle,
    options::FeeOverrides,
    strategy::{DeployStrategy, StrategyOptions},
};

/// Proxy-related part of a [`DeployResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyInfo {
    pub proxy_admin: Address,
    /// ABI-encoded initializer call embedded into the proxy constructor.
    pub init_data: Bytes,
    pub implementation_address: Address,
}

/// Outcome of a single contract deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployResult {
    Basic {
        contract: ContractHandle,
    },
    /// Contract behind a transparent proxy. `contract` is the proxy address bound
    /// to the implementation ABI.
    Proxied {
        contract: ContractHandle,
        proxy: ProxyInfo,
    },
}

impl DeployResult {
    pub fn contract(&self) -> &ContractHandle {
        match self {
            Self::Basic { contract } | Self::Proxied { contract, .. } => contract,
        }
    }

    pub fn address(&self) -> Address {
        self.contract().address
    }

    pub fn proxy(&self) -> Option<&ProxyInfo> {
        match self {
            Self::Basic { .. } => None,
            Self::Proxied { proxy, .. } => Some(proxy),
        }
    }
}

/// Named deployment of a contract from the build artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRecord {
    pub name: String,
    pub deployment: DeployResult,
}

/// Contract factory parameters.
#[derive(Debug, Clone, Default)]
pub struct FactoryOptions {
    pub signer: Option<Address>,
}

/// Options of [`deploy_contract()`].
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Confirmations to wait for; 0 if not specified.
    pub confirmations: Option<u64>,
    pub fees: Option<FeeOverrides>,
    pub nonce: Option<U256>,
    pub proxy_admin: Option<Address>,
    pub proxy_gas_limit: Option<U256>,
    pub implementation_gas_limit: Option<U256>,
}

/// Deploys the named contract with the provided strategy.
pub async fn deploy_contract(
    contract_name: &str,
    init_args: Vec<Token>,
    ctx: &ChainContext,
    factory_options: &FactoryOptions,
    deploy_options: DeployOptions,
    strategy: DeployStrategy,
) -> Result<DeployResult, DeployError> {
    let signer = factory_options.signer.ok_or(ConfigError::MissingSigner)?;
    let factory = ctx.contract_factory(contract_name, signer)?;

    let options = StrategyOptions {
        init_args,
        confirmations: deploy_options.confirmations.unwrap_or(0),
        fees: deploy_options.fees,
        nonce: deploy_options.nonce,
        proxy_admin: deploy_options.proxy_admin,
        proxy_gas_limit: deploy_options.proxy_gas_limit,
        implementation_gas_limit: deploy_options.implementation_gas_limit,
    };
    strategy.execute(ctx, &factory, &options).await
}
