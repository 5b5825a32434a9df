//! Transparent upgrade proxies: deployment and ERC-1967 introspection.
//!
//! The proxy contract is expected to have the constructor
//! `constructor(address logic, address admin, bytes data)`, i.e. the one of
//! `TransparentUpgradeableProxy` with the admin being an account rather than a `ProxyAdmin`.

use std::time::Duration;

use ethers::{
    abi::Token,
    types::{Address, Bytes, Eip1559TransactionRequest, TransactionReceipt, H256, U256},
};

use crate::{
    context::ChainContext,
    error::{ConfigError, DeployError, StateError},
    gateway::{ChainGateway, ContractFactory, ContractHandle, GatewayError},
    options::TxOverrides,
};

/// Name of the proxy contract in the build artifacts.
pub const TRANSPARENT_PROXY_CONTRACT: &str = "TransparentUpgradeableProxy";

/// Name of the initializer function invoked through the proxy constructor.
pub const INITIALIZER: &str = "initialize";

/// `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`
pub const IMPLEMENTATION_SLOT: H256 = H256([
    0x36, 0x08, 0x94, 0xa1, 0x3b, 0xa1, 0xa3, 0x21, 0x06, 0x67, 0xc8, 0x28, 0x49, 0x2d, 0xb9, 0x8d,
    0xca, 0x3e, 0x20, 0x76, 0xcc, 0x37, 0x35, 0xa9, 0x20, 0xa3, 0xca, 0x50, 0x5d, 0x38, 0x2b, 0xbc,
]);

/// `bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)`
pub const ADMIN_SLOT: H256 = H256([
    0xb5, 0x31, 0x27, 0x68, 0x4a, 0x56, 0x8b, 0x31, 0x73, 0xae, 0x13, 0xb9, 0xf8, 0xa6, 0x01, 0x6e,
    0x24, 0x3e, 0x63, 0xb6, 0xe8, 0xee, 0x11, 0x78, 0xd6, 0xa7, 0x17, 0x85, 0x0b, 0x5d, 0x61, 0x03,
]);

/// Default time to wait for a deployment transaction to be mined.
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(60);

/// Options for [`deploy_proxy()`].
#[derive(Debug, Clone)]
pub struct ProxyDeployOptions {
    pub admin: Address,
    /// Overrides shared by both transactions. If a nonce is set, the implementation
    /// deployment uses it and the proxy deployment uses the next one.
    pub overrides: TxOverrides,
    pub proxy_gas_limit: Option<U256>,
    pub implementation_gas_limit: Option<U256>,
    /// Watchdog for each deployment wait; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ProxyDeployOptions {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            overrides: TxOverrides::default(),
            proxy_gas_limit: None,
            implementation_gas_limit: None,
            timeout: Some(DEFAULT_DEPLOY_TIMEOUT),
        }
    }
}

/// Result of a transparent proxy deployment.
#[derive(Debug, Clone)]
pub struct DeployedProxy {
    /// Proxy address bound to the implementation ABI.
    pub contract: ContractHandle,
    pub implementation: Address,
    /// Initializer call embedded into the proxy constructor.
    pub init_data: Bytes,
    pub deploy_tx: H256,
}

/// Encodes the `initialize` call of the implementation.
pub fn encode_initializer(
    factory: &ContractFactory,
    init_args: &[Token],
) -> Result<Bytes, DeployError> {
    let initializer = factory
        .abi
        .function(INITIALIZER)
        .map_err(|_| ConfigError::MissingInitializer(factory.name.clone()))?;
    Ok(initializer.encode_input(init_args)?.into())
}

async fn wait_with_timeout(
    gateway: &dyn ChainGateway,
    tx_hash: H256,
    timeout: Option<Duration>,
) -> Result<TransactionReceipt, GatewayError> {
    let wait = gateway.wait_for_confirmations(tx_hash, 1);
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| GatewayError::Timeout(tx_hash))?,
        None => wait.await,
    }
}

/// Sends a contract creation transaction without waiting for it to be mined.
pub(crate) async fn send_deployment(
    gateway: &dyn ChainGateway,
    factory: &ContractFactory,
    constructor_args: &[Token],
    overrides: &TxOverrides,
) -> Result<H256, DeployError> {
    let tx = Eip1559TransactionRequest::new()
        .from(factory.signer)
        .data(factory.deploy_data(constructor_args)?);
    let tx_hash = gateway.send_transaction(overrides.apply(tx)).await?;
    tracing::debug!("Sent deployment of `{}` in {tx_hash:?}", factory.name);
    Ok(tx_hash)
}

pub(crate) fn created_address(receipt: &TransactionReceipt) -> Result<Address, GatewayError> {
    receipt
        .contract_address
        .ok_or(GatewayError::NoContractAddress(receipt.transaction_hash))
}

/// Deploys an implementation contract (no constructor arguments) and waits for it to be mined.
pub async fn deploy_implementation(
    ctx: &ChainContext,
    factory: &ContractFactory,
    overrides: &TxOverrides,
    timeout: Option<Duration>,
) -> Result<Address, DeployError> {
    let tx_hash = send_deployment(ctx.gateway(), factory, &[], overrides).await?;
    let receipt = wait_with_timeout(ctx.gateway(), tx_hash, timeout).await?;
    let implementation = created_address(&receipt)?;
    tracing::info!(
        "Deployed `{}` implementation at {implementation:?}",
        factory.name
    );
    Ok(implementation)
}

/// Deploys `implementation_factory` behind a new transparent proxy, initializing it
/// with `init_args` in the proxy constructor.
pub async fn deploy_proxy(
    ctx: &ChainContext,
    implementation_factory: &ContractFactory,
    init_args: &[Token],
    options: &ProxyDeployOptions,
) -> Result<DeployedProxy, DeployError> {
    let init_data = encode_initializer(implementation_factory, init_args)?;
    let proxy_factory =
        ctx.contract_factory(TRANSPARENT_PROXY_CONTRACT, implementation_factory.signer)?;

    let implementation_overrides = options
        .overrides
        .clone()
        .with_gas_limit(options.implementation_gas_limit);
    let implementation = deploy_implementation(
        ctx,
        implementation_factory,
        &implementation_overrides,
        options.timeout,
    )
    .await?;

    let proxy_overrides = options
        .overrides
        .next_nonce()
        .with_gas_limit(options.proxy_gas_limit);
    let proxy_args = [
        Token::Address(implementation),
        Token::Address(options.admin),
        Token::Bytes(init_data.to_vec()),
    ];
    let deploy_tx =
        send_deployment(ctx.gateway(), &proxy_factory, &proxy_args, &proxy_overrides).await?;
    let receipt = wait_with_timeout(ctx.gateway(), deploy_tx, options.timeout).await?;
    let proxy_address = created_address(&receipt)?;
    tracing::info!(
        "Deployed proxy for `{}` at {proxy_address:?} (admin {:?})",
        implementation_factory.name,
        options.admin
    );

    Ok(DeployedProxy {
        contract: ContractHandle::new(proxy_address, implementation_factory.abi.clone()),
        implementation,
        init_data,
        deploy_tx,
    })
}

fn word_to_address(word: H256) -> Address {
    Address::from_slice(&word.as_bytes()[12..])
}

/// Reads the implementation address from the ERC-1967 slot of a proxy.
pub async fn implementation_address(
    gateway: &dyn ChainGateway,
    proxy: Address,
) -> Result<Address, DeployError> {
    let word = gateway.storage_at(proxy, IMPLEMENTATION_SLOT).await?;
    let implementation = word_to_address(word);
    if implementation.is_zero() {
        return Err(StateError::NotAProxy(proxy).into());
    }
    Ok(implementation)
}

/// Reads the admin address from the ERC-1967 slot of a proxy.
pub async fn admin_address(
    gateway: &dyn ChainGateway,
    proxy: Address,
) -> Result<Address, DeployError> {
    let word = gateway.storage_at(proxy, ADMIN_SLOT).await?;
    Ok(word_to_address(word))
}
