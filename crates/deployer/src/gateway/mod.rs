//! Chain client abstraction used by the deployment core.

use std::fmt;

use async_trait::async_trait;
use ethers::{
    abi::{Abi, Token},
    types::{
        Address, Bytes, Eip1559TransactionRequest, NameOrAddress, TransactionReceipt, H256, U256,
    },
};

pub use self::{ethers_client::EthersGateway, mock::MockGateway};

mod ethers_client;
pub mod mock;

/// Errors reported by a [`ChainGateway`]. These are propagated as-is and never retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Problem on the node side (e.g. bad RPC call, network issues).
    #[error("Request to the chain client failed: {0}")]
    Provider(#[from] ethers::providers::ProviderError),
    /// Problem with the transaction signer.
    #[error("Transaction signing failed: {0}")]
    Signer(String),
    /// Generic RPC failure, e.g. an injected failure in tests.
    #[error("RPC failure: {0}")]
    Rpc(String),
    #[error("Transaction {0:?} was reverted")]
    Reverted(H256),
    #[error("Transaction {0:?} was dropped before being mined")]
    MissingReceipt(H256),
    #[error("Transaction {0:?} did not create a contract")]
    NoContractAddress(H256),
    #[error("Transaction recipient must be an address, got ENS name {0}")]
    UnresolvedName(String),
    #[error("Timed out waiting for transaction {0:?}")]
    Timeout(H256),
}

/// Common chain interface, as seen by the deployment core.
///
/// The trait only exposes primitives that don't depend on a particular contract.
/// Contract-level logic (factories, proxies, ERC-1967 reads) is built on top of it.
#[async_trait]
pub trait ChainGateway: 'static + fmt::Debug + Send + Sync {
    /// Chain ID of the network the gateway is currently connected to.
    async fn chain_id(&self) -> Result<u64, GatewayError>;

    /// Accounts that the gateway can sign transactions for, in a stable order.
    async fn accounts(&self) -> Result<Vec<Address>, GatewayError>;

    /// Signs and submits a transaction. `tx.from` selects the signing account.
    /// Returns the transaction hash without waiting for inclusion.
    async fn send_transaction(&self, tx: Eip1559TransactionRequest) -> Result<H256, GatewayError>;

    /// Waits until the transaction has been included and `confirmations` blocks were observed.
    /// Fails if the transaction reverted.
    async fn wait_for_confirmations(
        &self,
        tx_hash: H256,
        confirmations: u64,
    ) -> Result<TransactionReceipt, GatewayError>;

    /// Executes a read-only call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError>;

    /// Reads a raw storage slot of a contract.
    async fn storage_at(&self, address: Address, slot: H256) -> Result<H256, GatewayError>;

    /// Takes a snapshot of the chain state. Only supported by development nodes.
    async fn snapshot(&self) -> Result<U256, GatewayError>;

    /// Reverts the chain to a snapshot previously returned by [`Self::snapshot()`].
    async fn revert_to_snapshot(&self, id: U256) -> Result<(), GatewayError>;
}

/// Extracts the recipient address of a transaction, if any.
pub(crate) fn recipient(tx: &Eip1559TransactionRequest) -> Result<Option<Address>, GatewayError> {
    match &tx.to {
        None => Ok(None),
        Some(NameOrAddress::Address(address)) => Ok(Some(*address)),
        Some(NameOrAddress::Name(name)) => Err(GatewayError::UnresolvedName(name.clone())),
    }
}

/// Everything needed to deploy a contract on behalf of a signer.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    /// Name of the contract in the build artifacts.
    pub name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
    /// Account that signs the deployment transactions.
    pub signer: Address,
}

impl ContractFactory {
    /// Builds contract creation data: the bytecode followed by the ABI-encoded constructor args.
    pub fn deploy_data(&self, constructor_args: &[Token]) -> Result<Bytes, ethers::abi::Error> {
        let data = match self.abi.constructor() {
            Some(constructor) => {
                constructor.encode_input(self.bytecode.to_vec(), constructor_args)?
            }
            None if constructor_args.is_empty() => self.bytecode.to_vec(),
            None => return Err(ethers::abi::Error::InvalidData),
        };
        Ok(data.into())
    }
}

/// A deployed contract: an address paired with the ABI used to talk to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractHandle {
    pub address: Address,
    pub abi: Abi,
}

impl ContractHandle {
    pub fn new(address: Address, abi: Abi) -> Self {
        Self { address, abi }
    }

    /// ABI-encodes a call to one of the contract functions.
    pub fn encode_call(&self, function: &str, args: &[Token]) -> Result<Bytes, ethers::abi::Error> {
        let function = self.abi.function(function)?;
        Ok(function.encode_input(args)?.into())
    }

    /// Calls a view function and decodes its outputs.
    pub async fn query(
        &self,
        gateway: &dyn ChainGateway,
        function: &str,
        args: &[Token],
    ) -> Result<Vec<Token>, crate::DeployError> {
        let data = self.encode_call(function, args)?;
        let output = gateway.call(self.address, data).await?;
        let function = self.abi.function(function)?;
        Ok(function.decode_output(&output)?)
    }
}
