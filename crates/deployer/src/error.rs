use ethers::types::Address;

use crate::{artifacts::ArtifactError, gateway::GatewayError, store::BlobStoreError};

/// Invalid user input. Always reported before any chain interaction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No wallet or signer defined for deployment")]
    MissingSigner,
    #[error("Invalid Ethereum address for the {role}: `{value}`")]
    InvalidAddress { role: &'static str, value: String },
    #[error("Confirmations can't be lower than 1")]
    ConfirmationsTooLow,
    #[error("`max-fee-per-gas` and `max-priority-fee-per-gas` must be overridden together")]
    PartialFeeOverride,
    #[error(
        "The proxy administrator and the token administrator need to be different addresses \
         (both are {0:?}); provide an explicit proxy administrator"
    )]
    AdminsNotDistinct(Address),
    #[error("Invalid fee value `{value}`: {reason}")]
    InvalidFee { value: String, reason: String },
    #[error("Function `{function}` is not present in the ABI of `{contract}`")]
    UnknownFunction { contract: String, function: String },
    #[error("Malformed contract call: {0}")]
    MalformedCall(String),
    #[error("Invalid argument #{index} for `{function}`: {reason}")]
    InvalidCallArgument {
        function: String,
        index: usize,
        reason: String,
    },
    #[error("At least 2 signers are required, got {0}")]
    NotEnoughSigners(usize),
    #[error("Contract `{0}` has no `initialize` function")]
    MissingInitializer(String),
}

/// Stored deployment state disagrees with the chain or with the requested operation.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Deployment was stored for chain {stored}, but the connected chain is {connected}")]
    ChainIdMismatch { stored: u64, connected: u64 },
    #[error("A deployment for {network} already exists")]
    DeploymentExists { network: String },
    #[error(
        "A deployment for the {network} network was not found; \
         ensure the correct network is configured"
    )]
    DeploymentNotFound { network: String },
    #[error("Contract at {0:?} is not a proxy: its implementation slot is empty")]
    NotAProxy(Address),
}

/// Any error that can happen while deploying, storing or loading contracts.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Store(#[from] BlobStoreError),
    #[error("ABI encoding failed: {0}")]
    Abi(#[from] ethers::abi::Error),
}
