//! User-facing deployment options and the per-transaction overrides derived from them.

use ethers::{
    types::{Address, Eip1559TransactionRequest, U256},
    utils::{parse_units, to_checksum, ParseUnits},
};

use crate::error::ConfigError;

/// EIP-1559 fee pair. Either both values are overridden or none of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeOverrides {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl FeeOverrides {
    /// Collapses the optional fee values into a pair, rejecting partial overrides.
    pub fn from_parts(
        max_fee_per_gas: Option<U256>,
        max_priority_fee_per_gas: Option<U256>,
    ) -> Result<Option<Self>, ConfigError> {
        match (max_fee_per_gas, max_priority_fee_per_gas) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => Ok(Some(Self {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::PartialFeeOverride),
        }
    }
}

/// Overrides forwarded verbatim to a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub fees: Option<FeeOverrides>,
    pub gas_limit: Option<U256>,
    pub nonce: Option<U256>,
}

impl TxOverrides {
    pub fn with_gas_limit(self, gas_limit: Option<U256>) -> Self {
        Self { gas_limit, ..self }
    }

    /// Overrides for a transaction sent right after this one: the nonce (if any) is incremented.
    pub fn next_nonce(&self) -> Self {
        Self {
            nonce: self.nonce.map(|nonce| nonce + 1),
            ..self.clone()
        }
    }

    pub fn apply(&self, mut tx: Eip1559TransactionRequest) -> Eip1559TransactionRequest {
        if let Some(fees) = self.fees {
            tx = tx
                .max_fee_per_gas(fees.max_fee_per_gas)
                .max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        }
        if let Some(gas_limit) = self.gas_limit {
            tx = tx.gas(gas_limit);
        }
        if let Some(nonce) = self.nonce {
            tx = tx.nonce(nonce);
        }
        tx
    }
}

/// Options of the token deployment workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOptions {
    /// Account with token mint and burn privileges.
    pub token_admin: Address,
    pub use_proxy: bool,
    pub confirmations: u64,
    /// Proxy administrator; defaults to the deploying signer.
    pub proxy_admin: Option<Address>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub proxy_gas_limit: Option<U256>,
    pub implementation_gas_limit: Option<U256>,
    /// First nonce to use. Further transactions use consecutive nonces.
    pub nonce: Option<U256>,
}

impl DeploymentOptions {
    pub fn new(token_admin: Address) -> Self {
        Self {
            token_admin,
            use_proxy: true,
            confirmations: 1,
            proxy_admin: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            proxy_gas_limit: None,
            implementation_gas_limit: None,
            nonce: None,
        }
    }

    /// Checks the options that do not depend on the chain, returning the fee pair.
    pub fn validate(&self) -> Result<Option<FeeOverrides>, ConfigError> {
        if self.confirmations < 1 {
            return Err(ConfigError::ConfirmationsTooLow);
        }
        FeeOverrides::from_parts(self.max_fee_per_gas, self.max_priority_fee_per_gas)
    }
}

/// Parses an Ethereum address. Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(role: &'static str, value: &str) -> Result<Address, ConfigError> {
    let invalid = || ConfigError::InvalidAddress {
        role,
        value: value.to_owned(),
    };
    let hex = value.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 {
        return Err(invalid());
    }
    let address: Address = value.parse().map_err(|_| invalid())?;

    let is_mixed_case = hex.chars().any(|c| c.is_ascii_lowercase())
        && hex.chars().any(|c| c.is_ascii_uppercase());
    if is_mixed_case && to_checksum(&address, None) != value {
        return Err(invalid());
    }
    Ok(address)
}

/// Parses a decimal amount of gwei into wei.
pub fn parse_gwei(value: &str) -> Result<U256, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidFee {
        value: value.to_owned(),
        reason,
    };
    match parse_units(value, "gwei").map_err(|err| invalid(err.to_string()))? {
        ParseUnits::U256(wei) => Ok(wei),
        ParseUnits::I256(_) => Err(invalid("fees cannot be negative".to_owned())),
    }
}
