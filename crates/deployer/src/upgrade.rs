//! Preparation of proxy upgrades.
//!
//! Preparing an upgrade deploys the new implementation and encodes an optional migration call.
//! The upgrade itself is left to the proxy administrator.

use ethers::{
    abi::{
        token::{LenientTokenizer, Tokenizer},
        Abi, ParamType, Token,
    },
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};

use crate::{
    context::ChainContext,
    error::{ConfigError, DeployError},
    gateway::ContractFactory,
    options::{FeeOverrides, TxOverrides},
    proxy,
};

/// Call of a contract function, e.g. a migration executed together with an upgrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractCall {
    pub name: String,
    pub args: Vec<serde_json::Value>,
}

impl ContractCall {
    /// Parses a call descriptor. The descriptor must be a JSON object with exactly
    /// the `name` and `args` fields.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let malformed = |err: serde_json::Error| ConfigError::MalformedCall(err.to_string());
        let value: serde_json::Value = serde_json::from_str(raw).map_err(malformed)?;
        if !value.is_object() {
            return Err(ConfigError::MalformedCall(format!(
                "expected an object with `name` and `args`, got {value}"
            )));
        }
        serde_json::from_value(value).map_err(malformed)
    }

    /// ABI-encodes this call against `abi`, the ABI of contract `contract_name`.
    pub fn encode(&self, abi: &Abi, contract_name: &str) -> Result<Bytes, ConfigError> {
        let function = match abi.functions_by_name(&self.name).map(Vec::as_slice) {
            Ok([function]) => function,
            Ok([]) | Err(_) => {
                return Err(ConfigError::UnknownFunction {
                    contract: contract_name.to_owned(),
                    function: self.name.clone(),
                });
            }
            Ok(overloads) => {
                return Err(ConfigError::MalformedCall(format!(
                    "`{}` is overloaded ({} variants) in `{contract_name}`",
                    self.name,
                    overloads.len()
                )));
            }
        };
        if function.inputs.len() != self.args.len() {
            return Err(ConfigError::MalformedCall(format!(
                "`{}` takes {} arguments, {} provided",
                self.name,
                function.inputs.len(),
                self.args.len()
            )));
        }

        let tokens = function
            .inputs
            .iter()
            .zip(&self.args)
            .enumerate()
            .map(|(index, (param, value))| {
                tokenize(&param.kind, value).map_err(|reason| ConfigError::InvalidCallArgument {
                    function: self.name.clone(),
                    index,
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let data = function
            .encode_input(&tokens)
            .map_err(|err| ConfigError::MalformedCall(err.to_string()))?;
        Ok(data.into())
    }
}

fn value_to_literal(value: &serde_json::Value) -> Result<String, String> {
    Ok(match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(items) => {
            let items = items
                .iter()
                .map(value_to_literal)
                .collect::<Result<Vec<_>, _>>()?;
            format!("[{}]", items.join(","))
        }
        serde_json::Value::Null | serde_json::Value::Object(_) => {
            return Err(format!("unsupported argument value {value}"));
        }
    })
}

fn tokenize(kind: &ParamType, value: &serde_json::Value) -> Result<Token, String> {
    let literal = value_to_literal(value)?;
    LenientTokenizer::tokenize(kind, &literal).map_err(|err| err.to_string())
}

/// Options of [`prepare_upgrade()`].
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    pub confirmations: u64,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub implementation_gas_limit: Option<U256>,
    pub nonce: Option<U256>,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            implementation_gas_limit: None,
            nonce: None,
        }
    }
}

impl UpgradeOptions {
    /// Checks the options that do not depend on the chain, returning the fee pair.
    pub fn validate(&self) -> Result<Option<FeeOverrides>, ConfigError> {
        if self.confirmations < 1 {
            return Err(ConfigError::ConfirmationsTooLow);
        }
        FeeOverrides::from_parts(self.max_fee_per_gas, self.max_priority_fee_per_gas)
    }

    fn overrides(&self) -> Result<TxOverrides, ConfigError> {
        Ok(TxOverrides {
            fees: self.validate()?,
            gas_limit: self.implementation_gas_limit,
            nonce: self.nonce,
        })
    }
}

/// Upgrade ready to be executed by the proxy administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpgrade {
    pub implementation: Address,
    /// Encoded migration call to execute with `upgradeToAndCall`, if any.
    pub init_data: Option<Bytes>,
}

/// Deploys a new implementation for the proxy at `proxy_address` and encodes the optional
/// migration `call`. Does not touch the proxy.
pub async fn prepare_upgrade(
    ctx: &ChainContext,
    new_implementation: &ContractFactory,
    proxy_address: Address,
    options: &UpgradeOptions,
    call: Option<&ContractCall>,
) -> Result<PreparedUpgrade, DeployError> {
    let overrides = options.overrides()?;
    let init_data = call
        .map(|call| call.encode(&new_implementation.abi, &new_implementation.name))
        .transpose()?;

    let current = proxy::implementation_address(ctx.gateway(), proxy_address).await?;
    tracing::info!(
        "Preparing upgrade of proxy {proxy_address:?} from implementation {current:?} to `{}`",
        new_implementation.name
    );

    let tx_hash = proxy::send_deployment(ctx.gateway(), new_implementation, &[], &overrides).await?;
    let receipt = ctx
        .gateway()
        .wait_for_confirmations(tx_hash, options.confirmations)
        .await?;
    let implementation = proxy::created_address(&receipt)?;
    tracing::info!(
        "Deployed `{}` implementation at {implementation:?}",
        new_implementation.name
    );

    Ok(PreparedUpgrade {
        implementation,
        init_data,
    })
}
