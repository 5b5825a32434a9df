//! Persisted deployment records.
//!
//! A record only stores what cannot be queried from the chain. On load, administrators and
//! the implementation address are re-read from the live contracts, so that a record stays
//! usable after an upgrade that wasn't followed by a re-store.

use std::path::{Path, PathBuf};

use ethers::{
    abi::{Abi, Token},
    types::{Address, Bytes},
};
use serde::{Deserialize, Serialize};

use crate::{
    context::ChainContext,
    deploy::{ContractRecord, DeployResult, ProxyInfo},
    error::{DeployError, StateError},
    gateway::ContractHandle,
    proxy,
    store::BlobStoreError,
    token::{TokenContract, TokenSystem, TOKEN_ADMIN_GETTER},
};

pub const DEPLOYMENT_JSON_NAME: &str = "deployment.json";
const DEPLOYMENT_DIR: &str = "deployment";

/// Contents of `deployment.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub chain_id: u64,
    pub contracts: DeployedContracts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedContracts {
    pub token: ContractDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDescriptor {
    pub abi: serde_json::Value,
    pub contract_name: String,
    pub source_name: String,
    pub address: Address,
    pub bytecode_and_symbols: serde_json::Value,
    pub metadata: serde_json::Value,
    pub storage_layout: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_constructor_args: Option<ProxyConstructorArgs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConstructorArgs {
    pub implementation_address: Address,
    pub proxy_admin: Address,
    pub init_data: Bytes,
}

/// Default directory for the deployment record of the context network.
pub fn default_deployment_path(ctx: &ChainContext) -> PathBuf {
    let network = ctx.network();
    network.project_root.join(DEPLOYMENT_DIR).join(&network.name)
}

pub async fn deployment_exists(ctx: &ChainContext, dir: &Path) -> Result<bool, DeployError> {
    Ok(ctx.store().path_exists(&dir.join(DEPLOYMENT_JSON_NAME)).await?)
}

async fn describe(
    ctx: &ChainContext,
    record: &ContractRecord,
) -> Result<ContractDescriptor, DeployError> {
    let artifact = ctx.artifacts().read_artifact(&record.name)?;
    let build_info = ctx
        .artifacts()
        .build_info(&artifact.fully_qualified_name())?;

    let address = record.deployment.address();
    let proxy_constructor_args = match record.deployment.proxy() {
        Some(proxy_info) => Some(ProxyConstructorArgs {
            implementation_address: proxy::implementation_address(ctx.gateway(), address).await?,
            proxy_admin: proxy_info.proxy_admin,
            init_data: proxy_info.init_data.clone(),
        }),
        None => None,
    };

    Ok(ContractDescriptor {
        abi: artifact.abi_json,
        contract_name: artifact.contract_name,
        source_name: artifact.source_name,
        address,
        bytecode_and_symbols: build_info.evm,
        metadata: build_info.metadata,
        storage_layout: build_info.storage_layout,
        proxy_constructor_args,
    })
}

/// Writes the deployment record of `system` into `dir`, replacing the existing one.
pub async fn store_deployment(
    ctx: &ChainContext,
    system: &TokenSystem,
    dir: &Path,
) -> Result<(), DeployError> {
    let chain_id = ctx.gateway().chain_id().await?;
    let info = DeploymentInfo {
        chain_id,
        contracts: DeployedContracts {
            token: describe(ctx, &system.token.record).await?,
        },
    };

    let path = dir.join(DEPLOYMENT_JSON_NAME);
    ctx.store().ensure_dir(dir).await?;
    ctx.store().write_json(&path, &info).await?;
    tracing::info!("Stored deployment for chain {chain_id} at {path:?}");
    Ok(())
}

/// Loads the deployment record from `dir` and re-derives its live state from the chain.
pub async fn load_deployment(ctx: &ChainContext, dir: &Path) -> Result<TokenSystem, DeployError> {
    let path = dir.join(DEPLOYMENT_JSON_NAME);
    let info: DeploymentInfo = ctx.store().read_json(&path).await?;
    let connected = ctx.gateway().chain_id().await?;
    if info.chain_id != connected {
        return Err(StateError::ChainIdMismatch {
            stored: info.chain_id,
            connected,
        }
        .into());
    }

    let descriptor = info.contracts.token;
    let abi: Abi = serde_json::from_value(descriptor.abi).map_err(|source| {
        BlobStoreError::Serialization {
            path: path.clone(),
            source,
        }
    })?;
    let contract = ContractHandle::new(descriptor.address, abi);

    let token_admin = match contract
        .query(ctx.gateway(), TOKEN_ADMIN_GETTER, &[])
        .await?
        .as_slice()
    {
        [Token::Address(admin)] => *admin,
        _ => return Err(ethers::abi::Error::InvalidData.into()),
    };

    let deployment = match descriptor.proxy_constructor_args {
        Some(stored) => {
            let proxy_admin = proxy::admin_address(ctx.gateway(), contract.address).await?;
            let implementation_address =
                proxy::implementation_address(ctx.gateway(), contract.address).await?;
            DeployResult::Proxied {
                contract,
                proxy: ProxyInfo {
                    proxy_admin,
                    init_data: stored.init_data,
                    implementation_address,
                },
            }
        }
        None => DeployResult::Basic { contract },
    };

    Ok(TokenSystem {
        token: TokenContract {
            record: ContractRecord {
                name: descriptor.contract_name,
                deployment,
            },
            token_admin,
        },
    })
}
