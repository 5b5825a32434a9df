//! Deployment and upgrade orchestration for the upgradeable wrapped Doge token.
//!
//! The crate is organized leaf-first:
//!
//! - [`gateway`] abstracts the chain client ([`ChainGateway`]), with an `ethers`-based
//!   implementation and an in-memory mock.
//! - [`artifacts`] and [`store`] abstract the compiler output and the file system.
//! - [`proxy`] implements transparent proxy deployment and ERC-1967 introspection on top
//!   of the gateway.
//! - [`DeployStrategy`], [`deploy_contract()`] and [`deploy_token()`] implement the deployment
//!   workflow.
//! - [`prepare_upgrade()`] prepares (but never executes) proxy upgrades.
//! - [`store_deployment()`] and [`load_deployment()`] persist and reload deployment records.
//! - [`FixtureCache`] amortizes deployments across a test suite.

pub use crate::{
    context::{ChainContext, NetworkConfig},
    deploy::{
        deploy_contract, ContractRecord, DeployOptions, DeployResult, FactoryOptions, ProxyInfo,
    },
    deployment::{
        default_deployment_path, deployment_exists, load_deployment, store_deployment,
        ContractDescriptor, DeploymentInfo, ProxyConstructorArgs, DEPLOYMENT_JSON_NAME,
    },
    error::{ConfigError, DeployError, StateError},
    fixture::{ChainSnapshot, FixtureCache},
    gateway::{ChainGateway, ContractFactory, ContractHandle, GatewayError},
    options::{parse_address, parse_gwei, DeploymentOptions, FeeOverrides, TxOverrides},
    strategy::{DeployStrategy, StrategyOptions},
    token::{deploy_token, TokenContract, TokenSystem, TOKEN_ADMIN_GETTER, TOKEN_CONTRACT_NAME},
    upgrade::{prepare_upgrade, ContractCall, PreparedUpgrade, UpgradeOptions},
};

pub mod artifacts;
mod context;
mod deploy;
mod deployment;
mod error;
mod fixture;
pub mod gateway;
mod options;
pub mod proxy;
pub mod store;
mod strategy;
mod token;
mod upgrade;

#[cfg(test)]
pub(crate) mod testonly;
#[cfg(test)]
mod tests;
