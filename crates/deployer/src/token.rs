use ethers::{abi::Token, types::Address};

use crate::{
    context::ChainContext,
    deploy::{deploy_contract, ContractRecord, DeployOptions, FactoryOptions},
    error::{ConfigError, DeployError},
    options::DeploymentOptions,
    strategy::DeployStrategy,
};

/// Name of the token contract in the build artifacts.
pub const TOKEN_CONTRACT_NAME: &str = "WDoge";

/// View function returning the token administrator.
pub const TOKEN_ADMIN_GETTER: &str = "owner";

/// Deployed token contract.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenContract {
    pub record: ContractRecord,
    /// Account with mint and burn privileges.
    pub token_admin: Address,
}

/// All contracts making up the token system.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSystem {
    pub token: TokenContract,
}

/// Deploys the token, behind a proxy unless `options.use_proxy` is unset.
pub async fn deploy_token(
    ctx: &ChainContext,
    deploy_signer: Address,
    options: &DeploymentOptions,
) -> Result<TokenSystem, DeployError> {
    let fees = options.validate()?;
    let strategy = if options.use_proxy {
        let proxy_admin = options.proxy_admin.unwrap_or(deploy_signer);
        if proxy_admin == options.token_admin {
            return Err(ConfigError::AdminsNotDistinct(proxy_admin).into());
        }
        DeployStrategy::Proxy
    } else {
        DeployStrategy::PlainWithInit
    };

    let deploy_options = DeployOptions {
        confirmations: Some(options.confirmations),
        fees,
        nonce: options.nonce,
        proxy_admin: options.proxy_admin,
        proxy_gas_limit: options.proxy_gas_limit,
        implementation_gas_limit: options.implementation_gas_limit,
    };
    let deployment = deploy_contract(
        TOKEN_CONTRACT_NAME,
        vec![Token::Address(options.token_admin)],
        ctx,
        &FactoryOptions {
            signer: Some(deploy_signer),
        },
        deploy_options,
        strategy,
    )
    .await?;

    Ok(TokenSystem {
        token: TokenContract {
            record: ContractRecord {
                name: TOKEN_CONTRACT_NAME.to_owned(),
                deployment,
            },
            token_admin: options.token_admin,
        },
    })
}
