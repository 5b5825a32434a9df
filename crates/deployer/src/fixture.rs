//! Helpers for test suites running against a development chain.

use std::sync::Arc;

use ethers::types::U256;
use tokio::sync::Mutex;

use crate::{
    context::ChainContext,
    error::{ConfigError, DeployError},
    gateway::{ChainGateway, GatewayError},
    options::DeploymentOptions,
    token::{deploy_token, TokenSystem},
};

/// Deploys the token system once and hands out the same instance afterwards.
#[derive(Debug, Default)]
pub struct FixtureCache {
    slot: Mutex<Option<Arc<TokenSystem>>>,
}

impl FixtureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached system, deploying it on the first call.
    ///
    /// The last available signer deploys the token and administers the proxy; the first one
    /// administers the token. Once cached, `ctx` is ignored.
    pub async fn deploy_fixture(
        &self,
        ctx: &ChainContext,
    ) -> Result<Arc<TokenSystem>, DeployError> {
        let mut slot = self.slot.lock().await;
        if let Some(system) = &*slot {
            return Ok(system.clone());
        }

        let signers = ctx.gateway().accounts().await?;
        if signers.len() < 2 {
            return Err(ConfigError::NotEnoughSigners(signers.len()).into());
        }
        let token_admin = signers[0];
        let proxy_admin = signers[signers.len() - 1];

        let options = DeploymentOptions::new(token_admin);
        let system = Arc::new(deploy_token(ctx, proxy_admin, &options).await?);
        *slot = Some(system.clone());
        Ok(system)
    }

    /// Forgets the cached system, so that the next call deploys a new one.
    pub async fn reset(&self) {
        *self.slot.lock().await = None;
    }
}

/// Chain state snapshot. Reverting discards all state changes made after the snapshot.
#[derive(Debug)]
#[must_use = "snapshot should be reverted"]
pub struct ChainSnapshot {
    id: U256,
}

impl ChainSnapshot {
    pub async fn take(gateway: &dyn ChainGateway) -> Result<Self, GatewayError> {
        let id = gateway.snapshot().await?;
        tracing::debug!("Took chain snapshot {id}");
        Ok(Self { id })
    }

    pub fn id(&self) -> U256 {
        self.id
    }

    /// Reverts the chain to this snapshot. The snapshot cannot be reused afterwards.
    pub async fn revert(self, gateway: &dyn ChainGateway) -> Result<(), GatewayError> {
        gateway.revert_to_snapshot(self.id).await?;
        tracing::debug!("Reverted chain to snapshot {}", self.id);
        Ok(())
    }
}
