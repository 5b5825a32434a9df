use std::{path::PathBuf, sync::Arc};

use ethers::types::Address;

use crate::{
    artifacts::{ArtifactError, ArtifactRepository},
    gateway::{ChainGateway, ContractFactory},
    store::BlobStore,
};

/// Settings of the network the context is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Name of the network, e.g. `localhost` or `sepolia`. Deployment records are kept per network.
    pub name: String,
    pub project_root: PathBuf,
}

/// Everything the deployment workflows need to talk to a chain and persist results.
#[derive(Debug, Clone)]
pub struct ChainContext {
    gateway: Arc<dyn ChainGateway>,
    artifacts: Arc<dyn ArtifactRepository>,
    store: Arc<dyn BlobStore>,
    network: NetworkConfig,
}

impl ChainContext {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        artifacts: Arc<dyn ArtifactRepository>,
        store: Arc<dyn BlobStore>,
        network: NetworkConfig,
    ) -> Self {
        Self {
            gateway,
            artifacts,
            store,
            network,
        }
    }

    pub fn gateway(&self) -> &dyn ChainGateway {
        self.gateway.as_ref()
    }

    pub fn artifacts(&self) -> &dyn ArtifactRepository {
        self.artifacts.as_ref()
    }

    pub fn store(&self) -> &dyn BlobStore {
        self.store.as_ref()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Resolves a factory for the named contract deployed by `signer`.
    pub fn contract_factory(
        &self,
        name: &str,
        signer: Address,
    ) -> Result<ContractFactory, ArtifactError> {
        let artifact = self.artifacts.read_artifact(name)?;
        Ok(ContractFactory {
            name: artifact.contract_name,
            abi: artifact.abi,
            bytecode: artifact.bytecode,
            signer,
        })
    }
}
