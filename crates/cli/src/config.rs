use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_NETWORK: &str = "localhost";

/// Operator configuration read from `DEPLOYER_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployerConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Name of the network; selects the deployment record directory.
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Hardhat artifacts directory. Defaults to `<project_root>/artifacts`.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    /// Hex-encoded key used to sign transactions. Without it, the node's own accounts sign.
    #[serde(default)]
    pub private_key: Option<String>,
    /// Networks on which an existing deployment record may be overwritten.
    #[serde(default = "default_redeployable_networks")]
    pub redeployable_networks: Vec<String>,
}

fn default_rpc_url() -> String {
    tracing::info!("Using default DEPLOYER_RPC_URL: {DEFAULT_RPC_URL}");
    DEFAULT_RPC_URL.to_owned()
}

fn default_network() -> String {
    tracing::info!("Using default DEPLOYER_NETWORK: {DEFAULT_NETWORK}");
    DEFAULT_NETWORK.to_owned()
}

fn default_project_root() -> PathBuf {
    tracing::info!("Using current directory as DEPLOYER_PROJECT_ROOT");
    PathBuf::from(".")
}

fn default_redeployable_networks() -> Vec<String> {
    vec![DEFAULT_NETWORK.to_owned()]
}

impl DeployerConfig {
    pub fn from_env() -> envy::Result<Self> {
        envy::prefixed("DEPLOYER_").from_env()
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join("artifacts"))
    }

    pub fn is_redeployable(&self) -> bool {
        self.redeployable_networks.contains(&self.network)
    }
}
