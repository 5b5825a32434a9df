// Config
pub(super) const MSG_LOADING_CONFIG: &str = "Failed to load DEPLOYER_* environment configuration";
pub(super) const MSG_CONNECTING_TO_NODE: &str = "Failed to connect to the Ethereum node";

// Deploy
pub(super) const MSG_NO_DEPLOYER_ACCOUNT: &str = "Node exposes no account to deploy from";
pub(super) const MSG_DEPLOYING_TOKEN: &str = "Deploying token";
pub(super) const MSG_TOKEN_DEPLOYED: &str = "Token deployed";
pub(super) const MSG_DEPLOYMENT_STORED: &str = "Deployment stored at";

// Inspect
pub(super) const MSG_TOKEN_ADDRESS: &str = "Token address";
pub(super) const MSG_TOKEN_ADMIN: &str = "Token administrator";
pub(super) const MSG_PROXY_ADMIN: &str = "Proxy administrator";
pub(super) const MSG_IMPLEMENTATION: &str = "Implementation address";
pub(super) const MSG_NOT_PROXIED: &str = "Token is not deployed behind a proxy";

// Upgrade
pub(super) const MSG_READING_CALL_ARGS: &str = "Failed to read migration call file";
pub(super) const MSG_NEW_IMPLEMENTATION: &str = "New implementation address";
pub(super) const MSG_MIGRATION_CALL_DATA: &str = "Migration call data";
pub(super) const MSG_NO_MIGRATION_CALL: &str = "No migration call";

// List functions
pub(super) const MSG_FUNCTIONS_OF: &str = "Functions of";

pub(super) fn msg_network(network: &str, chain_id: u64) -> String {
    format!("Network `{network}` (chain id {chain_id})")
}
