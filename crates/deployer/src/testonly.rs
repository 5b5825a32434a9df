//! Test utilities shared by unit tests.

use std::{path::PathBuf, sync::Arc};

use ethers::{
    abi::{self, Abi, Token},
    types::{Address, Bytes},
};

use crate::{
    artifacts::{ContractArtifact, ContractBuildInfo, InMemoryArtifacts},
    context::{ChainContext, NetworkConfig},
    gateway::{GatewayError, MockGateway},
    proxy::TRANSPARENT_PROXY_CONTRACT,
    store::{BlobStore, MockBlobStore},
    token::{TOKEN_ADMIN_GETTER, TOKEN_CONTRACT_NAME},
};

pub(crate) const TOKEN_V2_CONTRACT_NAME: &str = "WDogeV2";
/// Contract taking the token administrator as a constructor argument.
pub(crate) const CONSTRUCTOR_TOKEN_CONTRACT_NAME: &str = "WDogeConstructed";

pub(crate) const TOKEN_BYTECODE: [u8; 4] = [0x01, 0x60, 0x80, 0x60];
pub(crate) const PROXY_BYTECODE: [u8; 4] = [0x02, 0x60, 0x80, 0x60];
const TOKEN_V2_BYTECODE: [u8; 4] = [0x03, 0x60, 0x80, 0x60];
const CONSTRUCTOR_TOKEN_BYTECODE: [u8; 4] = [0x04, 0x60, 0x80, 0x60];

fn token_functions() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({
            "type": "function",
            "name": "initialize",
            "inputs": [{ "name": "tokenAdmin", "type": "address" }],
            "outputs": [],
            "stateMutability": "nonpayable"
        }),
        serde_json::json!({
            "type": "function",
            "name": TOKEN_ADMIN_GETTER,
            "inputs": [],
            "outputs": [{ "name": "", "type": "address" }],
            "stateMutability": "view"
        }),
    ]
}

pub(crate) fn token_abi_json() -> serde_json::Value {
    serde_json::Value::Array(token_functions())
}

pub(crate) fn token_v2_abi_json() -> serde_json::Value {
    let mut functions = token_functions();
    functions.push(serde_json::json!({
        "type": "function",
        "name": "setRate",
        "inputs": [{ "name": "rate", "type": "uint256" }],
        "outputs": [],
        "stateMutability": "nonpayable"
    }));
    serde_json::Value::Array(functions)
}

fn constructor_token_abi_json() -> serde_json::Value {
    let mut functions = token_functions();
    functions.push(serde_json::json!({
        "type": "constructor",
        "inputs": [{ "name": "tokenAdmin", "type": "address" }],
        "stateMutability": "nonpayable"
    }));
    serde_json::Value::Array(functions)
}

fn proxy_abi_json() -> serde_json::Value {
    serde_json::json!([{
        "type": "constructor",
        "inputs": [
            { "name": "logic", "type": "address" },
            { "name": "admin", "type": "address" },
            { "name": "data", "type": "bytes" }
        ],
        "stateMutability": "payable"
    }])
}

pub(crate) fn artifact(
    contract_name: &str,
    source_name: &str,
    abi_json: serde_json::Value,
    bytecode: &[u8],
) -> ContractArtifact {
    ContractArtifact {
        contract_name: contract_name.to_owned(),
        source_name: source_name.to_owned(),
        abi: serde_json::from_value::<Abi>(abi_json.clone()).unwrap(),
        abi_json,
        bytecode: Bytes::from(bytecode.to_vec()),
    }
}

pub(crate) fn build_info(contract_name: &str) -> ContractBuildInfo {
    ContractBuildInfo {
        evm: serde_json::json!({
            "bytecode": { "object": "01608060", "linkReferences": {} },
            "methodIdentifiers": { "owner()": "8da5cb5b" }
        }),
        metadata: serde_json::Value::String(format!("{{\"contract\":\"{contract_name}\"}}")),
        storage_layout: serde_json::json!({ "storage": [], "types": null }),
    }
}

pub(crate) fn test_artifacts() -> InMemoryArtifacts {
    let contracts = [
        (TOKEN_CONTRACT_NAME, "contracts/WDoge.sol", token_abi_json(), &TOKEN_BYTECODE),
        (
            TOKEN_V2_CONTRACT_NAME,
            "contracts/WDogeV2.sol",
            token_v2_abi_json(),
            &TOKEN_V2_BYTECODE,
        ),
        (
            CONSTRUCTOR_TOKEN_CONTRACT_NAME,
            "contracts/test/WDogeConstructed.sol",
            constructor_token_abi_json(),
            &CONSTRUCTOR_TOKEN_BYTECODE,
        ),
        (
            TRANSPARENT_PROXY_CONTRACT,
            "@openzeppelin/contracts/proxy/transparent/TransparentUpgradeableProxy.sol",
            proxy_abi_json(),
            &PROXY_BYTECODE,
        ),
    ];
    contracts.into_iter().fold(
        InMemoryArtifacts::default(),
        |artifacts, (name, source, abi, bytecode)| {
            artifacts.with(artifact(name, source, abi, bytecode), build_info(name))
        },
    )
}

/// Mock gateway recognizing test proxy deployments and answering token admin queries
/// with `token_admin`.
pub(crate) fn mock_gateway(token_admin: Address) -> MockGateway {
    let abi: Abi = serde_json::from_value(token_abi_json()).unwrap();
    let getter = abi.function(TOKEN_ADMIN_GETTER).unwrap().clone();
    MockGateway::default()
        .with_proxy_bytecode(Bytes::from(PROXY_BYTECODE.to_vec()))
        .with_call_handler(move |_, data| {
            if data.to_vec() != getter.short_signature() {
                return Err(GatewayError::Rpc(format!("unexpected call: {data}")));
            }
            Ok(abi::encode(&[Token::Address(token_admin)]).into())
        })
}

pub(crate) fn network(project_root: impl Into<PathBuf>) -> NetworkConfig {
    NetworkConfig {
        name: "localhost".to_owned(),
        project_root: project_root.into(),
    }
}

pub(crate) fn context_with(gateway: MockGateway, store: Arc<dyn BlobStore>) -> ChainContext {
    ChainContext::new(
        Arc::new(gateway),
        Arc::new(test_artifacts()),
        store,
        network("/project"),
    )
}

pub(crate) fn context(gateway: MockGateway) -> ChainContext {
    context_with(gateway, MockBlobStore::arc())
}
