//! Deployment workflow tests running against the mock gateway.

use std::sync::Arc;

use assert_matches::assert_matches;
use ethers::{
    abi::{self, Abi, Token},
    types::{Address, Bytes, U256},
};
use test_casing::test_casing;

use crate::{
    proxy::{IMPLEMENTATION_SLOT, TRANSPARENT_PROXY_CONTRACT},
    testonly::{
        context, mock_gateway, token_abi_json, CONSTRUCTOR_TOKEN_CONTRACT_NAME, PROXY_BYTECODE,
        TOKEN_BYTECODE,
    },
    *,
};


const TOKEN_ADMIN: Address = Address::repeat_byte(1);
const DEPLOYER: Address = Address::repeat_byte(5);

fn initialize_call(token_admin: Address) -> Bytes {
    let abi: Abi = serde_json::from_value(token_abi_json()).unwrap();
    abi.function("initialize")
        .unwrap()
        .encode_input(&[Token::Address(token_admin)])
        .unwrap()
        .into()
}

fn with_bytecode(bytecode: &[u8], args: &[Token]) -> Bytes {
    let mut data = bytecode.to_vec();
    data.extend_from_slice(&abi::encode(args));
    data.into()
}

#[tokio::test]
async fn plain_strategy_passes_init_args_to_constructor() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let fees = FeeOverrides {
        max_fee_per_gas: 100.into(),
        max_priority_fee_per_gas: 3.into(),
    };
    let options = DeployOptions {
        fees: Some(fees),
        nonce: Some(7.into()),
        implementation_gas_limit: Some(1_000_000.into()),
        ..DeployOptions::default()
    };

    let result = deploy_contract(
        CONSTRUCTOR_TOKEN_CONTRACT_NAME,
        vec![Token::Address(TOKEN_ADMIN)],
        &ctx,
        &FactoryOptions {
            signer: Some(DEPLOYER),
        },
        options,
        DeployStrategy::default(),
    )
    .await
    .unwrap();

    let sent_txs = gateway.sent_txs();
    assert_eq!(sent_txs.len(), 1);
    let tx = &sent_txs[0];
    assert_eq!(tx.from, DEPLOYER);
    assert_eq!(tx.to, None);
    assert_eq!(tx.nonce, 7.into());
    assert_eq!(tx.gas, Some(1_000_000.into()));
    assert_eq!(tx.max_fee_per_gas, Some(fees.max_fee_per_gas));
    assert_eq!(tx.max_priority_fee_per_gas, Some(fees.max_priority_fee_per_gas));
    let expected_data = with_bytecode(&[0x04, 0x60, 0x80, 0x60], &[Token::Address(TOKEN_ADMIN)]);
    assert_eq!(tx.data, expected_data);

    assert_matches!(
        &result,
        DeployResult::Basic { contract } if Some(contract.address) == tx.created
    );
    // Confirmations default to 0 if not specified.
    assert_eq!(gateway.confirmation_requests(), [(tx.hash, 0)]);
}

#[tokio::test]
async fn missing_signer_fails_before_chain_interaction() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let err = deploy_contract(
        TOKEN_CONTRACT_NAME,
        vec![],
        &ctx,
        &FactoryOptions::default(),
        DeployOptions::default(),
        DeployStrategy::Plain,
    )
    .await
    .unwrap_err();

    assert_matches!(err, DeployError::Config(ConfigError::MissingSigner));
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[tokio::test]
async fn unknown_contract_is_reported() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let err = deploy_contract(
        "NoSuchToken",
        vec![],
        &ctx,
        &FactoryOptions {
            signer: Some(DEPLOYER),
        },
        DeployOptions::default(),
        DeployStrategy::Plain,
    )
    .await
    .unwrap_err();

    assert_matches!(
        err,
        DeployError::Artifact(crate::artifacts::ArtifactError::NotFound(name))
            if name == "NoSuchToken"
    );
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[test_casing(2, [None, Some(10)])]
#[tokio::test]
async fn plain_with_init_uses_consecutive_nonces(nonce: Option<u64>) {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let options = DeploymentOptions {
        use_proxy: false,
        confirmations: 2,
        nonce: nonce.map(U256::from),
        implementation_gas_limit: Some(2_000_000.into()),
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };

    let system = deploy_token(&ctx, DEPLOYER, &options).await.unwrap();

    let sent_txs = gateway.sent_txs();
    assert_eq!(sent_txs.len(), 2);
    let (deploy_tx, init_tx) = (&sent_txs[0], &sent_txs[1]);
    let first_nonce = U256::from(nonce.unwrap_or(0));
    assert_eq!(deploy_tx.nonce, first_nonce);
    assert_eq!(init_tx.nonce, first_nonce + 1);

    assert_eq!(deploy_tx.data, Bytes::from(TOKEN_BYTECODE.to_vec()));
    assert_eq!(deploy_tx.gas, Some(2_000_000.into()));
    let token_address = deploy_tx.created.unwrap();
    assert_eq!(init_tx.to, Some(token_address));
    assert_eq!(init_tx.data, initialize_call(TOKEN_ADMIN));
    assert_eq!(init_tx.gas, None);

    assert_eq!(
        gateway.confirmation_requests(),
        [(deploy_tx.hash, 2), (init_tx.hash, 2)]
    );
    let token = &system.token;
    assert_eq!(token.record.name, TOKEN_CONTRACT_NAME);
    assert_eq!(token.token_admin, TOKEN_ADMIN);
    assert_matches!(
        &token.record.deployment,
        DeployResult::Basic { contract } if contract.address == token_address
    );
}

#[test_casing(2, [DeployStrategy::Plain, DeployStrategy::PlainWithInit])]
#[tokio::test]
async fn deployments_without_gas_limit_leave_gas_unset(strategy: DeployStrategy) {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let fees = FeeOverrides {
        max_fee_per_gas: 50.into(),
        max_priority_fee_per_gas: 2.into(),
    };
    let (contract_name, init_args) = match strategy {
        DeployStrategy::Plain => (
            CONSTRUCTOR_TOKEN_CONTRACT_NAME,
            vec![Token::Address(TOKEN_ADMIN)],
        ),
        _ => (TOKEN_CONTRACT_NAME, vec![Token::Address(TOKEN_ADMIN)]),
    };
    let options = DeployOptions {
        fees: Some(fees),
        nonce: Some(3.into()),
        ..DeployOptions::default()
    };

    deploy_contract(
        contract_name,
        init_args,
        &ctx,
        &FactoryOptions {
            signer: Some(DEPLOYER),
        },
        options,
        strategy,
    )
    .await
    .unwrap();

    let sent_txs = gateway.sent_txs();
    let expected_count = if strategy == DeployStrategy::Plain { 1 } else { 2 };
    assert_eq!(sent_txs.len(), expected_count);
    for (i, tx) in sent_txs.iter().enumerate() {
        assert_eq!(tx.gas, None);
        assert_eq!(tx.nonce, U256::from(3 + i));
        assert_eq!(tx.max_fee_per_gas, Some(fees.max_fee_per_gas));
        assert_eq!(tx.max_priority_fee_per_gas, Some(fees.max_priority_fee_per_gas));
    }
}

#[tokio::test]
async fn proxy_deployment_reports_all_proxy_fields() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let options = DeploymentOptions {
        confirmations: 3,
        nonce: Some(4.into()),
        proxy_gas_limit: Some(700_000.into()),
        implementation_gas_limit: Some(3_000_000.into()),
        max_fee_per_gas: Some(50.into()),
        max_priority_fee_per_gas: Some(1.into()),
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };

    let system = deploy_token(&ctx, DEPLOYER, &options).await.unwrap();

    let sent_txs = gateway.sent_txs();
    assert_eq!(sent_txs.len(), 2);
    let (implementation_tx, proxy_tx) = (&sent_txs[0], &sent_txs[1]);
    assert_eq!(implementation_tx.nonce, 4.into());
    assert_eq!(implementation_tx.gas, Some(3_000_000.into()));
    assert_eq!(proxy_tx.nonce, 5.into());
    assert_eq!(proxy_tx.gas, Some(700_000.into()));
    for tx in &sent_txs {
        assert_eq!(tx.max_fee_per_gas, Some(50.into()));
        assert_eq!(tx.max_priority_fee_per_gas, Some(1.into()));
    }

    let implementation = implementation_tx.created.unwrap();
    let init_data = initialize_call(TOKEN_ADMIN);
    let expected_proxy_data = with_bytecode(
        &PROXY_BYTECODE,
        &[
            Token::Address(implementation),
            Token::Address(DEPLOYER),
            Token::Bytes(init_data.to_vec()),
        ],
    );
    assert_eq!(proxy_tx.data, expected_proxy_data);

    let deployment = &system.token.record.deployment;
    assert_eq!(deployment.address(), proxy_tx.created.unwrap());
    assert_eq!(deployment.contract().abi, serde_json::from_value::<Abi>(token_abi_json()).unwrap());
    let proxy = deployment.proxy().unwrap();
    assert_eq!(proxy.proxy_admin, DEPLOYER);
    assert_eq!(proxy.implementation_address, implementation);
    assert_eq!(proxy.init_data, init_data);

    let confirmations = gateway.confirmation_requests();
    assert_eq!(confirmations.last(), Some(&(proxy_tx.hash, 3)));
}

#[test_casing(2, [false, true])]
#[tokio::test]
async fn deployment_result_has_proxy_fields_iff_proxy_is_used(use_proxy: bool) {
    let ctx = context(mock_gateway(TOKEN_ADMIN));
    let options = DeploymentOptions {
        use_proxy,
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };
    let system = deploy_token(&ctx, DEPLOYER, &options).await.unwrap();
    let deployment = &system.token.record.deployment;
    assert_eq!(deployment.proxy().is_some(), use_proxy);
}

#[tokio::test]
async fn explicit_proxy_admin_is_used() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let proxy_admin = Address::repeat_byte(0x42);
    let options = DeploymentOptions {
        proxy_admin: Some(proxy_admin),
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };
    let system = deploy_token(&ctx, DEPLOYER, &options).await.unwrap();

    let proxy = system.token.record.deployment.proxy().unwrap();
    assert_eq!(proxy.proxy_admin, proxy_admin);
    let admin = proxy::admin_address(&gateway, system.token.record.deployment.address())
        .await
        .unwrap();
    assert_eq!(admin, proxy_admin);
}

#[test_casing(2, [(true, false), (false, true)])]
#[tokio::test]
async fn partial_fee_override_is_rejected(max_fee: bool, max_priority_fee: bool) {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let options = DeploymentOptions {
        max_fee_per_gas: max_fee.then(|| U256::from(10)),
        max_priority_fee_per_gas: max_priority_fee.then(|| U256::from(1)),
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };

    let err = deploy_token(&ctx, DEPLOYER, &options).await.unwrap_err();
    assert_matches!(err, DeployError::Config(ConfigError::PartialFeeOverride));
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[test_casing(2, [None, Some(TOKEN_ADMIN)])]
#[tokio::test]
async fn token_admin_must_differ_from_proxy_admin(proxy_admin: Option<Address>) {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let options = DeploymentOptions {
        proxy_admin,
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };
    // Without an explicit proxy admin, the deployer administers the proxy.
    let deployer = TOKEN_ADMIN;

    let err = deploy_token(&ctx, deployer, &options).await.unwrap_err();
    assert_matches!(
        err,
        DeployError::Config(ConfigError::AdminsNotDistinct(admin)) if admin == TOKEN_ADMIN
    );
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[tokio::test]
async fn zero_confirmations_are_rejected() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let options = DeploymentOptions {
        confirmations: 0,
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };
    let err = deploy_token(&ctx, DEPLOYER, &options).await.unwrap_err();
    assert_matches!(err, DeployError::Config(ConfigError::ConfirmationsTooLow));
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[tokio::test]
async fn failed_initialization_is_propagated() {
    let gateway = mock_gateway(TOKEN_ADMIN).with_failing_submission(1);
    let ctx = context(gateway.clone());
    let options = DeploymentOptions {
        use_proxy: false,
        ..DeploymentOptions::new(TOKEN_ADMIN)
    };

    let err = deploy_token(&ctx, DEPLOYER, &options).await.unwrap_err();
    assert_matches!(err, DeployError::Gateway(GatewayError::Rpc(_)));
    // The token contract itself was deployed.
    assert_eq!(gateway.sent_tx_count(), 1);
}

#[tokio::test]
async fn missing_proxy_artifact_fails_after_encoding() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = ChainContext::new(
        Arc::new(gateway.clone()),
        Arc::new(crate::artifacts::InMemoryArtifacts::default().with(
            testonly::artifact(
                TOKEN_CONTRACT_NAME,
                "contracts/WDoge.sol",
                token_abi_json(),
                &TOKEN_BYTECODE,
            ),
            testonly::build_info(TOKEN_CONTRACT_NAME),
        )),
        store::MockBlobStore::arc(),
        testonly::network("/project"),
    );

    let err = deploy_token(&ctx, DEPLOYER, &DeploymentOptions::new(TOKEN_ADMIN))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        DeployError::Artifact(crate::artifacts::ArtifactError::NotFound(name))
            if name == TRANSPARENT_PROXY_CONTRACT
    );
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[tokio::test]
async fn fixture_is_deployed_once() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let cache = FixtureCache::new();

    let system = cache.deploy_fixture(&ctx).await.unwrap();
    assert_eq!(gateway.sent_tx_count(), 2);
    assert_eq!(system.token.token_admin, Address::repeat_byte(1));
    let proxy = system.token.record.deployment.proxy().unwrap();
    assert_eq!(proxy.proxy_admin, Address::repeat_byte(5));
    assert!(gateway.sent_txs().iter().all(|tx| tx.from == Address::repeat_byte(5)));

    // Another context is ignored once the fixture is cached.
    let other_gateway = mock_gateway(TOKEN_ADMIN);
    let other_ctx = context(other_gateway.clone());
    let cached = cache.deploy_fixture(&other_ctx).await.unwrap();
    assert!(Arc::ptr_eq(&system, &cached));
    assert_eq!(gateway.sent_tx_count(), 2);
    assert_eq!(other_gateway.sent_tx_count(), 0);

    cache.reset().await;
    let redeployed = cache.deploy_fixture(&ctx).await.unwrap();
    assert!(!Arc::ptr_eq(&system, &redeployed));
    assert_eq!(gateway.sent_tx_count(), 4);
}

#[tokio::test]
async fn fixture_requires_two_signers() {
    let gateway = mock_gateway(TOKEN_ADMIN).with_accounts(vec![DEPLOYER]);
    let ctx = context(gateway.clone());
    let err = FixtureCache::new().deploy_fixture(&ctx).await.unwrap_err();
    assert_matches!(err, DeployError::Config(ConfigError::NotEnoughSigners(1)));
    assert_eq!(gateway.sent_tx_count(), 0);
}

#[tokio::test]
async fn snapshot_reverts_deployments() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let ctx = context(gateway.clone());
    let snapshot = ChainSnapshot::take(&gateway).await.unwrap();

    let system = deploy_token(&ctx, DEPLOYER, &DeploymentOptions::new(TOKEN_ADMIN))
        .await
        .unwrap();
    let proxy_address = system.token.record.deployment.address();
    assert_eq!(gateway.sent_tx_count(), 2);

    snapshot.revert(&gateway).await.unwrap();
    assert_eq!(gateway.sent_tx_count(), 0);
    assert!(gateway.code_at(proxy_address).is_none());
    let err = proxy::implementation_address(&gateway, proxy_address)
        .await
        .unwrap_err();
    assert_matches!(err, DeployError::State(StateError::NotAProxy(_)));

    // Nonces are reverted as well, so the same addresses are produced.
    let redeployed = deploy_token(&ctx, DEPLOYER, &DeploymentOptions::new(TOKEN_ADMIN))
        .await
        .unwrap();
    assert_eq!(redeployed.token.record.deployment.address(), proxy_address);
}

#[tokio::test]
async fn nested_snapshots() {
    let gateway = mock_gateway(TOKEN_ADMIN);
    let outer = ChainSnapshot::take(&gateway).await.unwrap();
    let slot_value = Address::repeat_byte(9).into();
    gateway.set_storage(DEPLOYER, IMPLEMENTATION_SLOT, slot_value);
    let inner = ChainSnapshot::take(&gateway).await.unwrap();
    assert_ne!(outer.id(), inner.id());

    gateway.set_storage(DEPLOYER, IMPLEMENTATION_SLOT, Default::default());
    inner.revert(&gateway).await.unwrap();
    let implementation = proxy::implementation_address(&gateway, DEPLOYER).await.unwrap();
    assert_eq!(implementation, Address::repeat_byte(9));

    outer.revert(&gateway).await.unwrap();
    proxy::implementation_address(&gateway, DEPLOYER)
        .await
        .unwrap_err();
}
