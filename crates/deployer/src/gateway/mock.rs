//! Mock implementation of [`ChainGateway`].

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use ethers::{
    abi::{self, ParamType, Token},
    types::{
        Address, Bytes, Eip1559TransactionRequest, TransactionReceipt, H256, U256, U64,
    },
    utils::{get_contract_address, keccak256},
};

use super::{recipient, ChainGateway, GatewayError};
use crate::proxy::{ADMIN_SLOT, IMPLEMENTATION_SLOT};

/// Transaction recorded by [`MockGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockTx {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub data: Bytes,
    pub nonce: U256,
    pub gas: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    /// Address of the created contract, for deployment transactions.
    pub created: Option<Address>,
}

/// Chain state of the mock; cloned to take snapshots.
#[derive(Debug, Clone, Default)]
struct MockChainState {
    block_number: u64,
    nonces: HashMap<Address, U256>,
    sent_txs: Vec<MockTx>,
    receipts: HashMap<H256, TransactionReceipt>,
    storage: HashMap<(Address, H256), H256>,
    code: HashMap<Address, Bytes>,
}

/// Mutable part of [`MockGateway`] that needs to be synchronized via an `RwLock`.
#[derive(Debug, Default)]
struct MockGatewayInner {
    state: MockChainState,
    snapshots: Vec<MockChainState>,
    submission_attempts: usize,
    confirmation_requests: Vec<(H256, u64)>,
}

type CallHandler = dyn Fn(Address, &Bytes) -> Result<Bytes, GatewayError> + Send + Sync;

/// Mock gateway recording all the incoming requests for the further analysis.
///
/// Transactions are mined instantly, one block per transaction. Contract creations whose
/// data starts with the configured proxy bytecode are treated as transparent proxies:
/// their constructor arguments populate the ERC-1967 implementation and admin slots.
#[derive(Clone)]
pub struct MockGateway {
    chain_id: u64,
    accounts: Vec<Address>,
    proxy_bytecode: Option<Bytes>,
    failing_submission: Option<usize>,
    inner: Arc<RwLock<MockGatewayInner>>,
    call_handler: Arc<CallHandler>,
}

impl fmt::Debug for MockGateway {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MockGateway")
            .field("chain_id", &self.chain_id)
            .field("accounts", &self.accounts)
            .field("failing_submission", &self.failing_submission)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            chain_id: Self::DEFAULT_CHAIN_ID,
            accounts: (1..=5).map(Address::repeat_byte).collect(),
            proxy_bytecode: None,
            failing_submission: None,
            inner: Arc::default(),
            call_handler: Arc::new(|to, data| {
                panic!("Unexpected eth_call to {to:?}: {data}");
            }),
        }
    }
}

impl MockGateway {
    pub const DEFAULT_CHAIN_ID: u64 = 31_337;

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        Self { chain_id, ..self }
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        Self { accounts, ..self }
    }

    /// Treats contract creations starting with `bytecode` as transparent proxy deployments.
    pub fn with_proxy_bytecode(self, bytecode: Bytes) -> Self {
        Self {
            proxy_bytecode: Some(bytecode),
            ..self
        }
    }

    /// Makes the `index`-th (0-based) transaction submission fail with an RPC error.
    pub fn with_failing_submission(self, index: usize) -> Self {
        Self {
            failing_submission: Some(index),
            ..self
        }
    }

    pub fn with_call_handler<F>(self, call_handler: F) -> Self
    where
        F: 'static + Fn(Address, &Bytes) -> Result<Bytes, GatewayError> + Send + Sync,
    {
        Self {
            call_handler: Arc::new(call_handler),
            ..self
        }
    }

    /// Returns the transactions accepted by this gateway, in submission order.
    pub fn sent_txs(&self) -> Vec<MockTx> {
        self.inner.read().unwrap().state.sent_txs.clone()
    }

    /// Returns the number of transactions accepted by this gateway.
    pub fn sent_tx_count(&self) -> usize {
        self.inner.read().unwrap().state.sent_txs.len()
    }

    /// Returns `(tx_hash, confirmations)` pairs for every confirmation wait, in order.
    pub fn confirmation_requests(&self) -> Vec<(H256, u64)> {
        self.inner.read().unwrap().confirmation_requests.clone()
    }

    pub fn set_storage(&self, address: Address, slot: H256, value: H256) {
        let mut inner = self.inner.write().unwrap();
        inner.state.storage.insert((address, slot), value);
    }

    /// Returns the creation data of the contract deployed at `address`, if any.
    pub fn code_at(&self, address: Address) -> Option<Bytes> {
        self.inner.read().unwrap().state.code.get(&address).cloned()
    }

    fn proxy_constructor_args(&self, data: &Bytes) -> Option<(Address, Address)> {
        let bytecode = self.proxy_bytecode.as_ref()?;
        let prefix: &[u8] = bytecode.as_ref();
        let args = data.strip_prefix(prefix)?;
        let tokens = abi::decode(
            &[ParamType::Address, ParamType::Address, ParamType::Bytes],
            args,
        )
        .ok()?;
        match tokens.as_slice() {
            [Token::Address(implementation), Token::Address(admin), _] => {
                Some((*implementation, *admin))
            }
            _ => None,
        }
    }
}

fn address_to_word(address: Address) -> H256 {
    H256::from(address)
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn chain_id(&self) -> Result<u64, GatewayError> {
        Ok(self.chain_id)
    }

    async fn accounts(&self) -> Result<Vec<Address>, GatewayError> {
        Ok(self.accounts.clone())
    }

    async fn send_transaction(&self, tx: Eip1559TransactionRequest) -> Result<H256, GatewayError> {
        let to = recipient(&tx)?;
        let from = tx.from.unwrap_or(self.accounts[0]);
        let data = tx.data.clone().unwrap_or_default();
        let proxy_args = if to.is_none() {
            self.proxy_constructor_args(&data)
        } else {
            None
        };

        let mut inner = self.inner.write().unwrap();
        let attempt = inner.submission_attempts;
        inner.submission_attempts += 1;
        if self.failing_submission == Some(attempt) {
            return Err(GatewayError::Rpc(format!(
                "transaction #{attempt} rejected by the node"
            )));
        }

        let state = &mut inner.state;
        let account_nonce = state.nonces.get(&from).copied().unwrap_or_default();
        let nonce = tx.nonce.unwrap_or(account_nonce);
        state.nonces.insert(from, account_nonce.max(nonce + 1));

        let hash = {
            let mut preimage = from.as_bytes().to_vec();
            let mut nonce_bytes = [0_u8; 32];
            nonce.to_big_endian(&mut nonce_bytes);
            preimage.extend_from_slice(&nonce_bytes);
            preimage.extend_from_slice(&data);
            H256(keccak256(preimage))
        };

        let created = to.is_none().then(|| get_contract_address(from, nonce));
        if let Some(address) = created {
            state.code.insert(address, data.clone());
            if let Some((implementation, admin)) = proxy_args {
                state
                    .storage
                    .insert((address, IMPLEMENTATION_SLOT), address_to_word(implementation));
                state
                    .storage
                    .insert((address, ADMIN_SLOT), address_to_word(admin));
            }
        }

        state.block_number += 1;
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(state.block_number.into()),
            from,
            to,
            contract_address: created,
            status: Some(U64::one()),
            ..TransactionReceipt::default()
        };
        state.receipts.insert(hash, receipt);
        state.sent_txs.push(MockTx {
            hash,
            from,
            to,
            data,
            nonce,
            gas: tx.gas,
            max_fee_per_gas: tx.max_fee_per_gas,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
            created,
        });
        Ok(hash)
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: H256,
        confirmations: u64,
    ) -> Result<TransactionReceipt, GatewayError> {
        let mut inner = self.inner.write().unwrap();
        inner.confirmation_requests.push((tx_hash, confirmations));
        inner
            .state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(GatewayError::MissingReceipt(tx_hash))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
        (self.call_handler)(to, &data)
    }

    async fn storage_at(&self, address: Address, slot: H256) -> Result<H256, GatewayError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .state
            .storage
            .get(&(address, slot))
            .copied()
            .unwrap_or_default())
    }

    async fn snapshot(&self) -> Result<U256, GatewayError> {
        let mut inner = self.inner.write().unwrap();
        let snapshot = inner.state.clone();
        inner.snapshots.push(snapshot);
        Ok((inner.snapshots.len() - 1).into())
    }

    async fn revert_to_snapshot(&self, id: U256) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().unwrap();
        let index = id.as_usize();
        if index >= inner.snapshots.len() {
            return Err(GatewayError::Rpc(format!("unknown snapshot {id}")));
        }
        inner.snapshots.truncate(index + 1);
        inner.state = inner.snapshots.pop().unwrap_or_default();
        Ok(())
    }
}
