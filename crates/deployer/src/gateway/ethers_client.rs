use std::fmt;

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest,
        TransactionReceipt, H256, U256, U64,
    },
};

use super::{ChainGateway, GatewayError};

/// HTTP-based gateway backed by an `ethers` provider.
///
/// Transactions from the wallet account are signed locally; transactions from any other
/// account are handed to the node, which must have that account unlocked (this is the case
/// for development nodes).
#[derive(Clone)]
pub struct EthersGateway {
    provider: Provider<Http>,
    wallet: Option<LocalWallet>,
}

impl fmt::Debug for EthersGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // We do not want to have a private key in the debug representation.
        f.debug_struct("EthersGateway")
            .field("provider", &self.provider)
            .field("wallet", &self.wallet.as_ref().map(Signer::address))
            .finish()
    }
}

impl EthersGateway {
    pub fn new(provider: Provider<Http>, wallet: Option<LocalWallet>) -> Self {
        Self { provider, wallet }
    }

    /// Connects to the node at `rpc_url`, optionally signing with the given private key.
    pub async fn connect(rpc_url: &str, private_key: Option<&str>) -> Result<Self, GatewayError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|err| GatewayError::Rpc(format!("invalid RPC URL `{rpc_url}`: {err}")))?;
        let wallet = match private_key {
            Some(key) => {
                let chain_id = provider.get_chainid().await?.as_u64();
                let wallet = key
                    .parse::<LocalWallet>()
                    .map_err(|err| GatewayError::Signer(err.to_string()))?;
                tracing::info!("Signing transactions with {:?}", wallet.address());
                Some(wallet.with_chain_id(chain_id))
            }
            None => None,
        };
        Ok(Self::new(provider, wallet))
    }

    fn local_signer(&self, from: Option<Address>) -> Option<&LocalWallet> {
        self.wallet
            .as_ref()
            .filter(|wallet| from.map_or(true, |from| from == wallet.address()))
    }
}

#[async_trait]
impl ChainGateway for EthersGateway {
    async fn chain_id(&self) -> Result<u64, GatewayError> {
        Ok(self.provider.get_chainid().await?.as_u64())
    }

    async fn accounts(&self) -> Result<Vec<Address>, GatewayError> {
        let mut accounts: Vec<_> = self.wallet.iter().map(Signer::address).collect();
        for account in self.provider.get_accounts().await? {
            if !accounts.contains(&account) {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    async fn send_transaction(&self, tx: Eip1559TransactionRequest) -> Result<H256, GatewayError> {
        let tx: TypedTransaction = tx.into();
        let tx_hash = match self.local_signer(tx.from().copied()) {
            Some(wallet) => {
                let client = SignerMiddleware::new(self.provider.clone(), wallet.clone());
                let tx_hash = *client
                    .send_transaction(tx, None)
                    .await
                    .map_err(|err| GatewayError::Signer(err.to_string()))?;
                tx_hash
            }
            None => *self.provider.send_transaction(tx, None).await?,
        };
        tracing::debug!("Submitted transaction {tx_hash:?}");
        Ok(tx_hash)
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: H256,
        confirmations: u64,
    ) -> Result<TransactionReceipt, GatewayError> {
        // A receipt only exists once the inclusion block was observed.
        let confirmations = confirmations.max(1) as usize;
        let receipt = PendingTransaction::new(tx_hash, &self.provider)
            .confirmations(confirmations)
            .await?
            .ok_or(GatewayError::MissingReceipt(tx_hash))?;
        if receipt.status == Some(U64::zero()) {
            return Err(GatewayError::Reverted(tx_hash));
        }
        Ok(receipt)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
        let tx: TypedTransaction = Eip1559TransactionRequest::new().to(to).data(data).into();
        Ok(self.provider.call(&tx, None).await?)
    }

    async fn storage_at(&self, address: Address, slot: H256) -> Result<H256, GatewayError> {
        Ok(self.provider.get_storage_at(address, slot, None).await?)
    }

    async fn snapshot(&self) -> Result<U256, GatewayError> {
        Ok(self.provider.request("evm_snapshot", ()).await?)
    }

    async fn revert_to_snapshot(&self, id: U256) -> Result<(), GatewayError> {
        let reverted: bool = self.provider.request("evm_revert", [id]).await?;
        if reverted {
            Ok(())
        } else {
            Err(GatewayError::Rpc(format!("snapshot {id} could not be reverted")))
        }
    }
}
