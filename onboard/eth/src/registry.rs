use crate::error::ExecutionError;
use crate::event_parser::parse_cluster_update;
use crate::gen::{SSVContract, SSVToken};
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use futures::Future;
use sensitive_url::SensitiveUrl;
use ssv_types::{ClusterSnapshot, OperatorId};
use std::time::Duration;
use tracing::{debug, info, instrument};
use types::PublicKey;

/// Arguments of a single `registerValidator` call
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorRegistration {
    pub public_key: PublicKey,
    pub operator_ids: Vec<OperatorId>,
    pub shares_data: Vec<u8>,
    /// SSV tokens deposited into the cluster along with the registration
    pub amount: U256,
    /// The cluster state the contract currently holds for the owner and operators
    pub cluster: ClusterSnapshot,
}

/// The outcome of a confirmed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// The cluster state emitted by a `ValidatorAdded` event in this transaction
    pub cluster: Option<ClusterSnapshot>,
}

/// Write access to the SSV network contract on behalf of a single owner
pub trait Registry {
    /// The account that signs and pays for every transaction
    fn owner(&self) -> Address;

    /// Allow the network contract to spend `amount` of the owner's SSV tokens
    fn approve(&self, amount: U256)
        -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send;

    /// Submit a validator registration and wait for it to be confirmed
    fn register_validator(
        &self,
        registration: ValidatorRegistration,
    ) -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send;
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub http_url: SensitiveUrl,
    pub registry_address: Address,
    pub token_address: Address,
    /// How long to wait for a receipt. The transport default applies when unset
    pub confirmation_timeout: Option<Duration>,
}

/// Sends transactions to the SSV network and token contracts from the owner's wallet
pub struct RegistryClient<P> {
    provider: P,
    owner: Address,
    registry_address: Address,
    token_address: Address,
    confirmation_timeout: Option<Duration>,
}

/// Connect to the execution endpoint with the owner's key.
///
/// Fails if the endpoint cannot be reached, so a bad endpoint aborts before any work is done
#[instrument(skip_all, fields(http_url = %config.http_url))]
pub async fn connect_registry(
    config: &RegistryConfig,
    signer: PrivateKeySigner,
) -> Result<RegistryClient<impl Provider<Http<Client>> + Clone>, ExecutionError> {
    let owner = signer.address();
    let wallet = EthereumWallet::from(signer);

    let http_url = config.http_url.full.as_str().parse().map_err(|e| {
        ExecutionError::InvalidConfig(format!("Failed to parse HTTP URL: {e}"))
    })?;
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(http_url);

    let chain_id = provider.get_chain_id().await.map_err(|e| {
        ExecutionError::RpcError(format!("Unable to reach execution endpoint: {e}"))
    })?;
    info!(
        chain_id,
        ?owner,
        registry = ?config.registry_address,
        token = ?config.token_address,
        "Connected to execution endpoint"
    );

    Ok(RegistryClient::new(provider, owner, config))
}

impl<P> RegistryClient<P>
where
    P: Provider<Http<Client>> + Clone,
{
    pub fn new(provider: P, owner: Address, config: &RegistryConfig) -> Self {
        Self {
            provider,
            owner,
            registry_address: config.registry_address,
            token_address: config.token_address,
            confirmation_timeout: config.confirmation_timeout,
        }
    }

    // Wait for a sent transaction to land and make sure it did not revert
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Http<Client>, Ethereum>,
        action: &str,
    ) -> Result<TransactionReceipt, ExecutionError> {
        let tx_hash = *pending.tx_hash();
        debug!(?tx_hash, action, "Transaction sent, waiting for receipt");

        let receipt = pending
            .with_timeout(self.confirmation_timeout)
            .get_receipt()
            .await
            .map_err(|e| {
                ExecutionError::TransactionFailed(format!(
                    "{action} transaction {tx_hash} was not confirmed: {e}"
                ))
            })?;

        if !receipt.status() {
            return Err(ExecutionError::Reverted(format!(
                "{action} transaction {tx_hash} reverted"
            )));
        }
        Ok(receipt)
    }

    // The cluster emitted by the network contract while registering a validator, if any
    fn emitted_cluster(&self, receipt: &TransactionReceipt) -> Option<ClusterSnapshot> {
        receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.address() == self.registry_address)
            .filter_map(|log| parse_cluster_update(log).ok().flatten())
            .filter(|update| update.validator_added)
            .map(|update| update.cluster)
            .last()
    }
}

impl<P> Registry for RegistryClient<P>
where
    P: Provider<Http<Client>> + Clone,
{
    fn owner(&self) -> Address {
        self.owner
    }

    #[instrument(skip(self))]
    async fn approve(&self, amount: U256) -> Result<TxReceipt, ExecutionError> {
        let token = SSVToken::new(self.token_address, &self.provider);
        let pending = token
            .approve(self.registry_address, amount)
            .send()
            .await
            .map_err(|e| {
                ExecutionError::TransactionFailed(format!("Failed to send approval: {e}"))
            })?;

        let receipt = self.confirm(pending, "approve").await?;
        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            cluster: None,
        })
    }

    #[instrument(skip_all, fields(validator = ?registration.public_key))]
    async fn register_validator(
        &self,
        registration: ValidatorRegistration,
    ) -> Result<TxReceipt, ExecutionError> {
        let contract = SSVContract::new(self.registry_address, &self.provider);
        let pending = contract
            .registerValidator(
                Bytes::copy_from_slice(&registration.public_key.serialize()),
                registration.operator_ids.iter().map(|id| **id).collect(),
                Bytes::from(registration.shares_data),
                registration.amount,
                SSVContract::Cluster::from(&registration.cluster),
            )
            .send()
            .await
            .map_err(|e| {
                ExecutionError::TransactionFailed(format!("Failed to send registration: {e}"))
            })?;

        let receipt = self.confirm(pending, "registerValidator").await?;
        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            cluster: self.emitted_cluster(&receipt),
        })
    }
}
