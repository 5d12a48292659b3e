use crate::error::ExecutionError;
use crate::event_parser::{parse_cluster_update, EventDecoder};
use crate::gen::SSVContract;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use alloy::transports::http::{Client, Http};
use futures::future::{try_join_all, Future};
use rand::Rng;
use sensitive_url::SensitiveUrl;
use ssv_types::{ClusterSnapshot, OperatorId};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// SSV contract events that carry the state of an owner's clusters
static CLUSTER_EVENTS: LazyLock<Vec<&str>> = LazyLock::new(|| {
    vec![
        // event ValidatorAdded(address indexed owner, uint64[] operatorIds, bytes publicKey, bytes shares, Cluster cluster);
        SSVContract::ValidatorAdded::SIGNATURE,
        // event ValidatorRemoved(address indexed owner, uint64[] operatorIds, bytes publicKey, Cluster cluster);
        SSVContract::ValidatorRemoved::SIGNATURE,
        // event ClusterLiquidated(address indexed owner, uint64[] operatorIds, Cluster cluster);
        SSVContract::ClusterLiquidated::SIGNATURE,
        // event ClusterReactivated(address indexed owner, uint64[] operatorIds, Cluster cluster);
        SSVContract::ClusterReactivated::SIGNATURE,
        // event ClusterWithdrawn(address indexed owner, uint64[] operatorIds, uint256 value, Cluster cluster);
        SSVContract::ClusterWithdrawn::SIGNATURE,
        // event ClusterDeposited(address indexed owner, uint64[] operatorIds, uint256 value, Cluster cluster);
        SSVContract::ClusterDeposited::SIGNATURE,
    ]
});

/// Default batch size for log fetching
const BATCH_SIZE: u64 = 10000;

/// Batch size for task groups
const GROUP_SIZE: usize = 50;

/// Retry information for log fetching
const MAX_RETRIES: i32 = 5;

type RpcClient = RootProvider<Http<Client>>;

/// Read access to the registry state a registration run depends on.
///
/// Both reads are idempotent: with unchanged chain state they return the same result.
pub trait NetworkView {
    /// The nonce the owner's next validator registration must be signed with
    fn resolve_nonce(
        &self,
        owner: Address,
    ) -> impl Future<Output = Result<u64, ExecutionError>> + Send;

    /// The current snapshot of the owner's cluster made up of `operator_ids`
    fn resolve_cluster(
        &self,
        owner: Address,
        operator_ids: &[OperatorId],
    ) -> impl Future<Output = Result<ClusterSnapshot, ExecutionError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub http_url: SensitiveUrl,
    pub contract_address: Address,
    pub deployment_block: u64,
    pub batch_size: u64,
}

/// Resolves nonces and clusters by replaying the owner's SSV contract events.
///
/// The contract does not expose either value through a view function, so both are rebuilt from
/// the event history between the deployment block and the current head.
pub struct NetworkScanner {
    /// Http client connected to the L1 to fetch historical SSV event information
    rpc_client: Arc<RpcClient>,
    contract_address: Address,
    deployment_block: u64,
    batch_size: u64,
}

impl NetworkScanner {
    #[instrument(skip(config), fields(contract_address = ?config.contract_address))]
    /// Create a new NetworkScanner against the given endpoint
    pub fn new(config: &ScannerConfig) -> Result<Self, ExecutionError> {
        info!(
            http_url = %config.http_url,
            deployment_block = config.deployment_block,
            "Creating new SSV network scanner"
        );

        // Construct HTTP Provider
        let http_url = config.http_url.full.as_str().parse().map_err(|e| {
            ExecutionError::InvalidConfig(format!("Failed to parse HTTP URL: {e}"))
        })?;
        let rpc_client: Arc<RpcClient> = Arc::new(ProviderBuilder::new().on_http(http_url));

        Ok(Self {
            rpc_client,
            contract_address: config.contract_address,
            deployment_block: config.deployment_block,
            batch_size: config.batch_size.max(1),
        })
    }

    // Fetch every cluster event of the owner from the deployment block up to the current head.
    // The logs are returned in chain order
    #[instrument(skip(self))]
    async fn fetch_owner_logs(&self, owner: Address) -> Result<Vec<Log>, ExecutionError> {
        let end_block = self.rpc_client.get_block_number().await.map_err(|e| {
            error!(?e, "Failed to fetch block number");
            ExecutionError::RpcError(format!("Unable to fetch block number {}", e))
        })?;
        let start_block = self.deployment_block;
        if end_block < start_block {
            debug!(start_block, end_block, "Chain head is before the deployment block");
            return Ok(vec![]);
        }

        // Chunk the start and end block range into a set of ranges of size batch_size
        // and construct a future to fetch the logs in each range
        let batch_size = self.batch_size;
        let mut tasks: Vec<_> = (start_block..=end_block)
            .step_by(batch_size as usize)
            .map(|start| {
                let (start, end) = (start, std::cmp::min(start + batch_size - 1, end_block));
                self.fetch_logs(start, end, owner)
            })
            .collect();

        info!(start_block, end_block, ?owner, "Scanning owner events");

        // Await the ranges in groups of GROUP_SIZE so we do not flood the endpoint
        let mut event_logs = Vec::new();
        while !tasks.is_empty() {
            let group: Vec<_> = tasks.drain(..tasks.len().min(GROUP_SIZE)).collect();
            let logs: Vec<Vec<Log>> = try_join_all(group).await?;
            event_logs.extend(logs.into_iter().flatten());
        }

        // The futures may join out of order block wise. Reassemble by block and log index
        let mut ordered_event_logs: BTreeMap<(u64, u64), Log> = BTreeMap::new();
        for log in event_logs {
            let block_num = log.block_number.ok_or_else(|| {
                ExecutionError::RpcError("Log is missing block number".to_string())
            })?;
            let log_index = log.log_index.ok_or_else(|| {
                ExecutionError::RpcError("Log is missing log index".to_string())
            })?;
            ordered_event_logs.insert((block_num, log_index), log);
        }

        debug!(log_count = ordered_event_logs.len(), "Fetched owner events");
        Ok(ordered_event_logs.into_values().collect())
    }

    // Construct a future that will fetch the owner's logs in the range from_block..to_block
    fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
        owner: Address,
    ) -> impl Future<Output = Result<Vec<Log>, ExecutionError>> {
        // Setup filter and rpc client. The owner is the first indexed topic of every event
        let rpc_client = self.rpc_client.clone();
        let filter = Filter::new()
            .address(self.contract_address)
            .from_block(from_block)
            .to_block(to_block)
            .events(&*CLUSTER_EVENTS)
            .topic1(owner.into_word());

        // Try to fetch logs with a retry upon error. Try up to MAX_RETRIES times and error if we
        // exceed this as we can assume there is some underlying connection issue
        async move {
            let mut retry_cnt = 0;
            loop {
                match rpc_client.get_logs(&filter).await {
                    Ok(logs) => {
                        debug!(
                            log_count = logs.len(),
                            from_block, to_block, "Successfully fetched logs"
                        );
                        return Ok(logs);
                    }
                    Err(e) => {
                        if retry_cnt > MAX_RETRIES {
                            error!(?e, retry_cnt, "Max retries exceeded while fetching logs");
                            return Err(ExecutionError::RpcError(format!(
                                "Unable to fetch logs for blocks {from_block}..{to_block}"
                            )));
                        }

                        warn!(?e, retry_cnt, "Error fetching logs, retrying");

                        // increment retry_count and jitter retry duration
                        let jitter = rand::thread_rng().gen_range(0..=100);
                        let sleep_duration = Duration::from_millis(jitter);
                        tokio::time::sleep(sleep_duration).await;
                        retry_cnt += 1;
                    }
                }
            }
        }
    }
}

impl NetworkView for NetworkScanner {
    #[instrument(skip(self))]
    async fn resolve_nonce(&self, owner: Address) -> Result<u64, ExecutionError> {
        let logs = self.fetch_owner_logs(owner).await?;
        let nonce = nonce_from_logs(&logs, owner)?;
        info!(?owner, nonce, "Resolved owner nonce");
        Ok(nonce)
    }

    #[instrument(skip(self))]
    async fn resolve_cluster(
        &self,
        owner: Address,
        operator_ids: &[OperatorId],
    ) -> Result<ClusterSnapshot, ExecutionError> {
        let logs = self.fetch_owner_logs(owner).await?;
        let cluster = cluster_from_logs(&logs, owner, operator_ids);
        info!(?owner, ?cluster, "Resolved cluster snapshot");
        Ok(cluster)
    }
}

/// The owner's next nonce: one per validator the owner has ever registered.
///
/// A `ValidatorAdded` event that cannot be decoded is an error, since skipping it would sign
/// every later registration with a stale nonce
pub fn nonce_from_logs(logs: &[Log], owner: Address) -> Result<u64, ExecutionError> {
    let mut nonce = 0;
    for log in logs {
        if log.topic0() != Some(&SSVContract::ValidatorAdded::SIGNATURE_HASH) {
            continue;
        }
        let added = SSVContract::ValidatorAdded::decode_from_log(log)?;
        if added.owner == owner {
            nonce += 1;
        }
    }
    Ok(nonce)
}

/// The most recent state of the owner's cluster with exactly these operators.
///
/// Logs must be in chain order. A cluster that was never seen is a fresh, empty cluster
pub fn cluster_from_logs(
    logs: &[Log],
    owner: Address,
    operator_ids: &[OperatorId],
) -> ClusterSnapshot {
    let mut wanted = operator_ids.to_vec();
    wanted.sort();

    logs.iter()
        .filter_map(|log| parse_cluster_update(log).ok().flatten())
        .filter(|update| update.owner == owner)
        .filter(|update| {
            let mut ids = update.operator_ids.clone();
            ids.sort();
            ids == wanted
        })
        .last()
        .map(|update| update.cluster)
        .unwrap_or_default()
}
