mod cli;
pub mod config;
mod keystore;
mod report;
mod state;

#[cfg(test)]
mod tests;

pub use cli::Onboard;
pub use config::{Config, ConfigError, RegistrarConfig};
pub use keystore::{
    discover_keystores, Eip2335Decryptor, KeystoreDecryptor, KeystoreError, KeystoreJob,
};
pub use report::{BatchReport, FailureKind, ValidatorOutcome, ValidatorReport, ValidatorStage};
pub use state::{NoncePolicy, RunState};

use alloy::primitives::Address;
use eth::{
    connect_registry, ExecutionError, NetworkScanner, NetworkView, Registry, TxReceipt,
    ValidatorRegistration,
};
use keysplit::{build_payload, encrypt_shares, ThresholdSplitter};
use report::ValidatorProgress;
use ssv_types::OperatorId;
use std::fmt::Display;
use tracing::{debug, error, info, instrument, warn};

/// Errors that stop the whole run. Anything that goes wrong with a single validator is recorded
/// in the report instead
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrarError {
    Keystore(KeystoreError),
    Approval(ExecutionError),
    Resolve(ExecutionError),
}

impl Display for RegistrarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for RegistrarError {}

// Why a single validator could not be registered
struct Failure {
    kind: FailureKind,
    detail: String,
}

impl Failure {
    fn new(kind: FailureKind, error: impl Display) -> Self {
        Self {
            kind,
            detail: error.to_string(),
        }
    }
}

/// Registers every keystore in a directory with the SSV network, one validator at a time.
///
/// Each validator moves through decrypt, split, encrypt, build and submit. A validator that
/// fails at any step is recorded and the run carries on with the next one.
pub struct Registrar<R, N, D> {
    registry: R,
    network: N,
    decryptor: D,
    config: RegistrarConfig,
    splitter: ThresholdSplitter,
    operator_ids: Vec<OperatorId>,
}

impl<R, N, D> Registrar<R, N, D>
where
    R: Registry,
    N: NetworkView,
    D: KeystoreDecryptor,
{
    pub fn new(config: RegistrarConfig, registry: R, network: N, decryptor: D) -> Self {
        let operator_ids = config.operators.iter().map(|op| op.id).collect();
        Self {
            registry,
            network,
            decryptor,
            splitter: ThresholdSplitter::new(config.threshold),
            operator_ids,
            config,
        }
    }

    /// Register every discovered validator and report the outcome of each
    #[instrument(skip(self), fields(owner = ?self.registry.owner()))]
    pub async fn run(&self) -> Result<BatchReport, RegistrarError> {
        let owner = self.registry.owner();

        let jobs = discover_keystores(&self.config.keystore_dir, &self.config.password_dir)
            .map_err(RegistrarError::Keystore)?;
        if jobs.is_empty() {
            warn!(dir = %self.config.keystore_dir.display(), "No keystores found, nothing to register");
            return Ok(BatchReport::default());
        }
        info!(validators = jobs.len(), operators = ?self.operator_ids, "Starting registration");

        let receipt = self
            .registry
            .approve(self.config.approval_amount)
            .await
            .map_err(RegistrarError::Approval)?;
        info!(tx_hash = ?receipt.tx_hash, amount = %self.config.approval_amount, "Approved SSV spending");

        let nonce = self
            .network
            .resolve_nonce(owner)
            .await
            .map_err(RegistrarError::Resolve)?;
        let cluster = self
            .network
            .resolve_cluster(owner, &self.operator_ids)
            .await
            .map_err(RegistrarError::Resolve)?;
        info!(nonce, ?cluster, "Resolved owner state");

        let mut state = RunState::new(nonce, cluster);
        let mut report = BatchReport {
            starting_nonce: nonce,
            ..Default::default()
        };
        for (index, job) in jobs.iter().enumerate() {
            debug!(
                index,
                keystore = %job.keystore_path.display(),
                nonce = state.nonce.current(),
                "Processing validator"
            );
            let validator = self.register_one(job, owner, &mut state).await;
            report.validators.push(validator);
        }
        report.final_nonce = state.nonce.current();

        Ok(report)
    }

    // Drive one validator to its outcome and bring the run state up to date
    async fn register_one(
        &self,
        job: &KeystoreJob,
        owner: Address,
        state: &mut RunState,
    ) -> ValidatorReport {
        let mut progress = ValidatorProgress::new(job.keystore_path.clone());

        match self.process(job, owner, state, &mut progress).await {
            Ok(receipt) => {
                info!(
                    keystore = %job.keystore_path.display(),
                    tx_hash = ?receipt.tx_hash,
                    block_number = receipt.block_number,
                    "Validator registered"
                );
                self.refresh_cluster(owner, &receipt, state).await;
                progress.confirm(&receipt)
            }
            Err(failure) => {
                error!(
                    keystore = %job.keystore_path.display(),
                    validator = ?progress.public_key(),
                    stage = ?progress.stage(),
                    kind = ?failure.kind,
                    error = %failure.detail,
                    "Failed to register validator"
                );
                // The counter already moved past the nonce of the failed payload, and a
                // submission that errored may still have landed
                if progress.stage() >= Some(ValidatorStage::PayloadBuilt) {
                    self.recover_state(owner, state).await;
                }
                progress.fail(failure.kind, failure.detail)
            }
        }
    }

    async fn process(
        &self,
        job: &KeystoreJob,
        owner: Address,
        state: &mut RunState,
        progress: &mut ValidatorProgress,
    ) -> Result<TxReceipt, Failure> {
        let keys = {
            let (keystore, password) = job
                .read()
                .map_err(|e| Failure::new(FailureKind::Keystore, e))?;
            self.decryptor
                .decrypt(&keystore, &password)
                .map_err(|e| Failure::new(FailureKind::Keystore, e))?
        };
        progress.decrypted(keys.public_key().clone());

        let key_shares = self
            .splitter
            .split(keys.secret_key(), &self.config.operators)
            .map_err(|e| Failure::new(FailureKind::Split, e))?;
        let shares = encrypt_shares(&key_shares, &self.config.operators)
            .map_err(|e| Failure::new(FailureKind::Encrypt, e))?;
        drop(key_shares);
        progress.shares_built();

        let payload = build_payload(&keys, &shares, owner, &mut state.nonce)
            .map_err(|e| Failure::new(FailureKind::Payload, e))?;
        progress.payload_built(payload.owner_nonce);
        payload
            .verify(&owner)
            .map_err(|e| Failure::new(FailureKind::Payload, e))?;

        progress.submitted();
        self.registry
            .register_validator(ValidatorRegistration {
                public_key: payload.public_key,
                operator_ids: payload.operator_ids,
                shares_data: payload.shares_data,
                amount: self.config.registration_amount,
                cluster: state.cluster.clone(),
            })
            .await
            .map_err(|e| Failure::new(FailureKind::Submission, e))
    }

    // The next registration must carry the cluster as the contract now stores it
    async fn refresh_cluster(&self, owner: Address, receipt: &TxReceipt, state: &mut RunState) {
        if let Some(cluster) = &receipt.cluster {
            state.cluster = cluster.clone();
            return;
        }
        match self.network.resolve_cluster(owner, &self.operator_ids).await {
            Ok(cluster) => state.cluster = cluster,
            Err(e) => warn!(
                error = %e,
                "Unable to refresh the cluster, the next registration may revert"
            ),
        }
    }

    async fn recover_state(&self, owner: Address, state: &mut RunState) {
        if self.config.nonce_policy == NoncePolicy::Continue {
            warn!(
                nonce = state.nonce.current(),
                "Keeping the local nonce after a failed registration"
            );
            return;
        }

        match self.network.resolve_nonce(owner).await {
            Ok(nonce) => {
                info!(
                    local = state.nonce.current(),
                    network = nonce,
                    "Resynchronised owner nonce"
                );
                state.nonce.resync(nonce);
            }
            Err(e) => warn!(
                error = %e,
                nonce = state.nonce.current(),
                "Unable to resynchronise the owner nonce, keeping the local value"
            ),
        }
        match self.network.resolve_cluster(owner, &self.operator_ids).await {
            Ok(cluster) => {
                debug!(?cluster, "Resynchronised cluster snapshot");
                state.cluster = cluster;
            }
            Err(e) => warn!(
                error = %e,
                "Unable to resynchronise the cluster, keeping the local snapshot"
            ),
        }
    }
}

/// Connects to the execution endpoint and registers every validator in the keystore directory
pub async fn run(config: Config) -> Result<BatchReport, String> {
    info!(
        owner = ?config.owner(),
        registry = ?config.registry_address,
        rpc_url = %config.rpc_url,
        keystore_dir = ?config.registrar.keystore_dir,
        "Starting the SSV onboarding run"
    );

    let registry = connect_registry(&config.registry_config(), config.owner_signer.clone())
        .await
        .map_err(|e| format!("Unable to connect to the execution endpoint: {e}"))?;
    let scanner = NetworkScanner::new(&config.scanner_config())
        .map_err(|e| format!("Unable to create the network scanner: {e}"))?;

    let registrar = Registrar::new(config.registrar.clone(), registry, scanner, Eip2335Decryptor);
    let report = registrar.run().await.map_err(|e| e.to_string())?;

    report.log_summary();
    if let Some(path) = &config.report_file {
        report.write_json(path)?;
        info!(path = %path.display(), "Wrote registration report");
    }
    Ok(report)
}
