use super::test_prelude::*;
use crate::{KeystoreDecryptor, KeystoreError};
use alloy::primitives::{hex, B256};
use eth::{ExecutionError, NetworkView, Registry, TxReceipt};
use keysplit::{ownership_hash, parse_secret_key, parse_shares_data, ValidatorKeys};
use openssl::pkey::Private;
use openssl::rsa::Rsa;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use types::{PublicKey, SecretKey};

const DEFAULT_NUM_OPERATORS: u64 = 4;
const RSA_KEY_SIZE: u32 = 2048;
const REGISTRATION_AMOUNT: u64 = 1000;

// In memory stand-in for the SSV network contract and the owner's event history
#[derive(Debug)]
pub struct MockChain {
    pub owner: Address,
    pub nonce: Mutex<u64>,
    pub cluster: Mutex<ClusterSnapshot>,
    pub approvals: Mutex<Vec<U256>>,
    pub registrations: Mutex<Vec<ValidatorRegistration>>,
    // Indices of registerValidator calls that revert
    pub reverting_calls: Mutex<HashSet<usize>>,
    // Indices of registerValidator calls that land on chain but whose receipt never arrives
    pub lost_receipts: Mutex<HashSet<usize>>,
    pub emit_cluster: Mutex<bool>,
    pub fail_approval: Mutex<bool>,
    pub fail_resolve: Mutex<bool>,
    pub nonce_reads: Mutex<usize>,
    pub cluster_reads: Mutex<usize>,
}

impl MockChain {
    pub fn new(owner: Address, nonce: u64) -> Self {
        Self {
            owner,
            nonce: Mutex::new(nonce),
            cluster: Mutex::new(ClusterSnapshot::default()),
            approvals: Mutex::new(vec![]),
            registrations: Mutex::new(vec![]),
            reverting_calls: Mutex::new(HashSet::new()),
            lost_receipts: Mutex::new(HashSet::new()),
            emit_cluster: Mutex::new(true),
            fail_approval: Mutex::new(false),
            fail_resolve: Mutex::new(false),
            nonce_reads: Mutex::new(0),
            cluster_reads: Mutex::new(0),
        }
    }

    // Mirrors the acceptance rules of the network: the cluster must match the stored one and
    // the shares must be signed with the owner's next nonce
    fn accept(
        &self,
        call: usize,
        registration: &ValidatorRegistration,
    ) -> Result<TxReceipt, ExecutionError> {
        if self.reverting_calls.lock().contains(&call) {
            return Err(ExecutionError::Reverted(format!("Call {call} reverted")));
        }

        let mut cluster = self.cluster.lock();
        if registration.cluster != *cluster {
            return Err(ExecutionError::Reverted("IncorrectClusterState".to_string()));
        }

        let mut nonce = self.nonce.lock();
        let parsed = parse_shares_data(&registration.shares_data, registration.operator_ids.len())
            .map_err(|e| ExecutionError::Reverted(e.to_string()))?;
        if !parsed
            .signature
            .verify(&registration.public_key, ownership_hash(&self.owner, *nonce))
        {
            return Err(ExecutionError::Reverted(format!(
                "Shares are not signed with nonce {}",
                *nonce
            )));
        }

        *nonce += 1;
        cluster.validator_count += 1;
        cluster.balance += registration.amount;

        if self.lost_receipts.lock().contains(&call) {
            return Err(ExecutionError::TransactionFailed(format!(
                "Timed out waiting for the receipt of call {call}"
            )));
        }

        Ok(TxReceipt {
            tx_hash: B256::from(U256::from(call + 1)),
            block_number: Some(call as u64 + 1),
            cluster: (*self.emit_cluster.lock()).then(|| cluster.clone()),
        })
    }
}

pub struct MockRegistry(pub Arc<MockChain>);

impl Registry for MockRegistry {
    fn owner(&self) -> Address {
        self.0.owner
    }

    async fn approve(&self, amount: U256) -> Result<TxReceipt, ExecutionError> {
        if *self.0.fail_approval.lock() {
            return Err(ExecutionError::Reverted("ERC20: insufficient balance".to_string()));
        }
        self.0.approvals.lock().push(amount);
        Ok(TxReceipt {
            tx_hash: B256::repeat_byte(0xaa),
            block_number: Some(0),
            cluster: None,
        })
    }

    async fn register_validator(
        &self,
        registration: ValidatorRegistration,
    ) -> Result<TxReceipt, ExecutionError> {
        let call = {
            let mut registrations = self.0.registrations.lock();
            registrations.push(registration.clone());
            registrations.len() - 1
        };
        self.0.accept(call, &registration)
    }
}

pub struct MockNetwork(pub Arc<MockChain>);

impl NetworkView for MockNetwork {
    async fn resolve_nonce(&self, owner: Address) -> Result<u64, ExecutionError> {
        assert_eq!(owner, self.0.owner);
        if *self.0.fail_resolve.lock() {
            return Err(ExecutionError::RpcError("Connection refused".to_string()));
        }
        *self.0.nonce_reads.lock() += 1;
        Ok(*self.0.nonce.lock())
    }

    async fn resolve_cluster(
        &self,
        owner: Address,
        _operator_ids: &[OperatorId],
    ) -> Result<ClusterSnapshot, ExecutionError> {
        assert_eq!(owner, self.0.owner);
        if *self.0.fail_resolve.lock() {
            return Err(ExecutionError::RpcError("Connection refused".to_string()));
        }
        *self.0.cluster_reads.lock() += 1;
        Ok(self.0.cluster.lock().clone())
    }
}

// Reads the test keystore format written by the fixture: the hex secret key next to the
// password that unlocks it
pub struct MockDecryptor;

impl KeystoreDecryptor for MockDecryptor {
    fn decrypt(&self, keystore_json: &str, password: &str) -> Result<ValidatorKeys, KeystoreError> {
        let keystore: serde_json::Value = serde_json::from_str(keystore_json)
            .map_err(|e| KeystoreError::Decryption(e.to_string()))?;
        if keystore["password"].as_str() != Some(password) {
            return Err(KeystoreError::Decryption("Invalid password".to_string()));
        }
        let secret = keystore["secret"]
            .as_str()
            .and_then(|secret| hex::decode(secret).ok())
            .ok_or_else(|| KeystoreError::Decryption("Missing secret".to_string()))?;
        parse_secret_key(&secret)
            .map(ValidatorKeys::new)
            .map_err(|e| KeystoreError::Decryption(e.to_string()))
    }
}

// Test fixture for a registration run: a set of operators, a keystore directory with one
// keystore per validator and a mocked chain
pub struct TestFixture {
    pub chain: Arc<MockChain>,
    pub operator_keys: Vec<Rsa<Private>>,
    pub validators: Vec<PublicKey>,
    pub config: RegistrarConfig,
    _keystore_dir: TempDir,
    _password_dir: TempDir,
}

impl TestFixture {
    // `num_validators` keystores for an owner whose next nonce is `nonce`
    pub fn new(num_validators: usize, nonce: u64) -> Self {
        let (operators, operator_keys): (Vec<_>, Vec<_>) = (1..=DEFAULT_NUM_OPERATORS)
            .map(generators::operator::with_id)
            .unzip();

        let keystore_dir = TempDir::new().expect("Failed to create keystore directory");
        let password_dir = TempDir::new().expect("Failed to create password directory");
        let validators = (0..num_validators)
            .map(|index| {
                let secret_key = SecretKey::random();
                let name = generators::keystore::name(index);
                let password = generators::keystore::password(index);
                fs::write(
                    keystore_dir.path().join(format!("{name}.json")),
                    serde_json::json!({
                        "secret": hex::encode(secret_key.serialize().as_bytes()),
                        "password": password,
                    })
                    .to_string(),
                )
                .expect("Failed to write keystore");
                fs::write(password_dir.path().join(format!("{name}.txt")), format!("{password}\n"))
                    .expect("Failed to write password");
                secret_key.public_key()
            })
            .collect();

        let config = RegistrarConfig {
            operators,
            threshold: None,
            keystore_dir: keystore_dir.path().to_path_buf(),
            password_dir: password_dir.path().to_path_buf(),
            approval_amount: U256::from(100_000_000u64),
            registration_amount: U256::from(REGISTRATION_AMOUNT),
            nonce_policy: NoncePolicy::Resync,
        };

        Self {
            chain: Arc::new(MockChain::new(Address::repeat_byte(0x42), nonce)),
            operator_keys,
            validators,
            config,
            _keystore_dir: keystore_dir,
            _password_dir: password_dir,
        }
    }

    pub fn registrar(&self) -> Registrar<MockRegistry, MockNetwork, MockDecryptor> {
        Registrar::new(
            self.config.clone(),
            MockRegistry(self.chain.clone()),
            MockNetwork(self.chain.clone()),
            MockDecryptor,
        )
    }

    pub fn password_path(&self, index: usize) -> std::path::PathBuf {
        self.config
            .password_dir
            .join(format!("{}.txt", generators::keystore::name(index)))
    }

    pub fn registrations(&self) -> Vec<ValidatorRegistration> {
        self.chain.registrations.lock().clone()
    }
}

// Generator functions for test data
pub mod generators {
    use super::*;

    pub mod operator {
        use super::*;

        // An operator together with the private key that opens its shares
        pub fn with_id(id: u64) -> (Operator, Rsa<Private>) {
            let private_key = Rsa::generate(RSA_KEY_SIZE).expect("Failed to generate RSA key");
            let public_key = private_key
                .public_key_to_pem()
                .and_then(|pem| Rsa::public_key_from_pem(&pem))
                .expect("Failed to process RSA key");
            (Operator::new_with_pubkey(public_key, OperatorId(id)), private_key)
        }
    }

    pub mod keystore {
        // Zero padded so that directory order matches index order
        pub fn name(index: usize) -> String {
            format!("keystore-{index:03}")
        }

        pub fn password(index: usize) -> String {
            format!("password-{index}")
        }
    }
}

// Assertions on what reached the chain
pub mod assertions {
    use super::*;

    // The shares of a registration are signed with the given nonce
    pub fn signed_with_nonce(owner: &Address, registration: &ValidatorRegistration, nonce: u64) {
        let parsed = parse_shares_data(&registration.shares_data, registration.operator_ids.len())
            .expect("Failed to parse shares data");
        assert!(
            parsed
                .signature
                .verify(&registration.public_key, ownership_hash(owner, nonce)),
            "Registration is not signed with nonce {nonce}"
        );
    }

    pub fn confirmed(report: &BatchReport, index: usize) {
        assert!(
            matches!(report.validators[index].outcome, ValidatorOutcome::Confirmed { .. }),
            "Validator {index} was not confirmed: {:?}",
            report.validators[index].outcome
        );
    }

    pub fn failed_with(report: &BatchReport, index: usize, expected: FailureKind) {
        match &report.validators[index].outcome {
            ValidatorOutcome::Failed { kind, .. } => assert_eq!(*kind, expected),
            outcome => panic!("Validator {index} did not fail: {outcome:?}"),
        }
    }
}
