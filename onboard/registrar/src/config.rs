use crate::cli::Onboard;
use crate::state::NoncePolicy;
use alloy::primitives::utils::{parse_units, ParseUnits};
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use eth::{validate_operators, Network, RegistryConfig, ScannerConfig};
use keysplit::ThresholdSplitter;
use sensitive_url::SensitiveUrl;
use ssv_types::Operator;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// SSV has 18 decimals
const SSV_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidRpcUrl(String),
    InvalidPrivateKey(String),
    InvalidNetwork(String),
    InvalidAddress(String),
    InvalidOperators(String),
    InvalidThreshold(String),
    InvalidAmount(String),
    InvalidDirectory(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for ConfigError {}

/// Everything a registration run needs besides the chain connections
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// The operators every validator is split across, sorted by id
    pub operators: Vec<Operator>,
    pub threshold: Option<usize>,
    pub keystore_dir: PathBuf,
    pub password_dir: PathBuf,
    /// SSV allowance granted to the network contract, in the smallest token unit
    pub approval_amount: U256,
    /// SSV deposited with each registration, in the smallest token unit
    pub registration_amount: U256,
    pub nonce_policy: NoncePolicy,
}

/// Validated configuration of the onboarding tool
#[derive(Clone)]
pub struct Config {
    pub rpc_url: SensitiveUrl,
    pub owner_signer: PrivateKeySigner,
    pub registry_address: Address,
    pub token_address: Address,
    /// Block the event scan starts from
    pub deployment_block: u64,
    pub scan_batch_size: u64,
    pub confirmation_timeout: Option<Duration>,
    pub registrar: RegistrarConfig,
    pub report_file: Option<PathBuf>,
    pub allow_failures: bool,
}

impl Config {
    /// Validate the command line. Nothing is read from the chain here
    pub fn from_cli(cli: &Onboard) -> Result<Self, ConfigError> {
        let rpc_url = SensitiveUrl::parse(&cli.rpc_url)
            .map_err(|e| ConfigError::InvalidRpcUrl(format!("{:?}", e)))?;

        let owner_signer = PrivateKeySigner::from_str(cli.owner_private_key.trim_start_matches("0x"))
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;

        let network = cli
            .network
            .as_deref()
            .map(Network::from_str)
            .transpose()
            .map_err(ConfigError::InvalidNetwork)?;
        let registry_address = match (&cli.registry_address, network) {
            (Some(address), _) => parse_address(address, "registry")?,
            (None, Some(network)) => network.registry_address(),
            (None, None) => {
                return Err(ConfigError::InvalidAddress(
                    "No SSV network contract. Pass --registry-address or --network".to_string(),
                ))
            }
        };
        let token_address = parse_address(&cli.token_address, "token")?;
        let deployment_block = cli
            .deployment_block
            .or(network.map(|network| network.deployment_block()))
            .unwrap_or_default();

        let operators = parse_operators(&cli.operators)?;
        ThresholdSplitter::new(cli.threshold)
            .threshold_for(operators.len())
            .map_err(|e| ConfigError::InvalidThreshold(e.to_string()))?;

        let registrar = RegistrarConfig {
            operators,
            threshold: cli.threshold,
            keystore_dir: existing_dir(&cli.keystore_dir, "keystore")?,
            password_dir: existing_dir(&cli.password_dir, "password")?,
            approval_amount: parse_amount(&cli.approval_amount, SSV_DECIMALS)?,
            registration_amount: parse_amount(&cli.registration_amount, 0)?,
            nonce_policy: cli.nonce_policy,
        };

        Ok(Self {
            rpc_url,
            owner_signer,
            registry_address,
            token_address,
            deployment_block,
            scan_batch_size: cli.scan_batch_size,
            confirmation_timeout: cli.confirmation_timeout.map(Duration::from_secs),
            registrar,
            report_file: cli.report_file.clone(),
            allow_failures: cli.allow_failures,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner_signer.address()
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            http_url: self.rpc_url.clone(),
            registry_address: self.registry_address,
            token_address: self.token_address,
            confirmation_timeout: self.confirmation_timeout,
        }
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            http_url: self.rpc_url.clone(),
            contract_address: self.registry_address,
            deployment_block: self.deployment_block,
            batch_size: self.scan_batch_size,
        }
    }
}

fn parse_address(address: &str, name: &str) -> Result<Address, ConfigError> {
    Address::from_str(address)
        .map_err(|e| ConfigError::InvalidAddress(format!("Invalid {name} address {address}: {e}")))
}

// Parse the operator list and sort it by id, the order the network contract expects
fn parse_operators(raw: &[String]) -> Result<Vec<Operator>, ConfigError> {
    let mut operators = raw
        .iter()
        .filter(|op| !op.trim().is_empty())
        .map(|op| Operator::from_str(op))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ConfigError::InvalidOperators)?;
    operators.sort_by_key(|op| op.id);

    let ids: Vec<_> = operators.iter().map(|op| op.id).collect();
    validate_operators(&ids).map_err(ConfigError::InvalidOperators)?;
    Ok(operators)
}

fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ConfigError> {
    match parse_units(amount, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(ConfigError::InvalidAmount(format!(
            "Amount must not be negative: {amount}"
        ))),
        Err(e) => Err(ConfigError::InvalidAmount(format!(
            "Invalid amount {amount}: {e}"
        ))),
    }
}

fn existing_dir(path: &Path, name: &str) -> Result<PathBuf, ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::InvalidDirectory(format!(
            "The {name} directory {} does not exist",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use base64::prelude::*;
    use clap::Parser;
    use openssl::rsa::Rsa;
    use tempfile::TempDir;

    // anvil's first development account
    const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TOKEN: &str = "0x9F5d4Ec84fC4785788aB44F9de973cF34F7A038e";

    fn operator_arg(id: u64) -> String {
        let rsa = Rsa::generate(2048).expect("Failed to generate RSA key");
        let pem = rsa.public_key_to_pem().expect("Failed to encode key");
        format!("{id}:{}", BASE64_STANDARD.encode(pem))
    }

    fn args(dirs: &TempDir, operators: &str, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "onboard".to_string(),
            "--rpc-url=http://localhost:8545".to_string(),
            format!("--owner-private-key={OWNER_KEY}"),
            format!("--token-address={TOKEN}"),
            format!("--operator={operators}"),
            format!("--keystore-dir={}", dirs.path().display()),
            format!("--password-dir={}", dirs.path().display()),
        ];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        args
    }

    fn four_operators() -> String {
        [4, 2, 3, 1].map(operator_arg).join(",")
    }

    #[test]
    fn test_valid_config_with_network_preset() {
        let dirs = tempfile::tempdir().expect("tempdir");
        let cli = Onboard::try_parse_from(args(&dirs, &four_operators(), &["--network=holesky"]))
            .expect("Failed to parse cli");
        let config = Config::from_cli(&cli).expect("Config should be valid");

        assert_eq!(config.registry_address, Network::Holesky.registry_address());
        assert_eq!(config.deployment_block, Network::Holesky.deployment_block());
        assert_eq!(
            config.owner(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").expect("address")
        );

        // operators are sorted by id
        let ids: Vec<u64> = config.registrar.operators.iter().map(|op| *op.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        assert_eq!(
            config.registrar.approval_amount,
            U256::from(100_000_000u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(config.registrar.registration_amount, U256::from(1000u64));
        assert_eq!(config.registrar.nonce_policy, NoncePolicy::Resync);
        assert!(!config.allow_failures);
    }

    #[test]
    fn test_explicit_registry_overrides_network() {
        let dirs = tempfile::tempdir().expect("tempdir");
        let registry = "0x1111111111111111111111111111111111111111";
        let cli = Onboard::try_parse_from(args(
            &dirs,
            &four_operators(),
            &[
                "--network=mainnet",
                &format!("--registry-address={registry}"),
                "--deployment-block=5",
                "--nonce-policy=continue",
            ],
        ))
        .expect("Failed to parse cli");
        let config = Config::from_cli(&cli).expect("Config should be valid");

        assert_eq!(config.registry_address, Address::from_str(registry).expect("address"));
        assert_eq!(config.deployment_block, 5);
        assert_eq!(config.registrar.nonce_policy, NoncePolicy::Continue);
    }

    #[test]
    fn test_requires_registry() {
        let dirs = tempfile::tempdir().expect("tempdir");
        let cli = Onboard::try_parse_from(args(&dirs, &four_operators(), &[]))
            .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_operator_sets() {
        let dirs = tempfile::tempdir().expect("tempdir");

        let three = [1, 2, 3].map(operator_arg).join(",");
        let cli = Onboard::try_parse_from(args(&dirs, &three, &["--network=holesky"]))
            .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidOperators(_))
        ));

        let duplicate = [1, 2, 3, 3].map(operator_arg).join(",");
        let cli = Onboard::try_parse_from(args(&dirs, &duplicate, &["--network=holesky"]))
            .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidOperators(_))
        ));

        let cli = Onboard::try_parse_from(args(&dirs, "1:not-a-key", &["--network=holesky"]))
            .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidOperators(_))
        ));
    }

    #[test]
    fn test_rejects_bad_threshold_and_amounts() {
        let dirs = tempfile::tempdir().expect("tempdir");
        let operators = four_operators();

        let cli = Onboard::try_parse_from(args(
            &dirs,
            &operators,
            &["--network=holesky", "--threshold=5"],
        ))
        .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidThreshold(_))
        ));

        let cli = Onboard::try_parse_from(args(
            &dirs,
            &operators,
            &["--network=holesky", "--threshold=1"],
        ))
        .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidThreshold(_))
        ));

        let cli = Onboard::try_parse_from(args(
            &dirs,
            &operators,
            &["--network=holesky", "--registration-amount=lots"],
        ))
        .expect("Failed to parse cli");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_rejects_missing_directory_and_bad_key() {
        let dirs = tempfile::tempdir().expect("tempdir");
        let mut cli = Onboard::try_parse_from(args(&dirs, &four_operators(), &["--network=holesky"]))
            .expect("Failed to parse cli");

        cli.password_dir = dirs.path().join("missing");
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidDirectory(_))
        ));

        cli.owner_private_key = "0x1234".to_string();
        assert!(matches!(
            Config::from_cli(&cli),
            Err(ConfigError::InvalidPrivateKey(_))
        ));
    }
}
