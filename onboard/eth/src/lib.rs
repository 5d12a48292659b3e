pub use error::ExecutionError;
pub use network::Network;
pub use registry::{
    connect_registry, Registry, RegistryClient, RegistryConfig, TxReceipt, ValidatorRegistration,
};
pub use scanner::{
    cluster_from_logs, nonce_from_logs, NetworkScanner, NetworkView, ScannerConfig,
};
pub use util::{validate_operators, MAX_OPERATORS};
mod error;
mod event_parser;
mod gen;
mod network;
mod registry;
mod scanner;
mod util;
