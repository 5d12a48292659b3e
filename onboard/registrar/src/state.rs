use clap::ValueEnum;
use keysplit::OwnerNonce;
use serde::Serialize;
use ssv_types::ClusterSnapshot;

/// How the local nonce counter is handled when a validator fails after its payload was built,
/// which is the point the counter has already moved past the nonce it was signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoncePolicy {
    /// Read the nonce back from the network before the next validator
    #[default]
    Resync,
    /// Keep counting locally. Later validators are signed with nonces the network has not
    /// reached yet if the failed registration never landed
    Continue,
}

/// The registry state carried from one validator to the next
#[derive(Debug, Clone)]
pub struct RunState {
    pub nonce: OwnerNonce,
    pub cluster: ClusterSnapshot,
}

impl RunState {
    pub fn new(nonce: u64, cluster: ClusterSnapshot) -> Self {
        Self {
            nonce: OwnerNonce::new(nonce),
            cluster,
        }
    }
}
