use alloy::primitives::U256;

/// Point-in-time view of an owner's cluster as tracked by the SSV network contract.
///
/// The contract only stores a hash of this struct, so every call that mutates a cluster must
/// present the latest snapshot exactly as it was last emitted in an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSnapshot {
    /// Number of validators registered to the cluster
    pub validator_count: u32,
    /// Network fee index at the last cluster update
    pub network_fee_index: u64,
    /// Operator fee index at the last cluster update
    pub index: u64,
    /// False once the cluster has been liquidated
    pub active: bool,
    /// SSV token balance deposited for the cluster
    pub balance: U256,
}

/// The snapshot of a cluster that has never been seen on chain
impl Default for ClusterSnapshot {
    fn default() -> Self {
        Self {
            validator_count: 0,
            network_fee_index: 0,
            index: 0,
            active: true,
            balance: U256::ZERO,
        }
    }
}
