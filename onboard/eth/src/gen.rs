use alloy::sol;
use ssv_types::ClusterSnapshot;

// Generate bindings around the SSV Network contract
sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    contract SSVContract {
        struct Cluster {
            uint32 validatorCount;
            uint64 networkFeeIndex;
            uint64 index;
            bool active;
            uint256 balance;
        }
        event ValidatorAdded(address indexed owner, uint64[] operatorIds, bytes publicKey, bytes shares, Cluster cluster);
        event ValidatorRemoved(address indexed owner, uint64[] operatorIds, bytes publicKey, Cluster cluster);
        event ClusterLiquidated(address indexed owner, uint64[] operatorIds, Cluster cluster);
        event ClusterReactivated(address indexed owner, uint64[] operatorIds, Cluster cluster);
        event ClusterWithdrawn(address indexed owner, uint64[] operatorIds, uint256 value, Cluster cluster);
        event ClusterDeposited(address indexed owner, uint64[] operatorIds, uint256 value, Cluster cluster);

        function registerValidator(bytes publicKey, uint64[] operatorIds, bytes sharesData, uint256 amount, Cluster cluster) external;
    }
}

// Generate bindings around the SSV token, the network's stake token
sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    contract SSVToken {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

impl From<&ClusterSnapshot> for SSVContract::Cluster {
    fn from(snapshot: &ClusterSnapshot) -> Self {
        Self {
            validatorCount: snapshot.validator_count,
            networkFeeIndex: snapshot.network_fee_index,
            index: snapshot.index,
            active: snapshot.active,
            balance: snapshot.balance,
        }
    }
}

impl From<SSVContract::Cluster> for ClusterSnapshot {
    fn from(cluster: SSVContract::Cluster) -> Self {
        Self {
            validator_count: cluster.validatorCount,
            network_fee_index: cluster.networkFeeIndex,
            index: cluster.index,
            active: cluster.active,
            balance: cluster.balance,
        }
    }
}
