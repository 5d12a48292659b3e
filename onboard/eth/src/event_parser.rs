use crate::error::ExecutionError;
use crate::gen::SSVContract;
use alloy::primitives::Address;
use alloy::{rpc::types::Log, sol_types::SolEvent};
use ssv_types::{ClusterSnapshot, OperatorId};

// Standardized event decoding via common Decoder trait.
pub trait EventDecoder {
    type Output;
    fn decode_from_log(log: &Log) -> Result<Self::Output, ExecutionError>;
}

macro_rules! impl_event_decoder {
    ($($event_type:ty),* $(,)?) => {
        $(
            impl EventDecoder for $event_type {
                type Output = $event_type;

                fn decode_from_log(log: &Log) -> Result<Self::Output, ExecutionError> {
                    let decoded = Self::decode_log(&log.inner, true)
                        .map_err(|e| {
                            ExecutionError::DecodeError(
                                format!("Failed to decode {} event: {}", stringify!($event_type), e)
                            )
                        })?;
                    Ok(decoded.data)
                }
            }
        )*
    };
}

impl_event_decoder! {
    SSVContract::ValidatorAdded,
    SSVContract::ValidatorRemoved,
    SSVContract::ClusterLiquidated,
    SSVContract::ClusterReactivated,
    SSVContract::ClusterWithdrawn,
    SSVContract::ClusterDeposited,
}

/// A new cluster state emitted by the contract
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterUpdate {
    pub owner: Address,
    pub operator_ids: Vec<OperatorId>,
    pub cluster: ClusterSnapshot,
    /// True if this update registered a new validator, which consumes one owner nonce
    pub validator_added: bool,
}

/// Extract the cluster state from any event that carries one. Other events map to `None`
pub fn parse_cluster_update(log: &Log) -> Result<Option<ClusterUpdate>, ExecutionError> {
    let Some(topic0) = log.topic0() else {
        return Err(ExecutionError::InvalidEvent(
            "Log is missing topic0".to_string(),
        ));
    };

    let (owner, operator_ids, cluster, validator_added) = match *topic0 {
        SSVContract::ValidatorAdded::SIGNATURE_HASH => {
            let SSVContract::ValidatorAdded {
                owner,
                operatorIds,
                cluster,
                ..
            } = SSVContract::ValidatorAdded::decode_from_log(log)?;
            (owner, operatorIds, cluster, true)
        }
        SSVContract::ValidatorRemoved::SIGNATURE_HASH => {
            let SSVContract::ValidatorRemoved {
                owner,
                operatorIds,
                cluster,
                ..
            } = SSVContract::ValidatorRemoved::decode_from_log(log)?;
            (owner, operatorIds, cluster, false)
        }
        SSVContract::ClusterLiquidated::SIGNATURE_HASH => {
            let SSVContract::ClusterLiquidated {
                owner,
                operatorIds,
                cluster,
            } = SSVContract::ClusterLiquidated::decode_from_log(log)?;
            (owner, operatorIds, cluster, false)
        }
        SSVContract::ClusterReactivated::SIGNATURE_HASH => {
            let SSVContract::ClusterReactivated {
                owner,
                operatorIds,
                cluster,
            } = SSVContract::ClusterReactivated::decode_from_log(log)?;
            (owner, operatorIds, cluster, false)
        }
        SSVContract::ClusterWithdrawn::SIGNATURE_HASH => {
            let SSVContract::ClusterWithdrawn {
                owner,
                operatorIds,
                cluster,
                ..
            } = SSVContract::ClusterWithdrawn::decode_from_log(log)?;
            (owner, operatorIds, cluster, false)
        }
        SSVContract::ClusterDeposited::SIGNATURE_HASH => {
            let SSVContract::ClusterDeposited {
                owner,
                operatorIds,
                cluster,
                ..
            } = SSVContract::ClusterDeposited::decode_from_log(log)?;
            (owner, operatorIds, cluster, false)
        }
        _ => return Ok(None),
    };

    Ok(Some(ClusterUpdate {
        owner,
        operator_ids: operator_ids.into_iter().map(OperatorId).collect(),
        cluster: cluster.into(),
        validator_added,
    }))
}
