use alloy::primitives::{address, Address};
use std::str::FromStr;

/// Network that is being connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Holesky,
}

impl Network {
    /// Address of the SSV network contract
    pub fn registry_address(&self) -> Address {
        match self {
            // https://etherscan.io/address/0xDD9BC35aE942eF0cFa76930954a156B3fF30a4E1
            Network::Mainnet => address!("DD9BC35aE942eF0cFa76930954a156B3fF30a4E1"),
            // https://holesky.etherscan.io/address/0x38A4794cCEd47d3baf7370CcC43B560D3a1beEFA
            Network::Holesky => address!("38A4794cCEd47d3baf7370CcC43B560D3a1beEFA"),
        }
    }

    /// Block the SSV network contract was deployed in. No events exist before it
    pub fn deployment_block(&self) -> u64 {
        match self {
            // https://etherscan.io/tx/0x4a11a560d3c2f693e96f98abb1feb447646b01b36203ecab0a96a1cf45fd650b
            Network::Mainnet => 17507487,
            // https://holesky.etherscan.io/tx/0x998c38ff37b47e69e23c21a8079168b7e0e0ade7244781587b00be3f08a725c6
            Network::Holesky => 181612,
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "holesky" => Ok(Network::Holesky),
            other => Err(format!("Unknown network: {other}")),
        }
    }
}
