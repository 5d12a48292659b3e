use crate::util::parse_rsa;
use derive_more::{Deref, Display, From};
use openssl::pkey::Public;
use openssl::rsa::Rsa;
use std::cmp::Eq;
use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;

/// Unique identifier for an Operator.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, From, Deref, Display,
)]
pub struct OperatorId(pub u64);

/// A member of the signing committee that will hold one share of every validator key we split.
#[derive(Debug, Clone)]
pub struct Operator {
    /// ID to uniquely identify this operator
    pub id: OperatorId,
    /// RSA public key the operator's key share is encrypted under
    pub rsa_pubkey: Rsa<Public>,
}

impl Operator {
    /// Creates a new operator from its OperatorId and base64 encoded PEM public key string
    pub fn new(pem_data: &str, operator_id: OperatorId) -> Result<Self, String> {
        let rsa_pubkey = parse_rsa(pem_data)?;
        Ok(Self::new_with_pubkey(rsa_pubkey, operator_id))
    }

    // Creates a new operator from an existing RSA public key and OperatorId
    pub fn new_with_pubkey(rsa_pubkey: Rsa<Public>, id: OperatorId) -> Self {
        Self { id, rsa_pubkey }
    }
}

/// Parses an operator in the `ID:BASE64_PEM` form used on the command line
impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, pem_data) = s
            .split_once(':')
            .ok_or_else(|| format!("Operator must be of the form ID:PUBLIC_KEY, got {s}"))?;
        let id = id
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("Invalid operator id {id}: {e}"))?;
        if id == 0 {
            return Err("Operator ids start at 1".to_string());
        }
        Self::new(pem_data.trim(), OperatorId(id))
    }
}
