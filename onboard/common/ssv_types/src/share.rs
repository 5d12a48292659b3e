use crate::OperatorId;
use types::{PublicKey, SecretKey};

/// Length of an RSA-2048 encrypted key share
pub const ENCRYPTED_KEY_LENGTH: usize = 256;

/// The plaintext share of a split validator key destined for a single operator.
pub struct KeyShare {
    /// Operator that will hold this share. Also the x coordinate the share was evaluated at
    pub operator_id: OperatorId,
    /// The share of the validator secret key
    pub secret_key: SecretKey,
}

impl KeyShare {
    /// The public key corresponding to this share
    pub fn public_key(&self) -> PublicKey {
        self.secret_key.public_key()
    }
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("operator_id", &self.operator_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// One of N shares of a split validator key, encrypted for its operator.
#[derive(Debug, Clone)]
pub struct Share {
    /// Operator that is able to decrypt this share
    pub operator_id: OperatorId,
    /// The public key of this Share
    pub share_pubkey: PublicKey,
    /// The encrypted private key of the share
    pub encrypted_private_key: [u8; ENCRYPTED_KEY_LENGTH],
}
