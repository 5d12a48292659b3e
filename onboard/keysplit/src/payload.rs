use crate::error::KeySplitError;
use crate::validator::ValidatorKeys;
use alloy::primitives::{keccak256, Address, B256};
use ssv_types::{OperatorId, Share, ENCRYPTED_KEY_LENGTH};
use tracing::debug;
use types::{PublicKey, Signature};

// phase0.SignatureLength
const SIGNATURE_LENGTH: usize = 96;
// phase0.PublicKeyLength
const PUBLIC_KEY_LENGTH: usize = 48;

/// The owner's registration sequence number for a single run.
///
/// It only ever moves forward by one, after a payload has been fully built, or is reset to a
/// value read back from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerNonce(u64);

impl OwnerNonce {
    pub fn new(nonce: u64) -> Self {
        Self(nonce)
    }

    /// The nonce the next payload will be built with
    pub fn current(&self) -> u64 {
        self.0
    }

    /// Replace the local counter with the nonce observed on chain
    pub fn resync(&mut self, nonce: u64) {
        self.0 = nonce;
    }

    fn advance(&mut self) {
        self.0 += 1;
    }
}

/// Everything the `registerValidator` call needs for one validator.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationPayload {
    /// Public key of the validator being registered
    pub public_key: PublicKey,
    /// The operators holding a share, in share order
    pub operator_ids: Vec<OperatorId>,
    /// [signature | share public keys | encrypted shares]
    pub shares_data: Vec<u8>,
    /// Owner nonce the signature commits to
    pub owner_nonce: u64,
}

impl RegistrationPayload {
    /// Parse the shares data back and make sure the ownership proof holds for `owner`
    pub fn verify(&self, owner: &Address) -> Result<ParsedShares, KeySplitError> {
        let parsed = parse_shares_data(&self.shares_data, self.operator_ids.len())?;
        if !parsed.signature.verify(
            &self.public_key,
            ownership_hash(owner, self.owner_nonce),
        ) {
            return Err(KeySplitError::SerializationError(format!(
                "Ownership signature does not match owner {owner} and nonce {}",
                self.owner_nonce
            )));
        }
        Ok(parsed)
    }
}

/// The components of a `sharesData` blob
#[derive(Debug)]
pub struct ParsedShares {
    pub signature: Signature,
    pub share_pubkeys: Vec<PublicKey>,
    pub encrypted_keys: Vec<[u8; ENCRYPTED_KEY_LENGTH]>,
}

/// The message a validator signs to prove it is registered by `owner` at `nonce`
pub fn ownership_hash(owner: &Address, nonce: u64) -> B256 {
    // Hash the owner and nonce concatenated
    keccak256(format!("{}:{}", owner, nonce))
}

/// Build the registration payload for a validator and advance the owner nonce.
///
/// The nonce is only advanced once the payload is complete, a failure leaves it untouched.
pub fn build_payload(
    keys: &ValidatorKeys,
    shares: &[Share],
    owner: Address,
    nonce: &mut OwnerNonce,
) -> Result<RegistrationPayload, KeySplitError> {
    if shares.is_empty() {
        return Err(KeySplitError::SerializationError(
            "Cannot build a payload without shares".to_string(),
        ));
    }

    let owner_nonce = nonce.current();
    let signature = keys
        .secret_key()
        .sign(ownership_hash(&owner, owner_nonce));

    let operator_count = shares.len();
    let mut shares_data = Vec::with_capacity(
        SIGNATURE_LENGTH + operator_count * (PUBLIC_KEY_LENGTH + ENCRYPTED_KEY_LENGTH),
    );
    shares_data.extend_from_slice(&signature.serialize());
    for share in shares {
        shares_data.extend_from_slice(&share.share_pubkey.serialize());
    }
    for share in shares {
        shares_data.extend_from_slice(&share.encrypted_private_key);
    }

    let payload = RegistrationPayload {
        public_key: keys.public_key().clone(),
        operator_ids: shares.iter().map(|share| share.operator_id).collect(),
        shares_data,
        owner_nonce,
    };
    nonce.advance();

    debug!(
        validator = ?payload.public_key,
        owner_nonce,
        shares_len = payload.shares_data.len(),
        "Built registration payload"
    );
    Ok(payload)
}

/// Split a `sharesData` blob for `operator_count` operators into its parts.
///
/// The blob is of the form [signature | public keys | encrypted keys].
pub fn parse_shares_data(
    shares_data: &[u8],
    operator_count: usize,
) -> Result<ParsedShares, KeySplitError> {
    // Calculate offsets for different components within the shares
    let signature_offset = SIGNATURE_LENGTH;
    let pub_keys_offset = PUBLIC_KEY_LENGTH * operator_count + signature_offset;
    let shares_expected_length = ENCRYPTED_KEY_LENGTH * operator_count + pub_keys_offset;

    // Validate total length of shares
    if operator_count == 0 || shares_expected_length != shares_data.len() {
        return Err(KeySplitError::SerializationError(format!(
            "Share data has invalid length: expected {}, got {}",
            shares_expected_length,
            shares_data.len()
        )));
    }

    let signature = Signature::deserialize(&shares_data[..signature_offset])
        .map_err(|e| KeySplitError::SerializationError(format!("Invalid signature: {e:?}")))?;

    let share_pubkeys = shares_data[signature_offset..pub_keys_offset]
        .chunks(PUBLIC_KEY_LENGTH)
        .map(|chunk| {
            PublicKey::deserialize(chunk).map_err(|e| {
                KeySplitError::SerializationError(format!("Invalid share public key: {e:?}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let encrypted_keys = shares_data[pub_keys_offset..]
        .chunks(ENCRYPTED_KEY_LENGTH)
        .map(|chunk| {
            chunk.try_into().map_err(|_| {
                KeySplitError::SerializationError("Encrypted key has wrong length".to_string())
            })
        })
        .collect::<Result<Vec<[u8; ENCRYPTED_KEY_LENGTH]>, _>>()?;

    Ok(ParsedShares {
        signature,
        share_pubkeys,
        encrypted_keys,
    })
}
