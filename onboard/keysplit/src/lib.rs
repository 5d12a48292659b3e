//! Turns a validator secret key into the share bundle the SSV network contract expects.
//!
//! The pipeline is split -> encrypt -> build: the key is split into one Shamir share per operator,
//! each share is encrypted under its operator's RSA key, and the encrypted shares are serialized
//! together with an ownership proof into the `sharesData` of a registration payload.
pub use encryptor::{decrypt_share, encrypt_shares};
pub use error::KeySplitError;
pub use payload::{
    build_payload, ownership_hash, parse_shares_data, OwnerNonce, ParsedShares,
    RegistrationPayload,
};
pub use splitter::{parse_secret_key, quorum_threshold, reconstruct, ThresholdSplitter};
pub use validator::ValidatorKeys;

mod encryptor;
mod error;
mod payload;
mod splitter;
mod validator;
