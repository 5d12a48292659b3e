use std::fmt::Display;

// Errors raised while turning a validator key into a registration payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySplitError {
    InvalidKeyMaterial(String),
    OperatorCountMismatch(String),
    EncryptionKeyInvalid(String),
    SerializationError(String),
}

impl Display for KeySplitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for KeySplitError {}
