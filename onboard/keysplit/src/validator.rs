use types::{PublicKey, SecretKey};

/// The key material of a single validator, as recovered from its keystore.
///
/// The public key is always derived from the secret key so the two can never disagree.
pub struct ValidatorKeys {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl ValidatorKeys {
    pub fn new(secret_key: SecretKey) -> Self {
        Self {
            public_key: secret_key.public_key(),
            secret_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

impl std::fmt::Debug for ValidatorKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorKeys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
