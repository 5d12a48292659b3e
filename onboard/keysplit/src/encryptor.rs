use crate::error::KeySplitError;
use crate::splitter::parse_secret_key;
use openssl::pkey::{Private, Public};
use openssl::rsa::{Padding, Rsa};
use ssv_types::{KeyShare, Operator, Share, ENCRYPTED_KEY_LENGTH};
use types::SecretKey;

/// Encrypt every share under the RSA key of the operator at the same position.
///
/// The output keeps the order of the operator list.
pub fn encrypt_shares(
    shares: &[KeyShare],
    operators: &[Operator],
) -> Result<Vec<Share>, KeySplitError> {
    if shares.len() != operators.len() {
        return Err(KeySplitError::OperatorCountMismatch(format!(
            "Got {} shares for {} operators",
            shares.len(),
            operators.len()
        )));
    }

    shares
        .iter()
        .zip(operators)
        .map(|(share, operator)| {
            if share.operator_id != operator.id {
                return Err(KeySplitError::OperatorCountMismatch(format!(
                    "Share for operator {} is aligned with operator {}",
                    share.operator_id, operator.id
                )));
            }
            Ok(Share {
                operator_id: operator.id,
                share_pubkey: share.public_key(),
                encrypted_private_key: encrypt_share(&share.secret_key, &operator.rsa_pubkey)
                    .map_err(|e| match e {
                        KeySplitError::EncryptionKeyInvalid(msg) => {
                            KeySplitError::EncryptionKeyInvalid(format!(
                                "Operator {}: {msg}",
                                operator.id
                            ))
                        }
                        other => other,
                    })?,
            })
        })
        .collect()
}

// Operators expect the 0x prefixed hex string of the share, encrypted with PKCS1 v1.5 padding
fn encrypt_share(
    secret_key: &SecretKey,
    rsa_pubkey: &Rsa<Public>,
) -> Result<[u8; ENCRYPTED_KEY_LENGTH], KeySplitError> {
    let key_size = rsa_pubkey.size() as usize;
    if key_size != ENCRYPTED_KEY_LENGTH {
        return Err(KeySplitError::EncryptionKeyInvalid(format!(
            "Expected a 2048 bit RSA key, got {} bits",
            key_size * 8
        )));
    }

    let plaintext = format!("0x{}", hex::encode(secret_key.serialize().as_bytes()));
    let mut encrypted = vec![0u8; key_size];
    let len = rsa_pubkey
        .public_encrypt(plaintext.as_bytes(), &mut encrypted, Padding::PKCS1)
        .map_err(|e| KeySplitError::EncryptionKeyInvalid(format!("Failed to encrypt share: {e}")))?;
    encrypted.truncate(len);

    encrypted.try_into().map_err(|_| {
        KeySplitError::EncryptionKeyInvalid("Encrypted share has wrong length".to_string())
    })
}

/// Decrypt a share with the operator's RSA private key
pub fn decrypt_share(
    encrypted: &[u8],
    rsa_private_key: &Rsa<Private>,
) -> Result<SecretKey, KeySplitError> {
    let mut decrypted = vec![0u8; rsa_private_key.size() as usize];
    let len = rsa_private_key
        .private_decrypt(encrypted, &mut decrypted, Padding::PKCS1)
        .map_err(|e| KeySplitError::EncryptionKeyInvalid(format!("Failed to decrypt share: {e}")))?;

    let hex_str = std::str::from_utf8(&decrypted[..len]).map_err(|e| {
        KeySplitError::InvalidKeyMaterial(format!("Decrypted share is not valid utf8: {e}"))
    })?;
    let bytes = hex::decode(hex_str.trim_start_matches("0x")).map_err(|e| {
        KeySplitError::InvalidKeyMaterial(format!("Decrypted share is not valid hex: {e}"))
    })?;
    parse_secret_key(&bytes)
}
