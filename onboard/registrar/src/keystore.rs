use eth2_keystore::Keystore;
use keysplit::ValidatorKeys;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

const KEYSTORE_EXTENSION: &str = "json";
const PASSWORD_EXTENSION: &str = "txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystoreError {
    Io(String),
    MissingPassword(PathBuf),
    Decryption(String),
}

impl Display for KeystoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for KeystoreError {}

/// Turns an encrypted keystore into the validator's key pair
pub trait KeystoreDecryptor {
    fn decrypt(&self, keystore_json: &str, password: &str) -> Result<ValidatorKeys, KeystoreError>;
}

/// Decrypts EIP-2335 keystores as produced by the staking deposit tooling
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip2335Decryptor;

impl KeystoreDecryptor for Eip2335Decryptor {
    fn decrypt(&self, keystore_json: &str, password: &str) -> Result<ValidatorKeys, KeystoreError> {
        let keystore = Keystore::from_json_str(keystore_json)
            .map_err(|e| KeystoreError::Decryption(format!("Invalid keystore: {:?}", e)))?;
        let keypair = keystore
            .decrypt_keypair(password.as_bytes())
            .map_err(|e| KeystoreError::Decryption(format!("Unable to decrypt keystore: {:?}", e)))?;
        Ok(ValidatorKeys::new(keypair.sk))
    }
}

/// A keystore file paired with the file holding its password
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeystoreJob {
    pub keystore_path: PathBuf,
    pub password_path: PathBuf,
}

impl KeystoreJob {
    /// Read the keystore and its password. Trailing line breaks are not part of the password
    pub fn read(&self) -> Result<(String, Zeroizing<String>), KeystoreError> {
        let keystore = fs::read_to_string(&self.keystore_path).map_err(|e| {
            KeystoreError::Io(format!(
                "Unable to read keystore {}: {e}",
                self.keystore_path.display()
            ))
        })?;
        if !self.password_path.is_file() {
            return Err(KeystoreError::MissingPassword(self.password_path.clone()));
        }
        let mut password = Zeroizing::new(fs::read_to_string(&self.password_path).map_err(|e| {
            KeystoreError::Io(format!(
                "Unable to read password {}: {e}",
                self.password_path.display()
            ))
        })?);
        let trimmed_len = password.trim_end_matches(['\r', '\n']).len();
        password.truncate(trimmed_len);
        Ok((keystore, password))
    }
}

/// Find every `<name>.json` keystore in `keystore_dir` and pair it with `<name>.txt` in
/// `password_dir`. Jobs are sorted by keystore file name.
pub fn discover_keystores(
    keystore_dir: &Path,
    password_dir: &Path,
) -> Result<Vec<KeystoreJob>, KeystoreError> {
    let entries = fs::read_dir(keystore_dir).map_err(|e| {
        KeystoreError::Io(format!(
            "Unable to read keystore directory {}: {e}",
            keystore_dir.display()
        ))
    })?;

    let mut jobs = vec![];
    for entry in entries {
        let path = entry
            .map_err(|e| KeystoreError::Io(format!("Unable to read directory entry: {e}")))?
            .path();
        if !path.is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(KEYSTORE_EXTENSION)
        {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        // file stems of deposit tooling keystores contain dots, so the extension is appended
        let password_path =
            password_dir.join(format!("{}.{PASSWORD_EXTENSION}", stem.to_string_lossy()));
        jobs.push(KeystoreJob {
            keystore_path: path,
            password_path,
        });
    }
    jobs.sort();

    debug!(count = jobs.len(), dir = %keystore_dir.display(), "Discovered keystores");
    Ok(jobs)
}
