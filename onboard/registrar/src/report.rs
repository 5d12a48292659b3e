use alloy::primitives::B256;
use eth::TxReceipt;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use types::PublicKey;

/// The steps a validator moves through while it is being registered. The order is the order
/// the steps happen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStage {
    Decrypted,
    SharesBuilt,
    PayloadBuilt,
    Submitted,
}

/// What went wrong with a validator that could not be registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Keystore,
    Split,
    Encrypt,
    Payload,
    Submission,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidatorOutcome {
    Confirmed {
        tx_hash: B256,
        block_number: Option<u64>,
    },
    Failed {
        kind: FailureKind,
        detail: String,
    },
}

/// The result of processing a single keystore
#[derive(Debug, Clone, Serialize)]
pub struct ValidatorReport {
    pub keystore: PathBuf,
    /// Known once the keystore has been decrypted
    pub public_key: Option<PublicKey>,
    /// The nonce the ownership proof was signed with, once a payload was built
    pub owner_nonce: Option<u64>,
    /// The last stage the validator reached
    pub stage: Option<ValidatorStage>,
    pub outcome: ValidatorOutcome,
}

impl ValidatorReport {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, ValidatorOutcome::Confirmed { .. })
    }
}

// Tracks a validator through the stages until its outcome is known
#[derive(Debug)]
pub(crate) struct ValidatorProgress {
    keystore: PathBuf,
    public_key: Option<PublicKey>,
    owner_nonce: Option<u64>,
    stage: Option<ValidatorStage>,
}

impl ValidatorProgress {
    pub(crate) fn new(keystore: PathBuf) -> Self {
        Self {
            keystore,
            public_key: None,
            owner_nonce: None,
            stage: None,
        }
    }

    pub(crate) fn decrypted(&mut self, public_key: PublicKey) {
        self.public_key = Some(public_key);
        self.stage = Some(ValidatorStage::Decrypted);
    }

    pub(crate) fn shares_built(&mut self) {
        self.stage = Some(ValidatorStage::SharesBuilt);
    }

    pub(crate) fn payload_built(&mut self, owner_nonce: u64) {
        self.owner_nonce = Some(owner_nonce);
        self.stage = Some(ValidatorStage::PayloadBuilt);
    }

    pub(crate) fn submitted(&mut self) {
        self.stage = Some(ValidatorStage::Submitted);
    }

    pub(crate) fn stage(&self) -> Option<ValidatorStage> {
        self.stage
    }

    pub(crate) fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    pub(crate) fn confirm(self, receipt: &TxReceipt) -> ValidatorReport {
        self.finish(ValidatorOutcome::Confirmed {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
        })
    }

    pub(crate) fn fail(self, kind: FailureKind, detail: String) -> ValidatorReport {
        self.finish(ValidatorOutcome::Failed { kind, detail })
    }

    fn finish(self, outcome: ValidatorOutcome) -> ValidatorReport {
        ValidatorReport {
            keystore: self.keystore,
            public_key: self.public_key,
            owner_nonce: self.owner_nonce,
            stage: self.stage,
            outcome,
        }
    }
}

/// Summary of a registration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// The owner nonce the run started from
    pub starting_nonce: u64,
    /// The local nonce counter once the run finished
    pub final_nonce: u64,
    pub validators: Vec<ValidatorReport>,
}

impl BatchReport {
    pub fn confirmed(&self) -> impl Iterator<Item = &ValidatorReport> {
        self.validators.iter().filter(|v| v.is_confirmed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ValidatorReport> {
        self.validators.iter().filter(|v| !v.is_confirmed())
    }

    /// True if every discovered validator was registered
    pub fn all_confirmed(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn log_summary(&self) {
        let confirmed = self.confirmed().count();
        let failed = self.validators.len() - confirmed;
        info!(
            total = self.validators.len(),
            confirmed,
            failed,
            starting_nonce = self.starting_nonce,
            final_nonce = self.final_nonce,
            "Registration run finished"
        );
        for report in self.failed() {
            if let ValidatorOutcome::Failed { kind, detail } = &report.outcome {
                warn!(
                    keystore = %report.keystore.display(),
                    ?kind,
                    stage = ?report.stage,
                    %detail,
                    "Validator was not registered"
                );
            }
        }
    }

    /// Write the report as pretty printed JSON
    pub fn write_json(&self, path: &Path) -> Result<(), String> {
        let file = File::create(path)
            .map_err(|e| format!("Unable to create report file {}: {e}", path.display()))?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| format!("Unable to write report to {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    fn receipt(byte: u8) -> TxReceipt {
        TxReceipt {
            tx_hash: B256::repeat_byte(byte),
            block_number: Some(100),
            cluster: None,
        }
    }

    #[test]
    fn test_progress_keeps_last_stage_on_failure() {
        let mut progress = ValidatorProgress::new(PathBuf::from("keystore-1.json"));
        progress.decrypted(types::SecretKey::random().public_key());
        progress.shares_built();
        progress.payload_built(3);
        assert_eq!(progress.stage(), Some(ValidatorStage::PayloadBuilt));

        let report = progress.fail(FailureKind::Payload, "bad".to_string());
        assert_eq!(report.stage, Some(ValidatorStage::PayloadBuilt));
        assert_eq!(report.owner_nonce, Some(3));
        assert!(!report.is_confirmed());
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(ValidatorStage::Decrypted < ValidatorStage::SharesBuilt);
        assert!(ValidatorStage::SharesBuilt < ValidatorStage::PayloadBuilt);
        assert!(ValidatorStage::PayloadBuilt < ValidatorStage::Submitted);
    }

    #[test]
    fn test_batch_counts_and_json() {
        let confirmed = ValidatorProgress::new(PathBuf::from("a.json")).confirm(&receipt(1));
        let failed = ValidatorProgress::new(PathBuf::from("b.json"))
            .fail(FailureKind::Keystore, "wrong password".to_string());
        let report = BatchReport {
            starting_nonce: 0,
            final_nonce: 1,
            validators: vec![confirmed, failed],
        };

        assert_eq!(report.confirmed().count(), 1);
        assert_eq!(report.failed().count(), 1);
        assert!(!report.all_confirmed());

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("report.json");
        report.write_json(&path).expect("Failed to write report");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read"))
                .expect("Report is not valid JSON");
        assert_eq!(json["final_nonce"], 1);
        assert_eq!(json["validators"][0]["outcome"]["status"], "confirmed");
        assert_eq!(json["validators"][1]["outcome"]["status"], "failed");
        assert_eq!(json["validators"][1]["outcome"]["kind"], "keystore");
    }
}
