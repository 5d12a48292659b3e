use crate::error::KeySplitError;
use blstrs::Scalar;
use ff::Field;
use rand::rngs::OsRng;
use ssv_types::{KeyShare, Operator, OperatorId};
use std::collections::HashSet;
use tracing::debug;
use types::SecretKey;

// Length of a serialized BLS secret key
const SECRET_KEY_LENGTH: usize = 32;

/// The number of shares needed to sign on behalf of the validator for a committee of
/// `operator_count` operators. With n = 3f + 1 this is the 2f + 1 quorum.
pub fn quorum_threshold(operator_count: usize) -> usize {
    operator_count - operator_count.saturating_sub(1) / 3
}

/// Splits validator secret keys into Shamir shares over the BLS12-381 scalar field.
///
/// Each operator receives the evaluation of a fresh random polynomial at its operator id, with
/// the validator secret key as the constant term. Any `threshold` shares recover the key, fewer
/// reveal nothing about it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdSplitter {
    /// Fixed threshold. When unset, the quorum of the operator set is used
    threshold: Option<usize>,
}

impl ThresholdSplitter {
    pub fn new(threshold: Option<usize>) -> Self {
        Self { threshold }
    }

    /// Resolve the threshold for a committee of the given size
    pub fn threshold_for(&self, operator_count: usize) -> Result<usize, KeySplitError> {
        if operator_count == 0 {
            return Err(KeySplitError::OperatorCountMismatch(
                "No operators to split the key between".to_string(),
            ));
        }

        let quorum = quorum_threshold(operator_count);
        let threshold = self.threshold.unwrap_or(quorum);
        if threshold > operator_count {
            return Err(KeySplitError::OperatorCountMismatch(format!(
                "Threshold {threshold} is not satisfiable by {operator_count} operators"
            )));
        }
        // Below the quorum a minority of operators could recover the key
        if threshold < quorum {
            return Err(KeySplitError::OperatorCountMismatch(format!(
                "Threshold {threshold} is below the quorum of {quorum} for {operator_count} operators"
            )));
        }
        Ok(threshold)
    }

    /// Split the secret key into one share per operator, in operator order
    pub fn split(
        &self,
        secret_key: &SecretKey,
        operators: &[Operator],
    ) -> Result<Vec<KeyShare>, KeySplitError> {
        let threshold = self.threshold_for(operators.len())?;
        let operator_ids: Vec<OperatorId> = operators.iter().map(|op| op.id).collect();
        validate_share_ids(&operator_ids)?;

        // f(x) = secret + a_1 * x + ... + a_{t-1} * x^{t-1}
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(scalar_from_secret_key(secret_key)?);
        coefficients.extend((1..threshold).map(|_| Scalar::random(OsRng)));

        debug!(
            threshold,
            operator_count = operators.len(),
            "Splitting validator key"
        );

        operator_ids
            .into_iter()
            .map(|operator_id| {
                let share = evaluate(&coefficients, &Scalar::from(*operator_id));
                Ok(KeyShare {
                    operator_id,
                    secret_key: secret_key_from_scalar(&share)?,
                })
            })
            .collect()
    }
}

/// Recover the secret key from at least `threshold` shares.
///
/// Only the first `threshold` shares are interpolated, any extra shares are ignored.
pub fn reconstruct<'a>(
    shares: impl IntoIterator<Item = &'a KeyShare>,
    threshold: usize,
) -> Result<SecretKey, KeySplitError> {
    let shares: Vec<&KeyShare> = shares.into_iter().take(threshold).collect();
    if threshold == 0 || shares.len() < threshold {
        return Err(KeySplitError::OperatorCountMismatch(format!(
            "Need {threshold} shares to reconstruct, got {}",
            shares.len()
        )));
    }

    let ids: Vec<OperatorId> = shares.iter().map(|share| share.operator_id).collect();
    validate_share_ids(&ids)?;

    let xs: Vec<Scalar> = ids.iter().map(|id| Scalar::from(**id)).collect();
    let mut secret = Scalar::ZERO;
    for (i, share) in shares.iter().enumerate() {
        // Lagrange basis polynomial for x_i evaluated at zero
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for (j, x_j) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator *= x_j;
            denominator *= *x_j - xs[i];
        }
        let inverse: Option<Scalar> = denominator.invert().into();
        let inverse = inverse.ok_or_else(|| {
            KeySplitError::InvalidKeyMaterial("Share ids are not distinct".to_string())
        })?;
        secret += scalar_from_secret_key(&share.secret_key)? * numerator * inverse;
    }

    secret_key_from_scalar(&secret)
}

/// Parse a raw 32 byte big endian secret key
pub fn parse_secret_key(bytes: &[u8]) -> Result<SecretKey, KeySplitError> {
    if bytes.len() != SECRET_KEY_LENGTH {
        return Err(KeySplitError::InvalidKeyMaterial(format!(
            "Secret key must be {SECRET_KEY_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    SecretKey::deserialize(bytes)
        .map_err(|e| KeySplitError::InvalidKeyMaterial(format!("Invalid secret key: {e:?}")))
}

// Share ids are the x coordinates of the polynomial. Zero would hand out the secret itself
fn validate_share_ids(ids: &[OperatorId]) -> Result<(), KeySplitError> {
    if ids.iter().any(|id| **id == 0) {
        return Err(KeySplitError::OperatorCountMismatch(
            "Operator id 0 cannot hold a share".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    if !ids.iter().all(|id| seen.insert(*id)) {
        return Err(KeySplitError::OperatorCountMismatch(
            "Operator ids contain duplicates".to_string(),
        ));
    }
    Ok(())
}

// Horner evaluation of the polynomial at x
fn evaluate(coefficients: &[Scalar], x: &Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, coefficient| acc * x + coefficient)
}

fn scalar_from_secret_key(secret_key: &SecretKey) -> Result<Scalar, KeySplitError> {
    let serialized = secret_key.serialize();
    let bytes: [u8; SECRET_KEY_LENGTH] = serialized.as_bytes().try_into().map_err(|_| {
        KeySplitError::InvalidKeyMaterial("Secret key has the wrong length".to_string())
    })?;
    let scalar: Option<Scalar> = Scalar::from_bytes_be(&bytes).into();
    scalar
        .filter(|scalar| !bool::from(scalar.is_zero()))
        .ok_or_else(|| {
            KeySplitError::InvalidKeyMaterial("Secret key is not a valid scalar".to_string())
        })
}

fn secret_key_from_scalar(scalar: &Scalar) -> Result<SecretKey, KeySplitError> {
    if bool::from(scalar.is_zero()) {
        return Err(KeySplitError::InvalidKeyMaterial(
            "Share evaluated to zero".to_string(),
        ));
    }
    SecretKey::deserialize(&scalar.to_bytes_be())
        .map_err(|e| KeySplitError::InvalidKeyMaterial(format!("Invalid share: {e:?}")))
}
