//! Lifecycle entities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cipher::EncryptedValue;

/// Store key prefix for predictions.
pub const PREDICTION_KEY_PREFIX: &str = "prediction/";

/// Store key prefix for explanations.
pub const EXPLANATION_KEY_PREFIX: &str = "explanation/";

/// Identity of the caller that submitted a prediction.
///
/// Ownership is recorded at submission and checked on every generation and
/// reveal request; it is an access check, not a cryptographic binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wraps a caller identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An encrypted model prediction.
///
/// Immutable once created: `Submitted` is the prediction's terminal state,
/// and only its derived explanation transitions further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Unique, monotonically assigned id.
    pub id: u64,
    /// Identity of the submitting caller.
    pub owner: OwnerId,
    /// Encrypted feature vector.
    pub encrypted_inputs: EncryptedValue,
    /// Encrypted model output.
    pub encrypted_output: EncryptedValue,
    /// Encrypted model reference.
    pub encrypted_model_ref: EncryptedValue,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    /// Store key for a prediction id.
    pub fn key(id: u64) -> String {
        format!("{}{}", PREDICTION_KEY_PREFIX, id)
    }
}

/// Cleartext per-feature attribution scores, populated on reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealedScores {
    /// SHAP-style contribution per feature.
    pub shap_values: Vec<f64>,
    /// LIME-style local weight per feature.
    pub lime_weights: Vec<f64>,
    /// Normalized importance per feature.
    pub importance: Vec<f64>,
}

/// An explanation derived from a prediction.
///
/// Created by a validated generation callback with `revealed = false`; its
/// score ciphertexts are re-encrypted at generation so they can go through
/// their own reveal later. `revealed` flips to true exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Unique, monotonically assigned id.
    pub id: u64,
    /// The source prediction.
    pub prediction_id: u64,
    /// Owner, inherited from the source prediction.
    pub owner: OwnerId,
    /// Encrypted SHAP score vector.
    pub encrypted_shap: EncryptedValue,
    /// Encrypted LIME weight vector.
    pub encrypted_lime: EncryptedValue,
    /// Encrypted importance vector.
    pub encrypted_importance: EncryptedValue,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Whether the cleartext scores are visible.
    pub revealed: bool,
    /// Cleartext scores; `None` until revealed.
    pub cleartext: Option<RevealedScores>,
}

impl Explanation {
    /// Store key for an explanation id.
    pub fn key(id: u64) -> String {
        format!("{}{}", EXPLANATION_KEY_PREFIX, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CipherShape;

    #[test]
    fn test_store_keys() {
        assert_eq!(Prediction::key(7), "prediction/7");
        assert_eq!(Explanation::key(12), "explanation/12");
    }

    #[test]
    fn test_prediction_blob_round_trips_losslessly() {
        let prediction = Prediction {
            id: 3,
            owner: OwnerId::new("wallet-abc"),
            encrypted_inputs: EncryptedValue::vector(vec![1, 2, 3], 5),
            encrypted_output: EncryptedValue::scalar(vec![4]),
            encrypted_model_ref: EncryptedValue::scalar(vec![5]),
            created_at: Utc::now(),
        };
        let blob = serde_json::to_vec(&prediction).unwrap();
        let back: Prediction = serde_json::from_slice(&blob).unwrap();
        assert_eq!(back, prediction);
        assert_eq!(back.encrypted_inputs.shape(), CipherShape::Vector(5));
    }

    #[test]
    fn test_explanation_blob_round_trips_losslessly() {
        let explanation = Explanation {
            id: 1,
            prediction_id: 3,
            owner: OwnerId::new("wallet-abc"),
            encrypted_shap: EncryptedValue::vector(vec![9], 2),
            encrypted_lime: EncryptedValue::vector(vec![8], 2),
            encrypted_importance: EncryptedValue::vector(vec![7], 2),
            generated_at: Utc::now(),
            revealed: true,
            cleartext: Some(RevealedScores {
                shap_values: vec![0.5, -0.5],
                lime_weights: vec![0.1, 0.2],
                importance: vec![0.9, 0.1],
            }),
        };
        let blob = serde_json::to_vec(&explanation).unwrap();
        let back: Explanation = serde_json::from_slice(&blob).unwrap();
        assert_eq!(back, explanation);
    }
}
