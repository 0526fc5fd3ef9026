//! Per-feature score derivation.
//!
//! Derivation runs on the cleartext delivered by a validated generation
//! callback. It is an injected pure function, not a cryptographic
//! capability: a homomorphic backend computing over ciphertext could replace
//! it behind the same trait without touching the protocol.

/// Derived attribution vectors, one element per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedScores {
    pub shap: Vec<f64>,
    pub lime: Vec<f64>,
    pub importance: Vec<f64>,
}

/// Derives per-feature scores from a revealed input vector and output.
///
/// Implementations must be deterministic and order-preserving per feature:
/// the same (inputs, output) always yields the same scores, and a larger
/// feature value never yields a smaller score for that feature.
pub trait DeriveScores: Send + Sync {
    fn derive(&self, inputs: &[f64], output: f64) -> DerivedScores;
}

/// Default derivation based on feature magnitude.
///
/// For feature value `x` with `total = Σ|x_j| + 1`:
/// - shap  = `x / total * (1 + |output|)` (signed contribution)
/// - lime  = `x / (1 + |x|)` (bounded local weight)
/// - importance = `|x| / total` (normalized magnitude)
///
/// Each is a deterministic monotone transform of `x` for fixed siblings and
/// output. This is a heuristic stand-in at the capability boundary.
pub struct MagnitudeAttribution;

impl DeriveScores for MagnitudeAttribution {
    fn derive(&self, inputs: &[f64], output: f64) -> DerivedScores {
        let total: f64 = inputs.iter().map(|x| x.abs()).sum::<f64>() + 1.0;
        let output_scale = 1.0 + output.abs();

        let mut shap = Vec::with_capacity(inputs.len());
        let mut lime = Vec::with_capacity(inputs.len());
        let mut importance = Vec::with_capacity(inputs.len());
        for &x in inputs {
            shap.push(x / total * output_scale);
            lime.push(x / (1.0 + x.abs()));
            importance.push(x.abs() / total);
        }

        DerivedScores {
            shap,
            lime,
            importance,
        }
    }
}
