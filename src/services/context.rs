use ndarray::Array1;

use crate::models::Emotion;

/// Number of features in a context vector
pub const CONTEXT_DIM: usize = 12;

const STRESS: usize = 0;
const EMOTION_OFFSET: usize = 1;
const POSITIVE_RATE: usize = 8;
const BIRTH_YEAR: usize = 9;

/// Positive-feedback rate assumed for users without history
pub const DEFAULT_POSITIVE_RATE: f64 = 0.5;

/// Builds the context vector the bandit scores against
///
/// Layout: `[stress, anger, fear, joy, love, neutral, sadness, surprise,
/// positive_rate, birth_year, 0, 0]`. Birth year is centred on 2000 and scaled
/// by 40 years. Unknown emotion labels leave the one-hot block empty.
pub fn build(
    stress_score: f64,
    emotion: &str,
    birth_year: Option<i32>,
    positive_rate: f64,
) -> Array1<f64> {
    let mut features = Array1::zeros(CONTEXT_DIM);

    features[STRESS] = stress_score;
    if let Some(emotion) = Emotion::parse(emotion) {
        features[EMOTION_OFFSET + emotion.index()] = 1.0;
    }
    features[POSITIVE_RATE] = positive_rate;
    features[BIRTH_YEAR] = birth_year
        .map(|year| (f64::from(year) - 2000.0) / 40.0)
        .unwrap_or(0.0);

    features
}

/// Context used when onboarding selections arrive without one
pub fn neutral() -> Array1<f64> {
    let mut features = Array1::zeros(CONTEXT_DIM);
    features[STRESS] = 0.3;
    features[EMOTION_OFFSET + Emotion::Neutral.index()] = 1.0;
    features
}

/// Pads with zeros or truncates so the vector has exactly `dim` entries
pub fn fit_to_dim(raw: &[f64], dim: usize) -> Array1<f64> {
    let mut fitted = Array1::zeros(dim);
    for (slot, value) in fitted.iter_mut().zip(raw.iter()) {
        *slot = *value;
    }
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_layout() {
        let ctx = build(0.8, "sadness", Some(1980), 0.25);

        assert_eq!(ctx.len(), CONTEXT_DIM);
        assert_eq!(ctx[0], 0.8);
        assert_eq!(ctx[6], 1.0);
        assert_eq!(ctx.slice(ndarray::s![1..8]).sum(), 1.0);
        assert_eq!(ctx[8], 0.25);
        assert!((ctx[9] - (-0.5)).abs() < 1e-12);
        assert_eq!(ctx[10], 0.0);
        assert_eq!(ctx[11], 0.0);
    }

    #[test]
    fn test_unknown_emotion_yields_empty_one_hot() {
        let ctx = build(0.4, "ennui", None, DEFAULT_POSITIVE_RATE);
        assert_eq!(ctx.slice(ndarray::s![1..8]).sum(), 0.0);
        assert_eq!(ctx[8], 0.5);
    }

    #[test]
    fn test_missing_birth_year_is_zero() {
        let ctx = build(0.1, "joy", None, 0.9);
        assert_eq!(ctx[9], 0.0);
        assert_eq!(ctx[3], 1.0);
    }

    #[test]
    fn test_extreme_birth_years_stay_finite() {
        let earliest = build(0.5, "joy", Some(i32::MIN), 0.5);
        let latest = build(0.5, "joy", Some(i32::MAX), 0.5);
        assert!(earliest[9].is_finite() && earliest[9] < 0.0);
        assert!(latest[9].is_finite() && latest[9] > 0.0);
    }

    #[test]
    fn test_neutral_context() {
        let ctx = neutral();
        assert_eq!(ctx[0], 0.3);
        assert_eq!(ctx[5], 1.0);
        assert!((ctx.sum() - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_fit_to_dim_pads_and_truncates() {
        let padded = fit_to_dim(&[1.0, 2.0], 4);
        assert_eq!(padded.to_vec(), vec![1.0, 2.0, 0.0, 0.0]);

        let truncated = fit_to_dim(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(truncated.to_vec(), vec![1.0, 2.0, 3.0]);
    }
}
