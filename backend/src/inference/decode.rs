use shared::{DetectionResult, Prediction, ResultSource};

use crate::error::InferenceExecutionError;

/// Scores strictly above this are classified as pneumonia.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Maps the raw P(PNEUMONIA) score onto a result whose confidence belongs to the predicted class.
pub fn decode_score(score: f32) -> Result<DetectionResult, InferenceExecutionError> {
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(InferenceExecutionError::ScoreOutOfRange(score));
    }

    let (prediction, confidence) = if score > DECISION_THRESHOLD {
        (Prediction::Pneumonia, score)
    } else {
        (Prediction::Normal, 1.0 - score)
    };

    Ok(DetectionResult {
        prediction,
        confidence,
        heatmap: None,
        source: ResultSource::Model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_mass_of_predicted_class() {
        for step in 0..=1000 {
            let score = step as f32 / 1000.0;
            let result = decode_score(score).unwrap();
            assert_eq!(result.confidence, score.max(1.0 - score));
            assert_eq!(result.prediction == Prediction::Pneumonia, score > 0.5);
            assert!(result.confidence >= 0.5);
        }
    }

    #[test]
    fn threshold_itself_is_normal() {
        let result = decode_score(0.5).unwrap();
        assert_eq!(result.prediction, Prediction::Normal);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn known_scores() {
        let result = decode_score(0.82).unwrap();
        assert_eq!(result.prediction, Prediction::Pneumonia);
        assert!((result.confidence - 0.82).abs() < 1e-6);

        let result = decode_score(0.10).unwrap();
        assert_eq!(result.prediction, Prediction::Normal);
        assert!((result.confidence - 0.90).abs() < 1e-6);
        assert_eq!(result.source, ResultSource::Model);
    }

    #[test]
    fn invalid_scores_are_errors() {
        for score in [f32::NAN, f32::INFINITY, -0.01, 1.5] {
            assert!(matches!(
                decode_score(score),
                Err(InferenceExecutionError::ScoreOutOfRange(_))
            ));
        }
    }
}
