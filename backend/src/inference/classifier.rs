use super::preprocess::Tensor;
use shared::Label;
use std::sync::Arc;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Threshold must lie strictly between 0 and 1, got {0}")]
    InvalidThreshold(f32),
    #[error("Model returned a score outside [0, 1]: {0}")]
    ScoreOutOfRange(f32),
    #[error("Model error: {0}")]
    Model(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model not found at path: {0}")]
    NotFound(String),
    #[error("Failed to load model: {0}")]
    Load(String),
    #[cfg(not(feature = "libtorch"))]
    #[error("No inference runtime compiled in (rebuild with --features libtorch)")]
    RuntimeUnavailable,
}

/// A pre-trained binary classifier: one preprocessed image in, one sigmoid
/// score in [0, 1] out.
pub trait ScoreModel: Send + Sync {
    fn predict(&self, tensor: &Tensor) -> Result<f32, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub score: f32,
    pub threshold: f32,
    pub label: Label,
    /// Probability of `label`, never the raw score when the score did not
    /// clear the threshold.
    pub confidence: f32,
}

impl Prediction {
    pub fn from_score(score: f32, threshold: f32) -> Self {
        let (label, confidence) = if score > threshold {
            (Label::Normal, score)
        } else {
            (Label::Cancer, 1.0 - score)
        };

        Self {
            score,
            threshold,
            label,
            confidence,
        }
    }
}

#[derive(Clone)]
pub struct Classifier {
    model: Arc<dyn ScoreModel>,
    threshold: f32,
}

impl Classifier {
    pub fn new(model: Arc<dyn ScoreModel>, threshold: f32) -> Result<Self, InferenceError> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(InferenceError::InvalidThreshold(threshold));
        }
        Ok(Self { model, threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn classify(&self, tensor: &Tensor) -> Result<Prediction, InferenceError> {
        let score = self.model.predict(tensor)?;
        if !(0.0..=1.0).contains(&score) {
            return Err(InferenceError::ScoreOutOfRange(score));
        }

        let prediction = Prediction::from_score(score, self.threshold);
        log::debug!(
            "Score {:.4} against threshold {} -> {}",
            score,
            self.threshold,
            prediction.label
        );
        Ok(prediction)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inference::preprocess::prepare;
    use image::{DynamicImage, RgbImage};

    /// Returns the same score for every input.
    pub(crate) struct FixedScore(pub f32);

    impl ScoreModel for FixedScore {
        fn predict(&self, _tensor: &Tensor) -> Result<f32, InferenceError> {
            Ok(self.0)
        }
    }

    fn tensor() -> Tensor {
        prepare(&DynamicImage::ImageRgb8(RgbImage::new(16, 16))).unwrap()
    }

    fn classify(score: f32) -> Prediction {
        Classifier::new(Arc::new(FixedScore(score)), DEFAULT_THRESHOLD)
            .unwrap()
            .classify(&tensor())
            .unwrap()
    }

    #[test]
    fn test_score_above_threshold_is_normal() {
        let prediction = classify(0.9);
        assert_eq!(prediction.label, Label::Normal);
        assert!((prediction.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_score_below_threshold_is_cancer() {
        let prediction = classify(0.2);
        assert_eq!(prediction.label, Label::Cancer);
        assert!((prediction.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_score_at_threshold_is_cancer() {
        let prediction = classify(0.5);
        assert_eq!(prediction.label, Label::Cancer);
        assert_eq!(prediction.confidence, 0.5);
    }

    #[test]
    fn test_confidence_never_below_half() {
        for step in 0..=100 {
            let score = step as f32 / 100.0;
            let prediction = Prediction::from_score(score, 0.5);
            assert!(prediction.confidence >= 0.5, "score {} gave {:?}", score, prediction);
            let expected = match prediction.label {
                Label::Normal => score,
                Label::Cancer => 1.0 - score,
            };
            assert_eq!(prediction.confidence, expected);
        }
    }

    #[test]
    fn test_custom_threshold() {
        let prediction = Prediction::from_score(0.6, 0.7);
        assert_eq!(prediction.label, Label::Cancer);
        assert!((prediction.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_must_be_open_interval() {
        for threshold in [0.0, 1.0, -0.1, 1.5, f32::NAN] {
            let result = Classifier::new(Arc::new(FixedScore(0.5)), threshold);
            assert!(matches!(result, Err(InferenceError::InvalidThreshold(_))));
        }
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        for score in [1.5, -0.01, f32::NAN] {
            let classifier = Classifier::new(Arc::new(FixedScore(score)), 0.5).unwrap();
            assert!(matches!(
                classifier.classify(&tensor()),
                Err(InferenceError::ScoreOutOfRange(_))
            ));
        }
    }
}
