use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{DetectionResult, Prediction, ResultSource};
use std::ops::RangeInclusive;
use std::sync::{Mutex, PoisonError};

pub const FALLBACK_CONFIDENCE: RangeInclusive<f32> = 0.70..=0.95;

/// Stand-in used whenever the model is unavailable or fails. Never errors.
pub struct FallbackPredictor {
    seeded: Option<Mutex<StdRng>>,
}

impl FallbackPredictor {
    pub fn new() -> Self {
        Self { seeded: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn mock_predict(&self) -> DetectionResult {
        log::info!("Using simulated prediction");
        match &self.seeded {
            Some(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                mock_predict_with(&mut *rng)
            }
            None => mock_predict_with(&mut rand::rng()),
        }
    }
}

impl Default for FallbackPredictor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn mock_predict_with<R: Rng + ?Sized>(rng: &mut R) -> DetectionResult {
    let prediction = if rng.random_bool(0.5) {
        Prediction::Pneumonia
    } else {
        Prediction::Normal
    };
    let confidence = rng.random_range(FALLBACK_CONFIDENCE);

    DetectionResult {
        prediction,
        confidence,
        heatmap: None,
        source: ResultSource::Simulated,
    }
}
