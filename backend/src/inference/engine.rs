use image::DynamicImage;
use shared::DetectionResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::InferenceExecutionError;
use crate::inference::decode::decode_score;
use crate::inference::fallback::FallbackPredictor;
use crate::inference::preprocess::preprocess;
use crate::model::{ClassifierModel, ModelLifecycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    ModelUnavailable,
    ExecutionFailed,
}

#[derive(Debug, Default)]
pub struct InferenceStats {
    model_predictions: AtomicU64,
    fallback_unavailable: AtomicU64,
    fallback_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub model_predictions: u64,
    pub fallback_unavailable: u64,
    pub fallback_failed: u64,
}

impl StatsSnapshot {
    pub fn fallbacks(&self) -> u64 {
        self.fallback_unavailable + self.fallback_failed
    }
}

impl InferenceStats {
    fn record_model(&self) {
        self.model_predictions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fallback(&self, reason: FallbackReason) {
        let counter = match reason {
            FallbackReason::ModelUnavailable => &self.fallback_unavailable,
            FallbackReason::ExecutionFailed => &self.fallback_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            model_predictions: self.model_predictions.load(Ordering::Relaxed),
            fallback_unavailable: self.fallback_unavailable.load(Ordering::Relaxed),
            fallback_failed: self.fallback_failed.load(Ordering::Relaxed),
        }
    }
}

/// Runs the shared model on decoded images. `predict` has no error case: anything that
/// goes wrong past decoding degrades into a simulated result.
pub struct InferenceEngine {
    lifecycle: Arc<ModelLifecycle>,
    fallback: FallbackPredictor,
    stats: InferenceStats,
}

impl InferenceEngine {
    pub fn new(lifecycle: Arc<ModelLifecycle>) -> Self {
        Self::with_fallback(lifecycle, FallbackPredictor::new())
    }

    pub fn with_fallback(lifecycle: Arc<ModelLifecycle>, fallback: FallbackPredictor) -> Self {
        Self {
            lifecycle,
            fallback,
            stats: InferenceStats::default(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn predict(&self, image: DynamicImage) -> DetectionResult {
        if !self.lifecycle.is_model_ready().await {
            log::warn!("Model not ready, falling back to simulated prediction");
            return self.fall_back(FallbackReason::ModelUnavailable);
        }
        let Some(model) = self.lifecycle.model() else {
            log::warn!("Model handle released, falling back to simulated prediction");
            return self.fall_back(FallbackReason::ModelUnavailable);
        };

        match run_model(model, image).await.and_then(decode_score) {
            Ok(result) => {
                self.stats.record_model();
                log::debug!(
                    "Model prediction {} ({:.3})",
                    result.prediction,
                    result.confidence
                );
                result
            }
            Err(e) => {
                log::error!("Error during prediction: {}", e);
                self.fall_back(FallbackReason::ExecutionFailed)
            }
        }
    }

    fn fall_back(&self, reason: FallbackReason) -> DetectionResult {
        self.stats.record_fallback(reason);
        self.fallback.mock_predict()
    }
}

/// Preprocesses and executes off the async workers. The tensor is moved into the model and
/// dropped when `execute` returns, whichever way it returns.
async fn run_model(
    model: Arc<dyn ClassifierModel>,
    image: DynamicImage,
) -> Result<f32, InferenceExecutionError> {
    tokio::task::spawn_blocking(move || {
        let tensor = preprocess(&image)?;
        drop(image);
        model.execute(tensor)
    })
    .await
    .map_err(|e| InferenceExecutionError::Panicked(e.to_string()))?
}
