use std::sync::Arc;

use crate::analysis::LungAnalyzer;
use crate::config::EngineConfig;
use crate::inference::InferenceEngine;
use crate::model::{ModelLifecycle, ModelLoader};
use crate::readiness::ReadinessPoller;

/// Wires the lifecycle, engine, analyzer and readiness poller from one config.
pub struct DetectionService {
    lifecycle: Arc<ModelLifecycle>,
    analyzer: LungAnalyzer,
    readiness: ReadinessPoller,
}

impl DetectionService {
    /// Starts the background model load and the readiness poller. Needs a tokio runtime.
    pub fn start(config: EngineConfig, loader: Arc<dyn ModelLoader>) -> Self {
        log::info!(
            "Starting detection service (model {}, device {:?})",
            config.model.path.display(),
            config.model.device
        );
        let lifecycle = ModelLifecycle::init(loader, config.model.path.clone());
        let engine = Arc::new(InferenceEngine::new(Arc::clone(&lifecycle)));
        let analyzer = LungAnalyzer::with_upload_limit(engine, config.upload.max_bytes);
        let readiness =
            ReadinessPoller::spawn(Arc::clone(&lifecycle), config.readiness.retry_delay());

        Self {
            lifecycle,
            analyzer,
            readiness,
        }
    }

    pub fn analyzer(&self) -> &LungAnalyzer {
        &self.analyzer
    }

    pub fn readiness(&self) -> &ReadinessPoller {
        &self.readiness
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    pub fn shutdown(&self) {
        self.readiness.cancel();
        self.lifecycle.teardown();
        let stats = self.analyzer.engine().stats();
        log::info!(
            "Detection service stopped: {} model predictions, {} simulated",
            stats.model_predictions,
            stats.fallbacks()
        );
    }
}
