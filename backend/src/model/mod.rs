//! Model runtime seam and the lifecycle that owns the single shared model instance.

pub mod lifecycle;
#[cfg(feature = "torch")]
pub mod torch;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::error::{InferenceExecutionError, ModelLoadError};
use crate::inference::preprocess::PreprocessedTensor;

pub use lifecycle::{ModelLifecycle, ModelState};

/// A loaded classifier. Implementations that cannot run concurrently lock inside `execute`.
pub trait ClassifierModel: Send + Sync {
    /// Consumes the tensor and returns P(PNEUMONIA).
    fn execute(&self, tensor: PreprocessedTensor) -> Result<f32, InferenceExecutionError>;
}

/// Loads the model artifact. Blocking; the lifecycle calls it from the blocking pool.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn ClassifierModel>, ModelLoadError>;
}

/// Used when the binary was built without a model runtime. Every load fails.
pub struct UnavailableRuntime;

impl ModelLoader for UnavailableRuntime {
    fn load(&self, path: &Path) -> Result<Arc<dyn ClassifierModel>, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::ArtifactMissing(path.to_path_buf()));
        }
        Err(ModelLoadError::RuntimeUnavailable(
            "built without the `torch` feature".to_string(),
        ))
    }
}

#[cfg(feature = "torch")]
pub fn default_loader(config: &ModelConfig) -> Arc<dyn ModelLoader> {
    Arc::new(torch::TorchScriptLoader::new(config.device))
}

#[cfg(not(feature = "torch"))]
pub fn default_loader(config: &ModelConfig) -> Arc<dyn ModelLoader> {
    log::warn!(
        "No model runtime compiled in (device preference {:?} ignored); predictions will be simulated",
        config.device
    );
    Arc::new(UnavailableRuntime)
}
