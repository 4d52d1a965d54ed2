use std::path::Path;
use std::sync::{Arc, Mutex};

use tch::{CModule, Device, Kind, Tensor};

use crate::config::DeviceChoice;
use crate::error::{InferenceExecutionError, ModelLoadError};
use crate::inference::preprocess::PreprocessedTensor;
use crate::model::{ClassifierModel, ModelLoader};

/// TorchScript classifier. `CModule` is not safe to call concurrently, so execution is serialised.
pub struct TorchScriptModel {
    module: Mutex<CModule>,
    device: Device,
}

pub struct TorchScriptLoader {
    device: Device,
}

impl TorchScriptLoader {
    pub fn new(choice: DeviceChoice) -> Self {
        let device = match choice {
            DeviceChoice::Auto => Device::cuda_if_available(),
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Cuda => Device::Cuda(0),
        };
        Self { device }
    }
}

impl ModelLoader for TorchScriptLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ClassifierModel>, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::ArtifactMissing(path.to_path_buf()));
        }
        log::info!("Loading TorchScript module on {:?}", self.device);
        let mut module = CModule::load_on_device(path, self.device)
            .map_err(|e| ModelLoadError::Runtime(e.to_string()))?;
        module.set_eval();

        Ok(Arc::new(TorchScriptModel {
            module: Mutex::new(module),
            device: self.device,
        }))
    }
}

impl ClassifierModel for TorchScriptModel {
    fn execute(&self, tensor: PreprocessedTensor) -> Result<f32, InferenceExecutionError> {
        let shape = tensor.shape().map(|d| d as i64);
        let input = Tensor::from_slice(&tensor.to_vec())
            .view(shape)
            .to_device(self.device);
        drop(tensor);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|e| InferenceExecutionError::Execution(e.to_string()))?;
            tch::no_grad(|| module.forward_ts(&[&input]))
                .map_err(|e| InferenceExecutionError::Execution(e.to_string()))?
        };

        let output_flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        if num_elements == 0 {
            return Err(InferenceExecutionError::EmptyOutput);
        }
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec[0])
    }
}
