//! Test doubles for the model seam.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{InferenceExecutionError, ModelLoadError};
use crate::inference::preprocess::{PreprocessedTensor, TENSOR_SHAPE};
use crate::model::{ClassifierModel, ModelLoader};

/// Returns the same score for every input and counts calls.
pub(crate) struct FixedScoreModel {
    score: f32,
    calls: AtomicUsize,
}

impl FixedScoreModel {
    pub(crate) fn new(score: f32) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassifierModel for FixedScoreModel {
    fn execute(&self, tensor: PreprocessedTensor) -> Result<f32, InferenceExecutionError> {
        assert_eq!(tensor.shape(), TENSOR_SHAPE);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }
}

pub(crate) struct FailingModel;

impl ClassifierModel for FailingModel {
    fn execute(&self, _tensor: PreprocessedTensor) -> Result<f32, InferenceExecutionError> {
        Err(InferenceExecutionError::Execution("kernel launch failed".into()))
    }
}

pub(crate) struct PanickingModel;

impl ClassifierModel for PanickingModel {
    fn execute(&self, _tensor: PreprocessedTensor) -> Result<f32, InferenceExecutionError> {
        panic!("model exploded");
    }
}

/// Holds a gated load until the test releases it.
#[derive(Clone, Default)]
pub(crate) struct LoadGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl LoadGate {
    pub(crate) fn release(&self) {
        let (released, signal) = &*self.inner;
        *released.lock().unwrap() = true;
        signal.notify_all();
    }

    fn wait(&self) {
        let (released, signal) = &*self.inner;
        let mut open = released.lock().unwrap();
        while !*open {
            open = signal.wait(open).unwrap();
        }
    }
}

enum Script {
    Return(Result<Arc<dyn ClassifierModel>, ModelLoadError>),
    Panic,
}

pub(crate) struct ScriptedLoader {
    script: Script,
    gate: Option<LoadGate>,
    attempts: AtomicUsize,
}

impl ScriptedLoader {
    pub(crate) fn succeeding(model: Arc<dyn ClassifierModel>) -> Arc<Self> {
        Self::build(Script::Return(Ok(model)), None)
    }

    pub(crate) fn failing(err: ModelLoadError) -> Arc<Self> {
        Self::build(Script::Return(Err(err)), None)
    }

    pub(crate) fn panicking() -> Arc<Self> {
        Self::build(Script::Panic, None)
    }

    pub(crate) fn gated(
        outcome: Result<Arc<dyn ClassifierModel>, ModelLoadError>,
    ) -> (Arc<Self>, LoadGate) {
        let gate = LoadGate::default();
        (Self::build(Script::Return(outcome), Some(gate.clone())), gate)
    }

    fn build(script: Script, gate: Option<LoadGate>) -> Arc<Self> {
        Arc::new(Self {
            script,
            gate,
            attempts: AtomicUsize::new(0),
        })
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ModelLoader for ScriptedLoader {
    fn load(&self, _path: &Path) -> Result<Arc<dyn ClassifierModel>, ModelLoadError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        match &self.script {
            Script::Return(outcome) => outcome.clone(),
            Script::Panic => panic!("loader exploded"),
        }
    }
}

/// A small PNG with a gradient, encoded in memory.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}
