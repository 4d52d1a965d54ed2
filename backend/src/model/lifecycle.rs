//! Load state of the single shared model instance.
//!
//! States only move forward: `Unloaded -> Loading -> Ready | Failed`. The watch
//! channel is both the state cell and the wake-up mechanism for readiness
//! waiters, so nobody polls on a timer.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ModelLoadError;
use crate::model::{ClassifierModel, ModelLoader};

#[derive(Clone)]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<dyn ClassifierModel>),
    Failed(ModelLoadError),
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ModelState::Loading)
    }

    pub fn error(&self) -> Option<&ModelLoadError> {
        match self {
            ModelState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelState::Unloaded => "unloaded",
            ModelState::Loading => "loading",
            ModelState::Ready(_) => "ready",
            ModelState::Failed(_) => "failed",
        }
    }
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Unloaded => f.write_str("Unloaded"),
            ModelState::Loading => f.write_str("Loading"),
            ModelState::Ready(_) => f.write_str("Ready"),
            ModelState::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

pub struct ModelLifecycle {
    loader: Arc<dyn ModelLoader>,
    artifact: PathBuf,
    state: Arc<watch::Sender<ModelState>>,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl ModelLifecycle {
    /// Creates the lifecycle in `Unloaded` without starting a load.
    pub fn new(loader: Arc<dyn ModelLoader>, artifact: impl Into<PathBuf>) -> Self {
        let (state, _) = watch::channel(ModelState::Unloaded);
        Self {
            loader,
            artifact: artifact.into(),
            state: Arc::new(state),
            background: Mutex::new(None),
        }
    }

    /// Creates the lifecycle and starts loading in the background. Needs a tokio runtime.
    /// The state is already `Loading` when this returns, so early readiness checks wait.
    pub fn init(loader: Arc<dyn ModelLoader>, artifact: impl Into<PathBuf>) -> Arc<Self> {
        let lifecycle = Arc::new(Self::new(loader, artifact));
        if lifecycle.claim_load() {
            let handle = tokio::spawn({
                let lifecycle = Arc::clone(&lifecycle);
                async move { lifecycle.run_load().await }
            });
            *lifecycle
                .background
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }
        lifecycle
    }

    /// Loads the model once. A no-op unless the state is `Unloaded`; errors end up in the state.
    pub async fn load_model(&self) {
        if !self.claim_load() {
            log::debug!(
                "Skipping model load, state is already {}",
                self.state.borrow().name()
            );
            return;
        }
        self.run_load().await;
    }

    /// Moves `Unloaded` to `Loading`. Only one caller ever wins.
    fn claim_load(&self) -> bool {
        self.state.send_if_modified(|state| {
            if matches!(state, ModelState::Unloaded) {
                *state = ModelState::Loading;
                true
            } else {
                false
            }
        })
    }

    /// Runs the loader for a claimed load and applies its outcome.
    async fn run_load(&self) {
        log::info!("Loading pneumonia detection model from {}", self.artifact.display());
        let loader = Arc::clone(&self.loader);
        let artifact = self.artifact.clone();
        let state = Arc::clone(&self.state);

        // Detached so that dropping this future cannot strand the state in `Loading`.
        let completion = tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || loader.load(&artifact))
                .await
                .unwrap_or_else(|e| Err(ModelLoadError::Aborted(e.to_string())));
            finish_loading(&state, outcome);
        });

        if let Err(e) = completion.await {
            log::error!("Model load task ended abnormally: {}", e);
            finish_loading(&self.state, Err(ModelLoadError::Aborted(e.to_string())));
        }
    }

    /// Resolves once the state has left `Loading`. `Unloaded` counts as not ready and does not trigger a load.
    pub async fn is_model_ready(&self) -> bool {
        let mut rx = self.state.subscribe();
        let ready = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.is_ready())
            .unwrap_or(false);
        ready
    }

    pub fn state(&self) -> ModelState {
        self.state.borrow().clone()
    }

    pub fn model(&self) -> Option<Arc<dyn ClassifierModel>> {
        match &*self.state.borrow() {
            ModelState::Ready(model) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    pub fn load_error(&self) -> Option<ModelLoadError> {
        self.state.borrow().error().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModelState> {
        self.state.subscribe()
    }

    /// Ends the lifecycle: stops a pending background load and releases the model handle.
    /// Waiters wake up and observe `Failed(TornDown)`.
    pub fn teardown(&self) {
        if let Some(handle) = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.state.send_if_modified(|state| {
            if matches!(state, ModelState::Failed(_)) {
                return false;
            }
            *state = ModelState::Failed(ModelLoadError::TornDown);
            true
        });
        log::info!("Model lifecycle torn down");
    }
}

/// Applies a load outcome. Only a `Loading` state accepts it.
fn finish_loading(
    state: &watch::Sender<ModelState>,
    outcome: Result<Arc<dyn ClassifierModel>, ModelLoadError>,
) {
    let next = match outcome {
        Ok(model) => {
            log::info!("Model loaded successfully");
            ModelState::Ready(model)
        }
        Err(err) => {
            log::error!("Failed to load model: {}", err);
            ModelState::Failed(err)
        }
    };
    let applied = state.send_if_modified(|current| {
        if current.is_loading() {
            *current = next;
            true
        } else {
            false
        }
    });
    if !applied {
        log::debug!("Discarding load outcome, lifecycle already left the loading state");
    }
}

impl fmt::Debug for ModelLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLifecycle")
            .field("artifact", &self.artifact)
            .field("state", &*self.state.borrow())
            .finish()
    }
}
