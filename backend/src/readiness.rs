//! Readiness signal for the presentation layer.
//!
//! The poller asks the lifecycle whether the model is ready and publishes a
//! [`ReadinessStatus`] on a watch channel. Only a not-ready result without a load
//! error is retried; a failure is surfaced once and polling stops. Cancelling
//! (or dropping) the poller guarantees no further updates are published.

use shared::ReadinessStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::model::ModelLifecycle;

/// Publishing happens under the `alive` lock, so nothing is sent once `cancel` has returned.
type Liveness = Arc<Mutex<bool>>;

pub struct ReadinessPoller {
    status: watch::Receiver<ReadinessStatus>,
    alive: Liveness,
    task: JoinHandle<()>,
}

impl ReadinessPoller {
    pub fn spawn(lifecycle: Arc<ModelLifecycle>, retry_delay: Duration) -> Self {
        let (tx, status) = watch::channel(ReadinessStatus::checking());
        let alive = Arc::new(Mutex::new(true));
        let task = tokio::spawn(poll_until_settled(
            lifecycle,
            tx,
            Arc::clone(&alive),
            retry_delay,
        ));
        Self { status, alive, task }
    }

    pub fn status(&self) -> ReadinessStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadinessStatus> {
        self.status.clone()
    }

    /// Waits until a check has completed and returns the status it published.
    pub async fn settled(&self) -> ReadinessStatus {
        let mut rx = self.status.clone();
        if let Ok(status) = rx.wait_for(|status| !status.loading).await {
            return status.clone();
        }
        rx.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        *self.alive.lock().unwrap_or_else(PoisonError::into_inner) && !self.task.is_finished()
    }

    pub fn cancel(&self) {
        let was_alive = std::mem::replace(
            &mut *self.alive.lock().unwrap_or_else(PoisonError::into_inner),
            false,
        );
        if was_alive {
            log::debug!("Readiness poller cancelled");
        }
        self.task.abort();
    }
}

impl Drop for ReadinessPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_until_settled(
    lifecycle: Arc<ModelLifecycle>,
    tx: watch::Sender<ReadinessStatus>,
    alive: Liveness,
    retry_delay: Duration,
) {
    let publish = |status: ReadinessStatus| {
        let alive = alive.lock().unwrap_or_else(PoisonError::into_inner);
        if *alive {
            tx.send_replace(status);
        }
        *alive
    };

    loop {
        if !publish(ReadinessStatus::checking()) {
            return;
        }
        let ready = lifecycle.is_model_ready().await;

        if ready {
            log::info!("Model ready, real predictions enabled");
            publish(ReadinessStatus::ready());
            return;
        }
        if let Some(err) = lifecycle.load_error() {
            log::warn!("Model unavailable, predictions will be simulated: {}", err);
            publish(ReadinessStatus::failed(err.to_string()));
            return;
        }

        log::debug!("Model not loaded yet, checking again in {:?}", retry_delay);
        if !publish(ReadinessStatus::unavailable()) {
            return;
        }
        tokio::time::sleep(retry_delay).await;
    }
}
