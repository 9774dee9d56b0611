use std::sync::Arc;

use shared::domain::{DetectionResult, SubmissionId};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod asset;
pub mod controller;
pub mod display;
pub mod error;
pub mod preview;
pub mod service;
pub mod settings;

pub use asset::ImageAsset;
pub use controller::{Completion, SubmissionController, SubmissionState, SubmitStart};
pub use display::DisplayState;
pub use error::{ErrorReason, PreviewError, ServiceError};
pub use preview::{PreviewHandle, PreviewHost, ThumbnailPreviewHost};
pub use service::{DetectionService, HttpDetectionService};
pub use settings::{load_settings, ClientSettings};

#[derive(Debug, Clone)]
pub enum ClientEvent {
    StateChanged(DisplayState),
    StaleResponseDiscarded { submission: SubmissionId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Succeeded(DetectionResult),
    Failed(ErrorReason),
    /// Another submission was already in flight; nothing was sent.
    AlreadyPending(SubmissionId),
    /// A newer selection replaced the image while the request was in flight.
    Superseded(SubmissionId),
}

/// Async front of the [`SubmissionController`].
///
/// The controller lock is never held across a network call, so selections
/// made while a request is in flight take effect immediately and the late
/// response is dropped.
pub struct DetectionClient {
    service: Arc<dyn DetectionService>,
    inner: Mutex<SubmissionController>,
    events: broadcast::Sender<ClientEvent>,
}

impl DetectionClient {
    pub fn new(service: Arc<dyn DetectionService>, previews: Box<dyn PreviewHost>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            service,
            inner: Mutex::new(SubmissionController::new(previews)),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn select_image(&self, asset: ImageAsset) {
        let mut controller = self.inner.lock().await;
        controller.select_image(asset);
        self.publish(&controller);
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let pending = {
            let mut controller = self.inner.lock().await;
            let start = controller.begin_submit();
            match start {
                Ok(SubmitStart::Started(pending)) => {
                    self.publish(&controller);
                    pending
                }
                Ok(SubmitStart::AlreadyPending(id)) => return SubmitOutcome::AlreadyPending(id),
                Err(reason) => {
                    self.publish(&controller);
                    return SubmitOutcome::Failed(reason);
                }
            }
        };

        let outcome = self
            .service
            .detect(&pending.asset)
            .await
            .map_err(ErrorReason::from);

        let mut controller = self.inner.lock().await;
        match controller.complete_submission(pending.id, outcome.clone()) {
            Completion::Applied => {
                self.publish(&controller);
                match outcome {
                    Ok(result) => SubmitOutcome::Succeeded(result),
                    Err(reason) => SubmitOutcome::Failed(reason),
                }
            }
            Completion::Stale | Completion::Ignored => {
                let _ = self.events.send(ClientEvent::StaleResponseDiscarded {
                    submission: pending.id,
                });
                SubmitOutcome::Superseded(pending.id)
            }
        }
    }

    /// Fetches text the service decoded earlier. Failures leave the current
    /// classification on screen and are returned to the caller.
    pub async fn fetch_stored_text(&self) -> Result<String, ErrorReason> {
        let request = self.inner.lock().await.begin_fetch_stored_text();

        let text = match self.service.fetch_stored_text().await {
            Ok(text) => text,
            Err(err) => {
                let reason = ErrorReason::from(err);
                warn!(%reason, "detect: stored text fetch failed");
                return Err(reason);
            }
        };

        let mut controller = self.inner.lock().await;
        match controller.apply_stored_text(request, text.clone()) {
            Completion::Applied => self.publish(&controller),
            Completion::Stale | Completion::Ignored => {
                info!("detect: stored text not attached to any result");
            }
        }
        Ok(text)
    }

    pub async fn display_state(&self) -> DisplayState {
        self.inner.lock().await.display_state()
    }

    pub async fn state(&self) -> SubmissionState {
        self.inner.lock().await.state().clone()
    }

    pub async fn preview_dimensions(&self) -> Option<(u32, u32)> {
        self.inner.lock().await.preview_dimensions()
    }

    fn publish(&self, controller: &SubmissionController) {
        let _ = self
            .events
            .send(ClientEvent::StateChanged(controller.display_state()));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
