//! Submission lifecycle state machine.
//!
//! `Idle -> Pending -> {Succeeded | Failed}`; a new selection returns to
//! `Idle` from any state. The controller performs no I/O: the network step
//! sits between [`SubmissionController::begin_submit`] and
//! [`SubmissionController::complete_submission`], and completions are matched
//! against the submission id they were issued for.

use shared::domain::{DetectionResult, SelectionId, SubmissionId};
use tracing::{debug, info, warn};

use crate::{
    asset::ImageAsset,
    display::DisplayState,
    error::ErrorReason,
    preview::{PreviewHandle, PreviewHost},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Pending(SubmissionId),
    Succeeded(DetectionResult),
    Failed(ErrorReason),
}

/// Work order for the detection request that moved the controller to `Pending`.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub id: SubmissionId,
    pub selection: SelectionId,
    pub asset: ImageAsset,
}

#[derive(Debug, Clone)]
pub enum SubmitStart {
    Started(PendingSubmission),
    AlreadyPending(SubmissionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredTextRequest {
    pub selection: SelectionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The response belongs to a superseded submission or selection.
    Stale,
    /// Nothing to attach the response to.
    Ignored,
}

pub struct SubmissionController {
    previews: Box<dyn PreviewHost>,
    asset: Option<ImageAsset>,
    preview: Option<PreviewHandle>,
    selection: SelectionId,
    state: SubmissionState,
    next_submission: u64,
}

impl SubmissionController {
    pub fn new(previews: Box<dyn PreviewHost>) -> Self {
        Self {
            previews,
            asset: None,
            preview: None,
            selection: SelectionId(0),
            state: SubmissionState::Idle,
            next_submission: 1,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn asset(&self) -> Option<&ImageAsset> {
        self.asset.as_ref()
    }

    pub fn preview(&self) -> Option<PreviewHandle> {
        self.preview
    }

    pub fn preview_dimensions(&self) -> Option<(u32, u32)> {
        self.preview
            .and_then(|handle| self.previews.dimensions(handle))
    }

    pub fn selection(&self) -> SelectionId {
        self.selection
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SubmissionState::Pending(_))
    }

    /// Replaces the selected image. Any pending submission is orphaned and its
    /// eventual response will be discarded.
    pub fn select_image(&mut self, asset: ImageAsset) -> SelectionId {
        self.release_preview();

        self.preview = match self.previews.create(&asset) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(
                    file_name = asset.file_name(),
                    "preview: unavailable for selected image: {err}"
                );
                None
            }
        };

        if let SubmissionState::Pending(id) = self.state {
            info!(submission = %id, "detect: pending submission superseded by new selection");
        }

        self.selection = SelectionId(self.selection.0 + 1);
        info!(
            selection = %self.selection,
            file_name = asset.file_name(),
            size_bytes = asset.len(),
            "detect: image selected"
        );
        self.asset = Some(asset);
        self.state = SubmissionState::Idle;
        self.selection
    }

    pub fn begin_submit(&mut self) -> Result<SubmitStart, ErrorReason> {
        if let SubmissionState::Pending(id) = self.state {
            debug!(submission = %id, "detect: submit ignored while a request is in flight");
            return Ok(SubmitStart::AlreadyPending(id));
        }

        let Some(asset) = self.asset.clone() else {
            warn!("detect: submit without a selected image");
            self.state = SubmissionState::Failed(ErrorReason::NoImageSelected);
            return Err(ErrorReason::NoImageSelected);
        };

        let id = SubmissionId(self.next_submission);
        self.next_submission += 1;
        self.state = SubmissionState::Pending(id);
        info!(submission = %id, selection = %self.selection, "detect: submission started");

        Ok(SubmitStart::Started(PendingSubmission {
            id,
            selection: self.selection,
            asset,
        }))
    }

    pub fn complete_submission(
        &mut self,
        id: SubmissionId,
        outcome: Result<DetectionResult, ErrorReason>,
    ) -> Completion {
        if self.state != SubmissionState::Pending(id) {
            info!(submission = %id, "detect: discarding stale response");
            return Completion::Stale;
        }

        self.state = match outcome {
            Ok(result) => {
                info!(submission = %id, label = %result.label, "detect: submission succeeded");
                SubmissionState::Succeeded(result)
            }
            Err(reason) => {
                warn!(submission = %id, %reason, "detect: submission failed");
                SubmissionState::Failed(reason)
            }
        };
        Completion::Applied
    }

    pub fn begin_fetch_stored_text(&self) -> StoredTextRequest {
        StoredTextRequest {
            selection: self.selection,
        }
    }

    /// Attaches server-side decoded text to the current result. The
    /// classification label is left untouched.
    pub fn apply_stored_text(&mut self, request: StoredTextRequest, text: String) -> Completion {
        if request.selection != self.selection {
            info!(selection = %request.selection, "detect: discarding stale stored text");
            return Completion::Stale;
        }

        match &mut self.state {
            SubmissionState::Succeeded(result) => {
                result.hidden_text = Some(text);
                result.decoding_method = None;
                Completion::Applied
            }
            _ => {
                debug!("detect: stored text received without a successful result");
                Completion::Ignored
            }
        }
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState::derive(&self.state, self.asset.as_ref())
    }

    fn release_preview(&mut self) {
        if let Some(handle) = self.preview.take() {
            self.previews.release(handle);
        }
    }
}

impl Drop for SubmissionController {
    fn drop(&mut self) {
        self.release_preview();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
