use std::fmt;

use shared::domain::DetectionResult;

use crate::{asset::ImageAsset, controller::SubmissionState, error::ErrorReason};

pub const SELECT_PROMPT: &str = "Click to Select an Image";
pub const PENDING_MESSAGE: &str = "Detecting...";
pub const NO_IMAGE_MESSAGE: &str = "Please select an image first.";
pub const NETWORK_FAILURE_MESSAGE: &str = "Error detecting steganography: the detection service could not be reached. Check your connection and try again.";

/// What the front end should render for the current submission state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    Idle {
        prompt: String,
    },
    Pending {
        message: String,
    },
    Result {
        summary: String,
        hidden_text_panel: Option<String>,
    },
    Error {
        message: String,
    },
}

impl DisplayState {
    pub fn derive(state: &SubmissionState, asset: Option<&ImageAsset>) -> Self {
        match state {
            SubmissionState::Idle => Self::Idle {
                prompt: match asset {
                    Some(asset) => format!("Ready to detect {}", asset.file_name()),
                    None => SELECT_PROMPT.to_string(),
                },
            },
            SubmissionState::Pending(_) => Self::Pending {
                message: PENDING_MESSAGE.to_string(),
            },
            SubmissionState::Succeeded(result) => Self::Result {
                summary: result_summary(result),
                hidden_text_panel: hidden_text_panel(result),
            },
            SubmissionState::Failed(reason) => Self::Error {
                message: error_message(reason),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle { prompt } => write!(f, "{prompt}"),
            Self::Pending { message } => write!(f, "{message}"),
            Self::Result {
                summary,
                hidden_text_panel,
            } => {
                write!(f, "Detection Result: {summary}")?;
                if let Some(panel) = hidden_text_panel {
                    write!(f, "\nHidden Text: {panel}")?;
                }
                Ok(())
            }
            Self::Error { message } => write!(f, "{message}"),
        }
    }
}

fn result_summary(result: &DetectionResult) -> String {
    match result.confidence_score {
        Some(confidence) => format!("{} (Confidence: {confidence}%)", result.label),
        None => result.label.clone(),
    }
}

fn hidden_text_panel(result: &DetectionResult) -> Option<String> {
    let text = result.hidden_text.as_ref()?;
    Some(match &result.decoding_method {
        Some(method) => format!("{method} - {text}"),
        None => text.clone(),
    })
}

fn error_message(reason: &ErrorReason) -> String {
    match reason {
        ErrorReason::NoImageSelected => NO_IMAGE_MESSAGE.to_string(),
        ErrorReason::NetworkFailure => NETWORK_FAILURE_MESSAGE.to_string(),
        ErrorReason::ServerError(detail) => format!("Detection service error: {detail}"),
    }
}
