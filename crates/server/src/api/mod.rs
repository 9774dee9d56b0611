use std::sync::Arc;

use shared::{
    domain::DetectionResult,
    error::{ApiError, ErrorCode},
    protocol::{PredictResponse, StoredTextResponse},
};
use tokio::sync::RwLock;

use crate::config::StubSettings;

/// Canned verdict plus the last decoded payload handed out.
#[derive(Clone)]
pub struct StubContext {
    verdict: DetectionResult,
    stored_text: Arc<RwLock<Option<String>>>,
}

impl StubContext {
    pub fn new(verdict: DetectionResult) -> Self {
        Self {
            verdict,
            stored_text: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_settings(settings: &StubSettings) -> Self {
        Self::new(DetectionResult {
            label: settings.prediction.clone(),
            confidence_score: settings.confidence,
            decoding_method: settings.decryption_method.clone(),
            hidden_text: settings.plain_text.clone(),
        })
    }

    pub async fn classify(&self, upload: &[u8]) -> Result<PredictResponse, ApiError> {
        if upload.is_empty() {
            return Err(ApiError::new(ErrorCode::Validation, "uploaded file is empty"));
        }
        if let Some(text) = &self.verdict.hidden_text {
            *self.stored_text.write().await = Some(text.clone());
        }
        Ok(PredictResponse::from(&self.verdict))
    }

    pub async fn stored_text(&self) -> Result<StoredTextResponse, ApiError> {
        self.stored_text
            .read()
            .await
            .clone()
            .map(|text| StoredTextResponse { text })
            .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "no decoded text available"))
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
