//! Calls to the external detection service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::DetectionResult,
    protocol::{PredictResponse, StoredTextResponse, UPLOAD_FIELD},
};
use tracing::{debug, warn};
use url::Url;

use crate::{asset::ImageAsset, error::ServiceError, settings::ClientSettings};

const MAX_ERROR_TEXT_CHARS: usize = 200;

#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn detect(&self, asset: &ImageAsset) -> Result<DetectionResult, ServiceError>;
    async fn fetch_stored_text(&self) -> Result<String, ServiceError>;
}

pub struct HttpDetectionService {
    http: Client,
    predict_url: Url,
    stored_text_url: Url,
}

impl HttpDetectionService {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build detection http client")?;
        Ok(Self {
            http,
            predict_url: settings.predict_url()?,
            stored_text_url: settings.stored_text_url()?,
        })
    }

    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    fn upload_form(asset: &ImageAsset) -> Form {
        let part = Part::bytes(asset.bytes().to_vec()).file_name(asset.file_name().to_string());
        let part = match asset.mime_type() {
            Some(mime) => match part.mime_str(mime) {
                Ok(part) => part,
                Err(err) => {
                    warn!(mime, "detect: ignoring unusable mime type: {err}");
                    Part::bytes(asset.bytes().to_vec()).file_name(asset.file_name().to_string())
                }
            },
            None => part,
        };
        Form::new().part(UPLOAD_FIELD, part)
    }
}

#[async_trait]
impl DetectionService for HttpDetectionService {
    async fn detect(&self, asset: &ImageAsset) -> Result<DetectionResult, ServiceError> {
        debug!(
            url = %self.predict_url,
            file_name = asset.file_name(),
            size_bytes = asset.len(),
            "detect: posting image"
        );
        let response = self
            .http
            .post(self.predict_url.clone())
            .multipart(Self::upload_form(asset))
            .send()
            .await
            .map_err(transport_error)?;
        let body: PredictResponse = read_json(response).await?;
        body.into_detection_result()
            .map_err(|err| ServiceError::Malformed(err.to_string()))
    }

    async fn fetch_stored_text(&self) -> Result<String, ServiceError> {
        debug!(url = %self.stored_text_url, "detect: fetching stored text");
        let response = self
            .http
            .get(self.stored_text_url.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let body: StoredTextResponse = read_json(response).await?;
        Ok(body.text)
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    warn!(
        connect = err.is_connect(),
        timeout = err.is_timeout(),
        "detect: transport failure: {err}"
    );
    ServiceError::Transport(err.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    serde_json::from_slice(&body).map_err(|err| ServiceError::Malformed(err.to_string()))
}

/// Best-effort human readable message from a failed response body.
fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        return ["message", "error"]
            .into_iter()
            .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
    }

    let text = std::str::from_utf8(body).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_ERROR_TEXT_CHARS).collect())
}
