//! Wire contract of the detection service.
//!
//! Two response shapes are in circulation: the minimal `{ "prediction": .. }`
//! and the richer `{ prediction, confidence, decryption_method, plain_text }`.
//! Older stub deployments answer `{ "message": .., "confidence": .. }`.
//! [`PredictResponse`] accepts all of them.

use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::DetectionResult;

/// Multipart field carrying the image bytes.
pub const UPLOAD_FIELD: &str = "file";

pub fn predict_route() -> &'static str {
    "/predict"
}

pub fn legacy_predict_route() -> &'static str {
    "/detect-stegano"
}

pub fn stored_text_route() -> &'static str {
    "/stored-text"
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decryption_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTextResponse {
    pub text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("response carries no prediction label")]
    MissingLabel,
}

impl PredictResponse {
    pub fn label(&self) -> Option<&str> {
        [self.prediction.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|label| !label.is_empty())
    }

    pub fn into_detection_result(self) -> Result<DetectionResult, ProtocolError> {
        let label = self.label().ok_or(ProtocolError::MissingLabel)?.to_string();
        Ok(DetectionResult {
            label,
            confidence_score: self.confidence.and_then(normalize_confidence),
            decoding_method: self
                .decryption_method
                .map(|method| method.trim().to_string())
                .filter(|method| !method.is_empty()),
            hidden_text: self.plain_text,
        })
    }
}

impl From<&DetectionResult> for PredictResponse {
    fn from(result: &DetectionResult) -> Self {
        Self {
            prediction: Some(result.label.clone()),
            message: None,
            confidence: result.confidence_score,
            decryption_method: result.decoding_method.clone(),
            plain_text: result.hidden_text.clone(),
        }
    }
}

fn normalize_confidence(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.clamp(0.0, 100.0))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        LooseNumber::Number(number) => Some(number),
        LooseNumber::Text(text) => text.trim().trim_end_matches('%').trim().parse().ok(),
        LooseNumber::Other(_) => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> PredictResponse {
        serde_json::from_str(body).expect("json")
    }

    #[test]
    fn minimal_shape_yields_label_only() {
        let result = parse(r#"{"prediction": "Clean Image"}"#)
            .into_detection_result()
            .expect("result");
        assert_eq!(result, DetectionResult::labeled("Clean Image"));
    }

    #[test]
    fn rich_shape_populates_every_field() {
        let result = parse(
            r#"{"prediction": "Steganographic Image", "confidence": 92,
                "decryption_method": "LSB", "plain_text": "secret"}"#,
        )
        .into_detection_result()
        .expect("result");
        assert_eq!(result.label, "Steganographic Image");
        assert_eq!(result.confidence_score, Some(92.0));
        assert_eq!(result.decoding_method.as_deref(), Some("LSB"));
        assert_eq!(result.hidden_text.as_deref(), Some("secret"));
    }

    #[test]
    fn legacy_message_shape_is_accepted() {
        let result = parse(r#"{"message": "Steganography detected!", "confidence": 9.8}"#)
            .into_detection_result()
            .expect("result");
        assert_eq!(result.label, "Steganography detected!");
        assert_eq!(result.confidence_score, Some(9.8));
    }

    #[test]
    fn prediction_wins_over_message() {
        let response = parse(r#"{"prediction": "Clean Image", "message": "ignored"}"#);
        assert_eq!(response.label(), Some("Clean Image"));
    }

    #[test]
    fn nulls_and_odd_confidence_values_are_tolerated() {
        let response = parse(
            r#"{"prediction": "Clean Image", "confidence": null,
                "decryption_method": null, "plain_text": null}"#,
        );
        assert_eq!(response.confidence, None);

        let response = parse(r#"{"prediction": "x", "confidence": "87.5%"}"#);
        assert_eq!(response.confidence, Some(87.5));

        let response = parse(r#"{"prediction": "x", "confidence": true}"#);
        assert_eq!(response.confidence, None);
    }

    #[test]
    fn confidence_is_clamped_into_percentage_range() {
        let result = parse(r#"{"prediction": "x", "confidence": 140}"#)
            .into_detection_result()
            .expect("result");
        assert_eq!(result.confidence_score, Some(100.0));

        let result = parse(r#"{"prediction": "x", "confidence": -3}"#)
            .into_detection_result()
            .expect("result");
        assert_eq!(result.confidence_score, Some(0.0));
    }

    #[test]
    fn blank_or_missing_label_is_rejected() {
        assert_eq!(
            parse(r#"{"confidence": 50}"#).into_detection_result(),
            Err(ProtocolError::MissingLabel)
        );
        assert_eq!(
            parse(r#"{"prediction": "   "}"#).into_detection_result(),
            Err(ProtocolError::MissingLabel)
        );
    }

    #[test]
    fn blank_decryption_method_is_dropped() {
        let result = parse(r#"{"prediction": "x", "decryption_method": " ", "plain_text": "p"}"#)
            .into_detection_result()
            .expect("result");
        assert_eq!(result.decoding_method, None);
        assert_eq!(result.hidden_text.as_deref(), Some("p"));
    }

    #[test]
    fn serialized_rich_response_omits_absent_fields() {
        let body = serde_json::to_value(PredictResponse::from(&DetectionResult::labeled(
            "Clean Image",
        )))
        .expect("json");
        assert_eq!(body, serde_json::json!({ "prediction": "Clean Image" }));
    }
}
