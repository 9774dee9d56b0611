use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_SETTINGS_FILE: &str = "detector_stub.toml";

/// Canned verdict and runtime knobs of the stub detection service.
#[derive(Debug, Clone, PartialEq)]
pub struct StubSettings {
    pub bind_addr: String,
    pub prediction: String,
    pub confidence: Option<f64>,
    pub decryption_method: Option<String>,
    pub plain_text: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for StubSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".into(),
            prediction: "Clean Image".into(),
            confidence: None,
            decryption_method: None,
            plain_text: None,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

pub fn load_settings() -> StubSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> StubSettings {
    let mut settings = StubSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
                settings.bind_addr = v.to_string();
            }
            if let Some(v) = file_cfg.get("prediction").and_then(toml::Value::as_str) {
                settings.prediction = v.to_string();
            }
            if let Some(v) = file_cfg.get("confidence").and_then(toml_number) {
                settings.confidence = Some(v);
            }
            if let Some(v) = file_cfg.get("decryption_method").and_then(toml::Value::as_str) {
                settings.decryption_method = Some(v.to_string());
            }
            if let Some(v) = file_cfg.get("plain_text").and_then(toml::Value::as_str) {
                settings.plain_text = Some(v.to_string());
            }
            if let Some(v) = file_cfg
                .get("max_upload_bytes")
                .and_then(toml::Value::as_integer)
                .and_then(|v| usize::try_from(v).ok())
            {
                settings.max_upload_bytes = v;
            }
        }
    }

    if let Some(v) = env("STUB_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__PREDICTION") {
        settings.prediction = v;
    }
    if let Some(v) = env("APP__CONFIDENCE").and_then(|v| v.parse().ok()) {
        settings.confidence = Some(v);
    }
    if let Some(v) = env("APP__DECRYPTION_METHOD") {
        settings.decryption_method = Some(v);
    }
    if let Some(v) = env("APP__PLAIN_TEXT") {
        settings.plain_text = Some(v);
    }
    if let Some(v) = env("APP__MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
        settings.max_upload_bytes = v;
    }

    settings
}

fn toml_number(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|v| v as f64))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
