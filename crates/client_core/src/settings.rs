use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use shared::protocol::{predict_route, stored_text_route};
use url::Url;

use crate::preview::DEFAULT_PREVIEW_MAX_DIMENSION;

pub const DEFAULT_SETTINGS_FILE: &str = "detector.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub service_url: String,
    pub predict_path: String,
    pub stored_text_path: String,
    pub request_timeout_secs: u64,
    pub preview_max_dimension: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000".into(),
            predict_path: predict_route().into(),
            stored_text_path: stored_text_route().into(),
            request_timeout_secs: 30,
            preview_max_dimension: DEFAULT_PREVIEW_MAX_DIMENSION,
        }
    }
}

impl ClientSettings {
    pub fn predict_url(&self) -> Result<Url> {
        endpoint_url(&self.service_url, &self.predict_path)
    }

    pub fn stored_text_url(&self) -> Result<Url> {
        endpoint_url(&self.service_url, &self.stored_text_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat TOML file at `path`, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, &file_cfg),
            Err(err) => tracing::warn!(path = %path.display(), "settings: ignoring unreadable file: {err}"),
        }
    }

    if let Some(v) = env("DETECTOR_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__PREDICT_PATH") {
        settings.predict_path = v;
    }
    if let Some(v) = env("APP__STORED_TEXT_PATH") {
        settings.stored_text_path = v;
    }
    if let Some(parsed) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = parsed;
    }
    if let Some(parsed) = env("APP__PREVIEW_MAX_DIMENSION").and_then(|v| v.parse().ok()) {
        settings.preview_max_dimension = parsed;
    }

    settings
}

fn apply_file_settings(settings: &mut ClientSettings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("service_url").and_then(toml::Value::as_str) {
        settings.service_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("predict_path").and_then(toml::Value::as_str) {
        settings.predict_path = v.to_string();
    }
    if let Some(v) = file_cfg.get("stored_text_path").and_then(toml::Value::as_str) {
        settings.stored_text_path = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg
        .get("preview_max_dimension")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u32::try_from(v).ok())
    {
        settings.preview_max_dimension = v;
    }
}

fn endpoint_url(service_url: &str, path: &str) -> Result<Url> {
    let base = service_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(anyhow!("detection service url is empty"));
    }
    let path = path.trim();
    let joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    let url = Url::parse(&joined).with_context(|| format!("invalid endpoint url '{joined}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("unsupported scheme '{other}' in '{joined}'")),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn temp_file(contents: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("detector_settings_test_{suffix}.toml"));
        fs::write(&path, contents).expect("write settings");
        path
    }

    #[test]
    fn defaults_apply_when_file_is_missing() {
        let settings = load_settings_from(Path::new("/nonexistent/detector.toml"), no_env);
        assert_eq!(settings, ClientSettings::default());
        assert_eq!(
            settings.predict_url().expect("url").as_str(),
            "http://127.0.0.1:5000/predict"
        );
        assert_eq!(
            settings.stored_text_url().expect("url").as_str(),
            "http://127.0.0.1:5000/stored-text"
        );
    }

    #[test]
    fn file_values_override_defaults_and_env_overrides_file() {
        let path = temp_file(
            "service_url = \"http://detector.local:8080/\"\npredict_path = \"detect-stegano\"\nrequest_timeout_secs = 5\n",
        );

        let settings = load_settings_from(&path, no_env);
        assert_eq!(settings.request_timeout_secs, 5);
        assert_eq!(
            settings.predict_url().expect("url").as_str(),
            "http://detector.local:8080/detect-stegano"
        );

        let settings = load_settings_from(&path, |key| match key {
            "APP__SERVICE_URL" => Some("https://override.example".into()),
            "APP__PREVIEW_MAX_DIMENSION" => Some("256".into()),
            "APP__REQUEST_TIMEOUT_SECS" => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(settings.service_url, "https://override.example");
        assert_eq!(settings.preview_max_dimension, 256);
        assert_eq!(settings.request_timeout_secs, 5);

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let path = temp_file("service_url = [unterminated");
        let settings = load_settings_from(&path, no_env);
        assert_eq!(settings, ClientSettings::default());
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn endpoint_urls_are_validated() {
        let mut settings = ClientSettings {
            service_url: "  ".into(),
            ..ClientSettings::default()
        };
        assert!(settings.predict_url().is_err());

        settings.service_url = "ftp://files.example".into();
        assert!(settings.predict_url().is_err());

        settings.service_url = "http://127.0.0.1:5000/api".into();
        assert_eq!(
            settings.predict_url().expect("url").as_str(),
            "http://127.0.0.1:5000/api/predict"
        );
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let settings = ClientSettings {
            request_timeout_secs: 0,
            ..ClientSettings::default()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }
}
