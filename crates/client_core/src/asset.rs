use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

/// Image chosen by the user. Cloning shares the underlying bytes.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    file_name: String,
    mime_type: Option<String>,
    bytes: Arc<[u8]>,
}

impl ImageAsset {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: Option<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image.bin")
            .to_string();
        let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        Ok(Self::new(file_name, mime_type, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn looks_like_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|mime| mime.starts_with("image/"))
            .unwrap_or(false)
    }
}
