use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(SelectionId);
id_newtype!(SubmissionId);

/// Outcome of a successful detection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub label: String,
    /// Percentage in `0.0..=100.0`.
    pub confidence_score: Option<f64>,
    pub decoding_method: Option<String>,
    /// Only set when the service managed to decode a payload.
    pub hidden_text: Option<String>,
}

impl DetectionResult {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence_score: None,
            decoding_method: None,
            hidden_text: None,
        }
    }
}
