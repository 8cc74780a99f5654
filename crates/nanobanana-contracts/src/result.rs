use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Terminal value of one logical request. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub generated_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default)]
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_model: Option<String>,
}

impl GenerationResult {
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            generated_files: Vec::new(),
            error: Some(error.into()),
            model_used: None,
            used_fallback: false,
            primary_model: None,
        }
    }

    /// Successful result. When `used_fallback` is set the message gains a
    /// note naming both the serving and the configured primary model.
    pub fn success(
        message: impl Into<String>,
        generated_files: Vec<PathBuf>,
        model_used: Option<String>,
        used_fallback: bool,
        primary_model: &str,
    ) -> Self {
        let mut message = message.into();
        if used_fallback {
            message.push_str(&format!(
                " (fallback model used: {}, primary: {primary_model})",
                model_used.as_deref().unwrap_or("unknown")
            ));
        }
        Self {
            success: true,
            message,
            generated_files,
            error: None,
            model_used,
            used_fallback,
            primary_model: used_fallback.then(|| primary_model.to_string()),
        }
    }
}
