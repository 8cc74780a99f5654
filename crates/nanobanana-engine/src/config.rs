use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use nanobanana_contracts::models::DEFAULT_PRIMARY_MODEL;

use crate::error::GenerationError;

pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "nanobanana-output";

pub const MODEL_ENV: &str = "NANOBANANA_MODEL";
pub const FALLBACK_MODELS_ENV: &str = "NANOBANANA_FALLBACK_MODELS";
pub const TIMEOUT_ENV: &str = "NANOBANANA_TIMEOUT";
pub const OUTPUT_DIR_ENV: &str = "NANOBANANA_OUTPUT_DIR";
pub const API_BASE_ENV: &str = "GEMINI_API_BASE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    GeminiApiKey,
    GoogleApiKey,
}

/// Credential sources, highest priority first.
pub const CREDENTIAL_SOURCES: [(&str, KeyType); 4] = [
    ("NANOBANANA_GEMINI_API_KEY", KeyType::GeminiApiKey),
    ("NANOBANANA_GOOGLE_API_KEY", KeyType::GoogleApiKey),
    ("GEMINI_API_KEY", KeyType::GeminiApiKey),
    ("GOOGLE_API_KEY", KeyType::GoogleApiKey),
];

/// Static API key, read once at startup.
#[derive(Clone)]
pub struct Credential {
    api_key: String,
    key_type: KeyType,
    source: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &"[REDACTED]")
            .field("key_type", &self.key_type)
            .field("source", &self.source)
            .finish()
    }
}

impl Credential {
    pub fn new(api_key: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            api_key: api_key.into(),
            key_type,
            source: "explicit".to_string(),
        }
    }

    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, key_type) in CREDENTIAL_SOURCES {
            if let Some(api_key) = lookup(key).and_then(non_empty) {
                tracing::debug!(source = key, "found API key");
                return Ok(Self {
                    api_key,
                    key_type,
                    source: key.to_string(),
                });
            }
        }
        Err(GenerationError::AuthenticationMissing)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replaces every occurrence of the key in `text`.
    pub fn redact(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            return text.to_string();
        }
        text.replace(&self.api_key, "[REDACTED]")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub primary_model: String,
    /// `None` selects the built-in fallback list.
    pub fallback_models: Option<Vec<String>>,
    pub timeout: Duration,
    pub api_base: String,
    pub output_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_models: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            api_base: DEFAULT_API_BASE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR_NAME),
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| values.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);
        let defaults = Self::default();

        let primary_model = get(MODEL_ENV).unwrap_or(defaults.primary_model);
        let fallback_models = get(FALLBACK_MODELS_ENV).map(|raw| parse_model_list(&raw));
        let timeout = get(TIMEOUT_ENV)
            .map(|raw| parse_timeout(&raw))
            .unwrap_or(defaults.timeout);
        let api_base = get(API_BASE_ENV)
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.api_base);
        let output_dir = get(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                env::current_dir()
                    .map(|cwd| cwd.join(DEFAULT_OUTPUT_DIR_NAME))
                    .unwrap_or(defaults.output_dir)
            });

        Self {
            primary_model,
            fallback_models,
            timeout,
            api_base,
            output_dir,
        }
    }
}

pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_timeout(raw: &str) -> Duration {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        _ => {
            tracing::warn!(
                "Invalid {TIMEOUT_ENV} value: {raw}, using default {DEFAULT_TIMEOUT_SECS}"
            );
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn credential_sources_follow_priority() {
        let values = map(&[
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", "gemini"),
            ("NANOBANANA_GOOGLE_API_KEY", "nb-google"),
        ]);
        let credential = Credential::from_lookup(|key| values.get(key).cloned()).unwrap();
        assert_eq!(credential.api_key(), "nb-google");
        assert_eq!(credential.key_type(), KeyType::GoogleApiKey);
        assert_eq!(credential.source(), "NANOBANANA_GOOGLE_API_KEY");
    }

    #[test]
    fn blank_credentials_are_skipped() {
        let values = map(&[("NANOBANANA_GEMINI_API_KEY", "   "), ("GOOGLE_API_KEY", "k")]);
        let credential = Credential::from_lookup(|key| values.get(key).cloned()).unwrap();
        assert_eq!(credential.api_key(), "k");
    }

    #[test]
    fn missing_credential_is_authentication_error() {
        let err = Credential::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, GenerationError::AuthenticationMissing));
    }

    #[test]
    fn credential_debug_and_redaction_hide_the_key() {
        let credential = Credential::new("sekrit-123", KeyType::GeminiApiKey);
        assert!(!format!("{credential:?}").contains("sekrit-123"));
        assert_eq!(
            credential.redact("https://host/models/m:generateContent?key=sekrit-123"),
            "https://host/models/m:generateContent?key=[REDACTED]"
        );
    }

    #[test]
    fn config_defaults_without_environment() {
        let config = GeneratorConfig::from_map(&HashMap::new());
        assert_eq!(config.primary_model, "gemini-2.5-flash-image");
        assert_eq!(config.fallback_models, None);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.output_dir.ends_with(DEFAULT_OUTPUT_DIR_NAME));
    }

    #[test]
    fn config_reads_every_key() {
        let config = GeneratorConfig::from_map(&map(&[
            (MODEL_ENV, "gemini-3-pro-image-preview"),
            (FALLBACK_MODELS_ENV, " a, ,b ,, c "),
            (TIMEOUT_ENV, "12.5"),
            (API_BASE_ENV, "http://127.0.0.1:9000/v1beta/"),
            (OUTPUT_DIR_ENV, "/tmp/images"),
        ]));
        assert_eq!(config.primary_model, "gemini-3-pro-image-preview");
        assert_eq!(
            config.fallback_models,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(config.timeout, Duration::from_secs_f64(12.5));
        assert_eq!(config.api_base, "http://127.0.0.1:9000/v1beta");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/images"));
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        for raw in ["soon", "-3", "0"] {
            let config = GeneratorConfig::from_map(&map(&[(TIMEOUT_ENV, raw)]));
            assert_eq!(config.timeout, Duration::from_secs(60));
        }
    }
}
