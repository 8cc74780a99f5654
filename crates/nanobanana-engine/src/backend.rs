use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Map, Value};

use nanobanana_contracts::models::ModelEntry;
use nanobanana_contracts::request::{AspectRatio, Resolution};

use crate::config::{Credential, GeneratorConfig};
use crate::error::GenerationError;

/// Base64 image payload sent to the backend as an `inlineData` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    fn to_part(&self) -> Value {
        json!({
            "inlineData": {
                "mimeType": self.mime_type,
                "data": self.data,
            }
        })
    }
}

/// Per-attempt generation options; identical for every model in the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireOptions {
    pub resolution: Option<Resolution>,
    pub aspect_ratio: Option<AspectRatio>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to a generative backend.
///
/// Implementations only report transport-level failures (`Timeout`,
/// `Transport`); status and body classification belongs to the caller.
pub trait ContentBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate_content(
        &self,
        model: &str,
        payload: &Value,
    ) -> Result<BackendResponse, GenerationError>;
}

pub fn build_request_body(
    prompt: &str,
    model: &ModelEntry,
    options: &WireOptions,
    input_image: Option<&InlineImage>,
    references: &[InlineImage],
) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    if let Some(image) = input_image {
        parts.push(image.to_part());
    }
    parts.extend(references.iter().map(InlineImage::to_part));

    let mut image_config = Map::new();
    if let Some(aspect_ratio) = options.aspect_ratio {
        image_config.insert(
            "aspectRatio".to_string(),
            Value::String(aspect_ratio.as_str().to_string()),
        );
    }
    if model.supports_image_size {
        if let Some(resolution) = options.resolution {
            image_config.insert(
                "imageSize".to_string(),
                Value::String(resolution.as_str().to_string()),
            );
        }
    }

    let mut generation_config = Map::new();
    generation_config.insert("responseModalities".to_string(), json!(["Image"]));
    if !image_config.is_empty() {
        generation_config.insert("imageConfig".to_string(), Value::Object(image_config));
    }
    if let Some(seed) = options.seed {
        generation_config.insert("seed".to_string(), json!(seed));
    }

    json!({
        "contents": [
            {
                "role": "user",
                "parts": parts,
            }
        ],
        "generationConfig": Value::Object(generation_config),
    })
}

pub struct GeminiBackend {
    api_base: String,
    credential: Credential,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiBackend {
    pub fn new(config: &GeneratorConfig, credential: Credential) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credential,
            timeout: config.timeout,
            http: HttpClient::new(),
        }
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl ContentBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(
        &self,
        model: &str,
        payload: &Value,
    ) -> Result<BackendResponse, GenerationError> {
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(model, endpoint = %endpoint, "posting generateContent");

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.credential.api_key())])
            .timeout(self.timeout)
            .json(payload)
            .send()
            .map_err(|err| classify_transport_error(&self.credential, err))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| classify_transport_error(&self.credential, err))?;
        Ok(BackendResponse { status, body })
    }
}

fn classify_transport_error(credential: &Credential, err: reqwest::Error) -> GenerationError {
    let timed_out = err.is_timeout();
    let text = credential.redact(&err.without_url().to_string());
    if timed_out {
        GenerationError::Timeout(text)
    } else {
        GenerationError::Transport(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyType;

    fn entry(name: &str, supports_image_size: bool) -> ModelEntry {
        ModelEntry {
            name: name.to_string(),
            supports_image_size,
        }
    }

    #[test]
    fn body_carries_text_then_images() {
        let input = InlineImage {
            mime_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        };
        let references = vec![InlineImage {
            mime_type: "image/jpeg".to_string(),
            data: "BBBB".to_string(),
        }];
        let body = build_request_body(
            "make it blue",
            &entry("gemini-2.5-flash-image", false),
            &WireOptions::default(),
            Some(&input),
            &references,
        );

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "make it blue");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["inlineData"]["data"], "BBBB");
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["Image"]));
        assert!(body["generationConfig"].get("imageConfig").is_none());
        assert!(body["generationConfig"].get("seed").is_none());
    }

    #[test]
    fn image_size_only_for_capable_models() {
        let options = WireOptions {
            resolution: Some(Resolution::FourK),
            aspect_ratio: Some(AspectRatio::Landscape16x9),
            seed: Some(42),
        };

        let plain = build_request_body("p", &entry("gemini-2.5-flash-image", false), &options, None, &[]);
        assert_eq!(plain["generationConfig"]["imageConfig"], json!({"aspectRatio": "16:9"}));
        assert_eq!(plain["generationConfig"]["seed"], json!(42));

        let tiered = build_request_body("p", &entry("gemini-3-pro-image-preview", true), &options, None, &[]);
        assert_eq!(
            tiered["generationConfig"]["imageConfig"],
            json!({"aspectRatio": "16:9", "imageSize": "4K"})
        );
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_models() {
        let config = GeneratorConfig {
            api_base: "https://example.test/v1beta/".to_string(),
            ..GeneratorConfig::default()
        };
        let backend = GeminiBackend::new(&config, Credential::new("k", KeyType::GeminiApiKey));
        assert_eq!(
            backend.endpoint_for_model("gemini-2.5-flash-image"),
            "https://example.test/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(
            backend.endpoint_for_model("models/gemini-3-pro-image-preview"),
            "https://example.test/v1beta/models/gemini-3-pro-image-preview:generateContent"
        );
    }

    #[test]
    fn success_range_is_2xx() {
        let ok = BackendResponse { status: 200, body: String::new() };
        let not_found = BackendResponse { status: 404, body: String::new() };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }
}
