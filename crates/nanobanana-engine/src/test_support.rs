use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

use crate::backend::{BackendResponse, ContentBackend};
use crate::error::GenerationError;

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(Value),
    Status(u16, String),
    Timeout,
    Transport,
}

/// In-memory backend answering per model name. Unknown models get a 404.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: HashMap<String, Scripted>,
    fail_marker: Option<String>,
    calls: Mutex<Vec<String>>,
    payloads: Mutex<Vec<Value>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, model: &str, reply: Scripted) -> Self {
        self.replies.insert(model.to_string(), reply);
        self
    }

    /// Every model answers 500 when the prompt text contains `marker`.
    pub fn failing_prompts_containing(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads
            .lock()
            .map(|payloads| payloads.clone())
            .unwrap_or_default()
    }
}

impl ContentBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate_content(&self, model: &str, payload: &Value) -> Result<BackendResponse, GenerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(model.to_string());
        }
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(payload.clone());
        }

        let prompt = payload["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
        if let Some(marker) = &self.fail_marker {
            if prompt.contains(marker.as_str()) {
                return Ok(BackendResponse {
                    status: 500,
                    body: r#"{"error":{"message":"scripted failure"}}"#.to_string(),
                });
            }
        }

        match self.replies.get(model) {
            Some(Scripted::Reply(body)) => Ok(BackendResponse {
                status: 200,
                body: body.to_string(),
            }),
            Some(Scripted::Status(status, body)) => Ok(BackendResponse {
                status: *status,
                body: body.clone(),
            }),
            Some(Scripted::Timeout) => Err(GenerationError::Timeout("operation timed out".to_string())),
            Some(Scripted::Transport) => Err(GenerationError::Transport("connection reset".to_string())),
            None => Ok(BackendResponse {
                status: 404,
                body: format!(r#"{{"error":{{"message":"model {model} not found"}}}}"#),
            }),
        }
    }
}

/// Encodes a small real image in the container named by `mime_type`.
pub fn encoded_image(mime_type: &str) -> Vec<u8> {
    let format = if mime_type.contains("png") {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    };
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([200, 40, 90])));
    let mut out = Vec::new();
    let _ = image.write_to(&mut Cursor::new(&mut out), format);
    out
}

/// A `generateContent` reply carrying one inline image.
pub fn image_reply(mime_type: &str) -> Value {
    json!({
        "candidates": [
            {
                "content": {
                    "parts": [
                        {
                            "inlineData": {
                                "mimeType": mime_type,
                                "data": BASE64.encode(encoded_image(mime_type)),
                            }
                        }
                    ]
                }
            }
        ]
    })
}
