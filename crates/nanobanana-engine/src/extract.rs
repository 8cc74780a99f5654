use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

/// Text parts shorter than this are never treated as image payloads.
pub const TEXT_PAYLOAD_MIN_LEN: usize = 1000;
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Pulls the image out of a `generateContent` reply.
///
/// Structured `inlineData` parts win; one that fails to decode yields to the next.
/// Only when no part decodes are long base64-looking `text` parts tried, and
/// those are assumed to be JPEG. Neither path checks that the bytes form an image.
pub fn extract_image(response: &Value) -> Option<ExtractedImage> {
    let parts = first_candidate_parts(response)?;
    extract_inline(parts).or_else(|| extract_text_payload(parts))
}

fn first_candidate_parts(response: &Value) -> Option<&Vec<Value>> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
}

fn extract_inline(parts: &[Value]) -> Option<ExtractedImage> {
    parts.iter().find_map(|part| {
        let inline = part.get("inlineData")?;
        let data = inline.get("data").and_then(Value::as_str)?;
        if data.is_empty() {
            return None;
        }
        let bytes = match BASE64.decode(data.as_bytes()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "inline image data is not valid base64");
                return None;
            }
        };
        let mime_type = inline
            .get("mimeType")
            .and_then(Value::as_str)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        Some(ExtractedImage { bytes, mime_type })
    })
}

fn extract_text_payload(parts: &[Value]) -> Option<ExtractedImage> {
    parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .filter(|text| text.len() > TEXT_PAYLOAD_MIN_LEN && is_base64_text(text))
        .find_map(|text| BASE64.decode(text.as_bytes()).ok())
        .map(|bytes| ExtractedImage {
            bytes,
            mime_type: DEFAULT_IMAGE_MIME.to_string(),
        })
}

/// Matches `^[A-Za-z0-9+/]*={0,2}$` on a non-empty string.
pub fn is_base64_text(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let body = text.trim_end_matches('=');
    if text.len() - body.len() > 2 {
        return false;
    }
    body.bytes()
        .all(|byte| byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/')
}
