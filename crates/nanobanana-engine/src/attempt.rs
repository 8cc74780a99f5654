use serde_json::{json, Value};

use nanobanana_contracts::models::{FallbackChain, ModelEntry};

use crate::backend::{build_request_body, BackendResponse, ContentBackend, InlineImage, WireOptions};
use crate::error::GenerationError;
use crate::events::RunEvents;
use crate::extract::{extract_image, ExtractedImage};

/// Everything one attempt sends, identical for every model it tries.
#[derive(Debug, Clone, Copy)]
pub struct AttemptInput<'a> {
    pub prompt: &'a str,
    pub input_image: Option<&'a InlineImage>,
    pub references: &'a [InlineImage],
    pub options: WireOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedImage {
    pub image: ExtractedImage,
    pub model_used: String,
    pub used_fallback: bool,
}

#[derive(Debug)]
enum AttemptState {
    TryModel(usize),
    NextModel { index: usize, error: GenerationError },
    Success(ServedImage),
    Exhausted,
}

/// Walks the fallback chain for a single attempt.
///
/// Each model gets exactly one call. Any transport error, non-2xx status or
/// reply without an image moves on to the next model; only the last error
/// survives exhaustion.
pub struct AttemptExecutor<'a> {
    backend: &'a dyn ContentBackend,
    chain: &'a FallbackChain,
    events: &'a RunEvents,
}

impl<'a> AttemptExecutor<'a> {
    pub fn new(backend: &'a dyn ContentBackend, chain: &'a FallbackChain, events: &'a RunEvents) -> Self {
        Self {
            backend,
            chain,
            events,
        }
    }

    pub fn execute(&self, index: usize, input: &AttemptInput<'_>) -> Result<ServedImage, GenerationError> {
        let mut last_error = None;
        let mut state = AttemptState::TryModel(0);
        loop {
            state = match state {
                AttemptState::TryModel(position) => match self.chain.get(position) {
                    Some(entry) => match self.try_model(entry, input) {
                        Ok(image) => AttemptState::Success(ServedImage {
                            image,
                            model_used: entry.name.clone(),
                            used_fallback: entry.name != self.chain.primary().name,
                        }),
                        Err(error) => AttemptState::NextModel {
                            index: position,
                            error,
                        },
                    },
                    None => AttemptState::Exhausted,
                },
                AttemptState::NextModel { index: position, error } => {
                    let model = self.chain.get(position).map(|entry| entry.name.as_str());
                    let next = self.chain.get(position + 1).map(|entry| entry.name.as_str());
                    tracing::warn!(
                        attempt = index,
                        model = model.unwrap_or_default(),
                        next = next.unwrap_or("none"),
                        "Model failed: {error}"
                    );
                    self.events.emit(
                        "model_fallback",
                        json!({
                            "index": index,
                            "model": model,
                            "next_model": next,
                            "error": error.to_string(),
                        }),
                    );
                    last_error = Some(error);
                    AttemptState::TryModel(position + 1)
                }
                AttemptState::Success(served) => {
                    if served.used_fallback {
                        tracing::info!(
                            attempt = index,
                            model = %served.model_used,
                            primary = %self.chain.primary().name,
                            "served by fallback model"
                        );
                    }
                    return Ok(served);
                }
                AttemptState::Exhausted => {
                    let last = last_error.unwrap_or(GenerationError::NoImageInResponse);
                    return Err(GenerationError::AllModelsExhausted {
                        last: Box::new(last),
                    });
                }
            };
        }
    }

    fn try_model(&self, entry: &ModelEntry, input: &AttemptInput<'_>) -> Result<ExtractedImage, GenerationError> {
        let body = build_request_body(input.prompt, entry, &input.options, input.input_image, input.references);
        tracing::debug!(model = %entry.name, backend = self.backend.name(), "trying model");
        let response = self.backend.generate_content(&entry.name, &body)?;
        classify_response(&response)
    }
}

/// Maps a raw backend reply onto an image or a fallback-advancing error.
pub fn classify_response(response: &BackendResponse) -> Result<ExtractedImage, GenerationError> {
    if !response.is_success() {
        return Err(GenerationError::NonSuccessStatus {
            status: response.status,
            message: error_message(&response.body),
        });
    }
    let parsed: Value = serde_json::from_str(&response.body)
        .map_err(|err| GenerationError::Transport(format!("invalid JSON in response: {err}")))?;
    extract_image(&parsed).ok_or(GenerationError::NoImageInResponse)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
