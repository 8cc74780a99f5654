use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use nanobanana_contracts::events::EventWriter;
use nanobanana_contracts::models::{FallbackChain, ModelRegistry};
use nanobanana_contracts::prompts::{expand_prompts, story_step_prompts};
use nanobanana_contracts::request::{
    GenerationRequest, Mode, OutputFormat, StoryOptions, MAX_REFERENCE_IMAGES, STORY_MAX_STEPS,
    STORY_MIN_STEPS,
};
use nanobanana_contracts::result::GenerationResult;

use crate::attempt::{AttemptExecutor, AttemptInput};
use crate::backend::{ContentBackend, GeminiBackend, InlineImage, WireOptions};
use crate::batch::{Aggregation, AttemptSuccess, BatchCoordinator, BatchReport};
use crate::config::{Credential, GeneratorConfig};
use crate::convert::normalize_format;
use crate::error::GenerationError;
use crate::events::RunEvents;
use crate::preview::open_previews;
use crate::workspace::{load_inline_image, synthesize_filename, Workspace};

const NO_IMAGE_DATA: &str = "No image data found in API responses";

/// Entry point for every generation request.
///
/// Built once per process; the fallback chain and backend are shared by all
/// attempts of all requests.
pub struct ImageGenerator {
    backend: Arc<dyn ContentBackend>,
    chain: FallbackChain,
    workspace: Workspace,
    events: Option<EventWriter>,
}

impl ImageGenerator {
    pub fn new(config: &GeneratorConfig, credential: Credential) -> Self {
        let backend = Arc::new(GeminiBackend::new(config, credential));
        Self::with_backend(config, backend, Workspace::from_config(config))
    }

    pub fn with_backend(
        config: &GeneratorConfig,
        backend: Arc<dyn ContentBackend>,
        workspace: Workspace,
    ) -> Self {
        let chain = FallbackChain::build(
            &config.primary_model,
            config.fallback_models.as_deref(),
            &ModelRegistry::default(),
        );
        tracing::debug!(
            chain = %chain.describe(),
            timeout_secs = config.timeout.as_secs_f64(),
            backend = backend.name(),
            "model fallback chain"
        );
        Self {
            backend,
            chain,
            workspace,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn primary_model(&self) -> &str {
        &self.chain.primary().name
    }

    pub fn run(&self, request: &GenerationRequest) -> GenerationResult {
        match request.mode {
            Mode::Generate => self.generate(request),
            Mode::Edit | Mode::Restore => self.edit(request),
        }
    }

    /// Text-to-image, fanned out over styles, variations or a plain count.
    pub fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let run = self.start_run("generate", request);
        if request.output_count == 0 {
            let err = GenerationError::InvalidOutputCount { count: 0 };
            return self.finish(&run, rejected(&err));
        }
        let references = match self.load_references(&request.reference_images) {
            Ok(references) => references,
            Err(err) => return self.finish(&run, rejected(&err)),
        };

        let prompts = expand_prompts(
            &request.prompt,
            &request.styles,
            &request.variations,
            request.output_count,
        );
        let force_suffix = request.filename.is_some() && prompts.len() > 1;
        let options = wire_options(request);
        tracing::debug!(
            prompts = prompts.len(),
            width = request.concurrency_width(),
            "generating image(s)"
        );

        let coordinator =
            BatchCoordinator::new(request.concurrency_width(), Aggregation::AppendOnSuccess);
        let report = coordinator.run(&prompts, |index, prompt| {
            let input = AttemptInput {
                prompt,
                input_image: None,
                references: &references,
                options,
            };
            let name_prompt = if request.has_fan_out_modifiers() {
                prompt
            } else {
                request.prompt.as_str()
            };
            self.run_attempt(&run, index, &input, request.output_format, || {
                synthesize_filename(
                    name_prompt,
                    request.output_format,
                    index,
                    request.filename.as_deref(),
                    force_suffix,
                    request.filename_suffix(index),
                )
            })
        });

        let result = if report.is_success() {
            let message = format!(
                "Successfully generated {} image variation(s)",
                report.succeeded()
            );
            self.succeeded(request, message, report)
        } else {
            GenerationResult::failure(
                "Failed to generate any images",
                report.first_error.unwrap_or_else(|| NO_IMAGE_DATA.to_string()),
            )
        };
        self.finish(&run, result)
    }

    /// Edit or restore a single input image.
    pub fn edit(&self, request: &GenerationRequest) -> GenerationResult {
        let run = self.start_run(request.mode.as_str(), request);
        let verb = request.mode.as_str();
        let failed = format!("Failed to {verb} image");

        let (source, references) = match self.prepare_edit(request) {
            Ok(prepared) => prepared,
            Err(err) if err.is_request_level() => return self.finish(&run, rejected(&err)),
            Err(err) => return self.finish(&run, GenerationResult::failure(failed, err.to_string())),
        };

        let prompts = vec![request.prompt.clone()];
        let name_prompt = format!("{verb}_{}", request.prompt);
        let options = wire_options(request);
        let coordinator = BatchCoordinator::new(1, Aggregation::AppendOnSuccess);
        let report = coordinator.run(&prompts, |index, prompt| {
            let input = AttemptInput {
                prompt,
                input_image: Some(&source),
                references: &references,
                options,
            };
            self.run_attempt(&run, index, &input, request.output_format, || {
                synthesize_filename(
                    &name_prompt,
                    request.output_format,
                    0,
                    request.filename.as_deref(),
                    false,
                    request.filename_suffix(0),
                )
            })
        });

        let result = if report.is_success() {
            let message = format!("Successfully {} image", request.mode.past_tense());
            self.succeeded(request, message, report)
        } else {
            GenerationResult::failure(
                failed,
                report
                    .first_error
                    .unwrap_or_else(|| GenerationError::NoImageInResponse.to_string()),
            )
        };
        self.finish(&run, result)
    }

    /// One image per step; files come back in step order with gaps dropped.
    pub fn generate_story(&self, request: &GenerationRequest, story: &StoryOptions) -> GenerationResult {
        let run = self.start_run("story", request);
        let steps = request.output_count;
        if !(STORY_MIN_STEPS..=STORY_MAX_STEPS).contains(&steps) {
            return self.finish(&run, rejected(&GenerationError::InvalidStepCount { steps }));
        }
        let references = match self.load_references(&request.reference_images) {
            Ok(references) => references,
            Err(err) => return self.finish(&run, rejected(&err)),
        };

        let kind = story.kind.as_str();
        let prompts = story_step_prompts(&request.prompt, steps, story);
        let custom = request.filename.as_deref();
        let force_suffix = custom.is_some() && steps > 1;
        let options = wire_options(request);
        tracing::debug!(
            steps,
            kind,
            width = request.concurrency_width(),
            "generating sequence"
        );

        let coordinator = BatchCoordinator::new(request.concurrency_width(), Aggregation::FixedSlot);
        let report = coordinator.run(&prompts, |index, prompt| {
            let input = AttemptInput {
                prompt,
                input_image: None,
                references: &references,
                options,
            };
            self.run_attempt(&run, index, &input, request.output_format, || {
                synthesize_filename(
                    &format!("{kind}_step{}_{}", index + 1, request.prompt),
                    request.output_format,
                    if custom.is_some() { index } else { 0 },
                    custom,
                    force_suffix,
                    None,
                )
            })
        });

        let result = if report.is_success() {
            let message = if report.is_complete() {
                format!("Successfully generated complete {steps}-step {kind} sequence")
            } else {
                format!(
                    "Generated {} out of {steps} requested {kind} steps",
                    report.succeeded()
                )
            };
            self.succeeded(request, message, report)
        } else {
            GenerationResult::failure(
                "Failed to generate any story sequence images",
                report.first_error.unwrap_or_else(|| NO_IMAGE_DATA.to_string()),
            )
        };
        self.finish(&run, result)
    }

    fn prepare_edit(
        &self,
        request: &GenerationRequest,
    ) -> Result<(InlineImage, Vec<InlineImage>), GenerationError> {
        let name = request
            .input_image
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(GenerationError::MissingInputImage)?;
        let references = self.load_references(&request.reference_images)?;
        let lookup = self.workspace.resolve_input_file(name);
        let path = match lookup.path {
            Some(path) if lookup.found => path,
            _ => {
                return Err(GenerationError::InputImageNotFound {
                    name: name.to_string(),
                    searched: lookup.searched,
                })
            }
        };
        Ok((load_inline_image(&path)?, references))
    }

    /// Resolves and reads every reference image before anything is sent.
    fn load_references(&self, names: &[String]) -> Result<Vec<InlineImage>, GenerationError> {
        if names.len() > MAX_REFERENCE_IMAGES {
            return Err(GenerationError::TooManyReferenceImages { count: names.len() });
        }
        names
            .iter()
            .map(|name| {
                let lookup = self.workspace.resolve_input_file(name);
                match lookup.path {
                    Some(path) if lookup.found => load_inline_image(&path),
                    _ => Err(GenerationError::ReferenceImageNotFound {
                        name: name.clone(),
                        searched: lookup.searched,
                    }),
                }
            })
            .collect()
    }

    fn run_attempt<N>(
        &self,
        run: &RunEvents,
        index: usize,
        input: &AttemptInput<'_>,
        format: OutputFormat,
        filename: N,
    ) -> Result<AttemptSuccess, GenerationError>
    where
        N: FnOnce() -> String,
    {
        let outcome = AttemptExecutor::new(self.backend.as_ref(), &self.chain, run)
            .execute(index, input)
            .and_then(|served| {
                let bytes = normalize_format(served.image.bytes, &served.image.mime_type, format)?;
                let path = self.workspace.persist_bytes(&bytes, &filename())?;
                Ok(AttemptSuccess {
                    path,
                    model_used: served.model_used,
                    used_fallback: served.used_fallback,
                })
            });

        match &outcome {
            Ok(success) => run.emit(
                "attempt_succeeded",
                json!({
                    "index": index,
                    "path": success.path,
                    "model": success.model_used,
                    "used_fallback": success.used_fallback,
                }),
            ),
            Err(err) => run.emit(
                "attempt_failed",
                json!({
                    "index": index,
                    "error": err.to_string(),
                }),
            ),
        }
        outcome
    }

    fn succeeded(
        &self,
        request: &GenerationRequest,
        message: String,
        report: BatchReport,
    ) -> GenerationResult {
        if request.preview {
            open_previews(&report.files);
        }
        GenerationResult::success(
            message,
            report.files,
            report.model_used,
            report.used_fallback,
            self.primary_model(),
        )
    }

    fn start_run(&self, operation: &str, request: &GenerationRequest) -> RunEvents {
        let run = RunEvents::new(self.events.clone(), Uuid::new_v4().to_string());
        run.emit(
            "request_started",
            json!({
                "operation": operation,
                "prompt": request.prompt,
                "output_count": request.output_count,
                "output_format": request.output_format.as_str(),
                "reference_images": request.reference_images.len(),
                "chain": self.chain.names(),
            }),
        );
        run
    }

    fn finish(&self, run: &RunEvents, result: GenerationResult) -> GenerationResult {
        run.emit(
            "request_finished",
            json!({
                "success": result.success,
                "message": result.message,
                "files": result.generated_files,
                "model_used": result.model_used,
                "used_fallback": result.used_fallback,
                "error": result.error,
            }),
        );
        result
    }
}

fn wire_options(request: &GenerationRequest) -> WireOptions {
    WireOptions {
        resolution: Some(request.resolution),
        aspect_ratio: request.aspect_ratio,
        seed: request.seed,
    }
}

fn rejected(err: &GenerationError) -> GenerationResult {
    let (message, detail) = err.headline_and_detail();
    tracing::warn!("request rejected: {message}");
    GenerationResult::failure(message, detail)
}
