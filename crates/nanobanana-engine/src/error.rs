use thiserror::Error;

use nanobanana_contracts::request::{MAX_REFERENCE_IMAGES, STORY_MAX_STEPS, STORY_MIN_STEPS};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(
        "No valid API key found. Please set NANOBANANA_GEMINI_API_KEY, NANOBANANA_GOOGLE_API_KEY, \
         GEMINI_API_KEY, or GOOGLE_API_KEY environment variable."
    )]
    AuthenticationMissing,

    #[error("Reference image not found: {name}")]
    ReferenceImageNotFound { name: String, searched: Vec<String> },

    #[error("Input image not found: {name}")]
    InputImageNotFound { name: String, searched: Vec<String> },

    #[error("Input image file is required for editing")]
    MissingInputImage,

    #[error("Output count must be at least 1, but {count} was requested")]
    InvalidOutputCount { count: u32 },

    #[error(
        "Maximum {} reference images allowed, but {count} were provided",
        MAX_REFERENCE_IMAGES
    )]
    TooManyReferenceImages { count: usize },

    #[error(
        "Sequences need between {} and {} steps, but {steps} were requested",
        STORY_MIN_STEPS,
        STORY_MAX_STEPS
    )]
    InvalidStepCount { steps: u32 },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("API Error {status}: {message}")]
    NonSuccessStatus { status: u16, message: String },

    #[error("No image data in response")]
    NoImageInResponse,

    #[error("All models failed. Last error: {last}")]
    AllModelsExhausted { last: Box<GenerationError> },

    #[error("attempt worker panicked")]
    WorkerPanicked,

    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Errors that move an attempt on to the next model in the chain.
    pub fn advances_fallback(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Transport(_)
                | Self::NonSuccessStatus { .. }
                | Self::NoImageInResponse
        )
    }

    /// Errors raised before anything is dispatched.
    pub fn is_request_level(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationMissing
                | Self::ReferenceImageNotFound { .. }
                | Self::InputImageNotFound { .. }
                | Self::MissingInputImage
                | Self::InvalidOutputCount { .. }
                | Self::TooManyReferenceImages { .. }
                | Self::InvalidStepCount { .. }
        )
    }

    /// Headline/detail pair used when a request-level error becomes a result.
    pub fn headline_and_detail(&self) -> (String, String) {
        match self {
            Self::ReferenceImageNotFound { searched, .. }
            | Self::InputImageNotFound { searched, .. } => {
                (self.to_string(), format!("Searched in: {}", searched.join(", ")))
            }
            Self::TooManyReferenceImages { .. } => (
                "Too many reference images provided".to_string(),
                self.to_string(),
            ),
            Self::MissingInputImage => (self.to_string(), "Missing input_image parameter".to_string()),
            Self::InvalidOutputCount { .. } => ("Invalid output count".to_string(), self.to_string()),
            Self::InvalidStepCount { .. } => ("Invalid sequence length".to_string(), self.to_string()),
            other => ("Request rejected".to_string(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_reports_only_last_cause() {
        let err = GenerationError::AllModelsExhausted {
            last: Box::new(GenerationError::NonSuccessStatus {
                status: 503,
                message: "overloaded".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "All models failed. Last error: API Error 503: overloaded"
        );
        assert!(!err.advances_fallback());
    }

    #[test]
    fn too_many_references_names_the_count() {
        let err = GenerationError::TooManyReferenceImages { count: 15 };
        let (headline, detail) = err.headline_and_detail();
        assert_eq!(headline, "Too many reference images provided");
        assert_eq!(
            detail,
            "Maximum 14 reference images allowed, but 15 were provided"
        );
        assert!(err.is_request_level());
    }

    #[test]
    fn zero_output_count_is_request_level() {
        let err = GenerationError::InvalidOutputCount { count: 0 };
        let (headline, detail) = err.headline_and_detail();
        assert_eq!(headline, "Invalid output count");
        assert_eq!(detail, "Output count must be at least 1, but 0 was requested");
        assert!(err.is_request_level());
        assert!(!err.advances_fallback());
    }

    #[test]
    fn not_found_lists_searched_locations() {
        let err = GenerationError::ReferenceImageNotFound {
            name: "cat.png".to_string(),
            searched: vec!["/a/cat.png".to_string(), "/b/cat.png".to_string()],
        };
        let (headline, detail) = err.headline_and_detail();
        assert_eq!(headline, "Reference image not found: cat.png");
        assert_eq!(detail, "Searched in: /a/cat.png, /b/cat.png");
    }

    #[test]
    fn transport_family_advances_fallback() {
        assert!(GenerationError::Timeout("slow".to_string()).advances_fallback());
        assert!(GenerationError::Transport("reset".to_string()).advances_fallback());
        assert!(GenerationError::NoImageInResponse.advances_fallback());
        assert!(!GenerationError::MissingInputImage.advances_fallback());
    }
}
