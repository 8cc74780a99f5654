mod chain;
mod registry;

pub use chain::{
    promote_primary, FallbackChain, ModelEntry, DEFAULT_FALLBACK_MODELS, DEFAULT_PRIMARY_MODEL,
};
pub use registry::{ModelRegistry, ModelSpec, CAPABILITY_IMAGE, CAPABILITY_IMAGE_SIZE};
