pub mod attempt;
pub mod backend;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod events;
pub mod extract;
pub mod generator;
pub mod preview;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use backend::{ContentBackend, GeminiBackend};
pub use config::{Credential, GeneratorConfig, KeyType};
pub use error::GenerationError;
pub use generator::ImageGenerator;
