use indexmap::IndexMap;

pub const CAPABILITY_IMAGE: &str = "image";
pub const CAPABILITY_IMAGE_SIZE: &str = "image_size";

/// Model families that accept the `imageSize` resolution option even when the
/// exact identifier is not registered.
const IMAGE_SIZE_FAMILIES: &[&str] = &["gemini-3"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    /// Whether requests to `name` may carry a resolution tier.
    ///
    /// Registered models answer from their capabilities; anything else is
    /// judged by its family prefix.
    pub fn supports_image_size(&self, name: &str) -> bool {
        let trimmed = name.trim();
        if let Some(spec) = self.get(trimmed) {
            return spec.supports(CAPABILITY_IMAGE_SIZE);
        }
        let bare = trimmed.strip_prefix("models/").unwrap_or(trimmed);
        IMAGE_SIZE_FAMILIES
            .iter()
            .any(|family| bare.starts_with(family))
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, capabilities: &[&str]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
            },
        );
    };

    insert("gemini-2.5-flash-image", &[CAPABILITY_IMAGE]);
    insert("gemini-2.5-flash-image-preview", &[CAPABILITY_IMAGE]);
    insert("gemini-2.0-flash-exp-image-generation", &[CAPABILITY_IMAGE]);
    insert(
        "gemini-3-pro-image-preview",
        &[CAPABILITY_IMAGE, CAPABILITY_IMAGE_SIZE],
    );

    map
}
