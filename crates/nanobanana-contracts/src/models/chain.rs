use super::registry::ModelRegistry;

pub const DEFAULT_PRIMARY_MODEL: &str = "gemini-2.5-flash-image";

pub const DEFAULT_FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash-image",
    "gemini-2.0-flash-exp-image-generation",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    pub supports_image_size: bool,
}

/// Ordered list of models an attempt walks through until one returns an image.
///
/// Never empty, and the first entry is always the configured primary model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    entries: Vec<ModelEntry>,
}

impl FallbackChain {
    /// `fallbacks` of `None` selects [`DEFAULT_FALLBACK_MODELS`].
    pub fn build(primary: &str, fallbacks: Option<&[String]>, registry: &ModelRegistry) -> Self {
        let models = match fallbacks {
            Some(list) => list.to_vec(),
            None => DEFAULT_FALLBACK_MODELS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        };
        let entries = promote_primary(primary, models)
            .into_iter()
            .map(|name| ModelEntry {
                supports_image_size: registry.supports_image_size(&name),
                name,
            })
            .collect();
        Self { entries }
    }

    pub fn primary(&self) -> &ModelEntry {
        &self.entries[0]
    }

    pub fn get(&self, index: usize) -> Option<&ModelEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn describe(&self) -> String {
        self.names().join(" -> ")
    }
}

/// Moves `primary` to the front of `models`.
///
/// Only the first occurrence of `primary` is moved; unrelated duplicates pass
/// through untouched.
pub fn promote_primary(primary: &str, mut models: Vec<String>) -> Vec<String> {
    match models.iter().position(|name| name == primary) {
        Some(0) => {}
        Some(idx) => {
            let promoted = models.remove(idx);
            models.insert(0, promoted);
        }
        None => models.insert(0, primary.to_string()),
    }
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    #[test]
    fn absent_primary_is_inserted_first() {
        let chain = promote_primary("p", owned(&["a", "b"]));
        assert_eq!(chain, owned(&["p", "a", "b"]));
    }

    #[test]
    fn present_primary_is_moved_without_duplication() {
        let chain = promote_primary("b", owned(&["a", "b", "c"]));
        assert_eq!(chain, owned(&["b", "a", "c"]));
    }

    #[test]
    fn primary_already_first_is_left_alone() {
        let chain = promote_primary("a", owned(&["a", "b"]));
        assert_eq!(chain, owned(&["a", "b"]));
    }

    #[test]
    fn unrelated_duplicates_pass_through() {
        let chain = promote_primary("p", owned(&["a", "a", "b"]));
        assert_eq!(chain, owned(&["p", "a", "a", "b"]));
    }

    #[test]
    fn primary_is_first_and_chain_grows_by_at_most_one() {
        let lists = [
            owned(&[]),
            owned(&["x"]),
            owned(&["x", "p"]),
            owned(&["p", "x", "p"]),
            owned(&["y", "x", "y", "z"]),
        ];
        for primary in ["p", "x", "z"] {
            for list in &lists {
                let chain = promote_primary(primary, list.clone());
                assert_eq!(chain[0], primary);
                assert!(chain.len() <= list.len() + 1);
            }
        }
    }

    #[test]
    fn build_uses_defaults_and_resolves_capabilities_once() {
        let registry = ModelRegistry::default();
        let chain = FallbackChain::build("gemini-3-pro-image-preview", None, &registry);

        assert_eq!(
            chain.names(),
            vec![
                "gemini-3-pro-image-preview",
                "gemini-2.5-flash-image",
                "gemini-2.0-flash-exp-image-generation",
            ]
        );
        assert!(chain.primary().supports_image_size);
        assert!(!chain.entries()[1].supports_image_size);
        assert_eq!(
            chain.describe(),
            "gemini-3-pro-image-preview -> gemini-2.5-flash-image -> gemini-2.0-flash-exp-image-generation"
        );
    }

    #[test]
    fn build_with_custom_list_promotes_primary() {
        let registry = ModelRegistry::default();
        let custom = owned(&["gemini-2.0-flash-exp-image-generation", "gemini-2.5-flash-image"]);
        let chain = FallbackChain::build("gemini-2.5-flash-image", Some(&custom), &registry);
        assert_eq!(chain.primary().name, "gemini-2.5-flash-image");
        assert_eq!(chain.len(), 2);
    }
}
