//! Prompt fan-out: turns one logical request into the ordered list of concrete
//! prompts that become generation attempts. Everything here is pure.

use crate::request::{StoryKind, StoryOptions};

/// Two fixed phrasings per variation category.
const VARIATION_CATALOG: &[(&str, [&str; 2])] = &[
    ("lighting", ["dramatic lighting", "soft lighting"]),
    ("angle", ["from above", "close-up view"]),
    ("color-palette", ["warm color palette", "cool color palette"]),
    (
        "composition",
        ["centered composition", "rule of thirds composition"],
    ),
    ("mood", ["cheerful mood", "dramatic mood"]),
    ("season", ["in spring", "in winter"]),
    ("time-of-day", ["at sunrise", "at sunset"]),
];

pub fn variation_phrasings(category: &str) -> Option<&'static [&'static str; 2]> {
    VARIATION_CATALOG
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, phrasings)| phrasings)
}

/// Expands `base` into at most `output_count` prompts.
///
/// Variation output replaces style output rather than multiplying with it a
/// second time; unknown categories expand to nothing.
pub fn expand_prompts(
    base: &str,
    styles: &[String],
    variations: &[String],
    output_count: u32,
) -> Vec<String> {
    let mut prompts: Vec<String> = styles
        .iter()
        .map(|style| format!("{base}, {style} style"))
        .collect();

    if !variations.is_empty() {
        let bases = if prompts.is_empty() {
            vec![base.to_string()]
        } else {
            prompts.clone()
        };
        let mut varied = Vec::new();
        for base_prompt in &bases {
            for category in variations {
                if let Some(phrasings) = variation_phrasings(category) {
                    for phrasing in phrasings {
                        varied.push(format!("{base_prompt}, {phrasing}"));
                    }
                }
            }
        }
        if !varied.is_empty() {
            prompts = varied;
        }
    }

    if prompts.is_empty() && output_count > 1 {
        prompts = vec![base.to_string(); output_count as usize];
    }

    let limit = output_count.max(1) as usize;
    prompts.truncate(limit);

    if prompts.is_empty() {
        prompts.push(base.to_string());
    }
    prompts
}

fn story_context(kind: StoryKind, style: &str) -> String {
    match kind {
        StoryKind::Story => format!(", narrative sequence, {style} art style"),
        StoryKind::Process => ", procedural step, instructional illustration".to_string(),
        StoryKind::Tutorial => ", tutorial step, educational diagram".to_string(),
        StoryKind::Timeline => ", chronological progression, timeline visualization".to_string(),
    }
}

/// One prompt per step, in step order.
pub fn story_step_prompts(prompt: &str, steps: u32, options: &StoryOptions) -> Vec<String> {
    let context = story_context(options.kind, &options.style);
    (0..steps)
        .map(|step_index| {
            let mut step_prompt = format!("{prompt}, step {} of {steps}{context}", step_index + 1);
            if step_index > 0 {
                step_prompt.push_str(&format!(
                    ", {} transition from previous step",
                    options.transition
                ));
            }
            step_prompt
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternOptions {
    pub size: String,
    pub kind: String,
    pub style: String,
    pub density: String,
    pub colors: String,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            size: "256x256".to_string(),
            kind: "seamless".to_string(),
            style: "abstract".to_string(),
            density: "medium".to_string(),
            colors: "colorful".to_string(),
        }
    }
}

pub fn pattern_prompt(prompt: &str, options: &PatternOptions) -> String {
    let mut out = format!(
        "{prompt}, {} style {} pattern, {} density, {} colors",
        options.style, options.kind, options.density, options.colors
    );
    if options.kind == "seamless" {
        out.push_str(", tileable, repeating pattern");
    }
    out.push_str(&format!(", {} tile size, high quality", options.size));
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramOptions {
    pub kind: String,
    pub style: String,
    pub layout: String,
    pub complexity: String,
    pub colors: String,
    pub annotations: String,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            kind: "flowchart".to_string(),
            style: "professional".to_string(),
            layout: "hierarchical".to_string(),
            complexity: "detailed".to_string(),
            colors: "accent".to_string(),
            annotations: "detailed".to_string(),
        }
    }
}

pub fn diagram_prompt(prompt: &str, options: &DiagramOptions) -> String {
    format!(
        "{prompt}, {} diagram, {} style, {} layout, {} level of detail, {} color scheme, \
         {} annotations and labels, clean technical illustration, clear visual hierarchy",
        options.kind,
        options.style,
        options.layout,
        options.complexity,
        options.colors,
        options.annotations
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    #[test]
    fn styles_expand_in_order_with_suffix() {
        let styles = owned(&["watercolor", "sketch", "anime"]);
        let prompts = expand_prompts("mountain landscape", &styles, &[], 3);
        assert_eq!(
            prompts,
            owned(&[
                "mountain landscape, watercolor style",
                "mountain landscape, sketch style",
                "mountain landscape, anime style",
            ])
        );
    }

    #[test]
    fn styles_are_truncated_to_output_count() {
        let styles = owned(&["watercolor", "sketch"]);
        let prompts = expand_prompts("cat", &styles, &[], 1);
        assert_eq!(prompts, owned(&["cat, watercolor style"]));
    }

    #[test]
    fn plain_count_repeats_base_prompt() {
        let prompts = expand_prompts("a cute cat", &[], &[], 3);
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|prompt| prompt == "a cute cat"));
    }

    #[test]
    fn single_output_without_modifiers_is_base_prompt() {
        assert_eq!(expand_prompts("cat", &[], &[], 1), owned(&["cat"]));
        assert_eq!(expand_prompts("cat", &[], &[], 0), owned(&["cat"]));
    }

    #[test]
    fn variations_use_catalog_phrasings() {
        let variations = owned(&["lighting", "season"]);
        let prompts = expand_prompts("cabin", &[], &variations, 8);
        assert_eq!(
            prompts,
            owned(&[
                "cabin, dramatic lighting",
                "cabin, soft lighting",
                "cabin, in spring",
                "cabin, in winter",
            ])
        );
    }

    #[test]
    fn variations_replace_style_prompts_instead_of_appending() {
        let styles = owned(&["watercolor", "sketch"]);
        let variations = owned(&["mood"]);
        let prompts = expand_prompts("fox", &styles, &variations, 8);
        assert_eq!(
            prompts,
            owned(&[
                "fox, watercolor style, cheerful mood",
                "fox, watercolor style, dramatic mood",
                "fox, sketch style, cheerful mood",
                "fox, sketch style, dramatic mood",
            ])
        );
    }

    #[test]
    fn unknown_variations_leave_styles_in_place() {
        let styles = owned(&["sketch"]);
        let variations = owned(&["texture"]);
        let prompts = expand_prompts("fox", &styles, &variations, 4);
        assert_eq!(prompts, owned(&["fox, sketch style"]));
    }

    #[test]
    fn unknown_variations_alone_fall_back_to_repetition() {
        let variations = owned(&["texture"]);
        let prompts = expand_prompts("fox", &[], &variations, 2);
        assert_eq!(prompts, owned(&["fox", "fox"]));
    }

    #[test]
    fn expansion_is_deterministic() {
        let styles = owned(&["pixel-art", "vintage"]);
        let variations = owned(&["angle", "time-of-day"]);
        let first = expand_prompts("city", &styles, &variations, 6);
        let second = expand_prompts("city", &styles, &variations, 6);
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
        assert_eq!(first[0], "city, pixel-art style, from above");
    }

    #[test]
    fn catalog_lists_every_category() {
        let categories = [
            "lighting",
            "angle",
            "color-palette",
            "composition",
            "mood",
            "season",
            "time-of-day",
        ];
        assert!(categories
            .iter()
            .all(|category| variation_phrasings(category).is_some()));
        assert_eq!(
            variation_phrasings("color-palette"),
            Some(&["warm color palette", "cool color palette"])
        );
        assert_eq!(variation_phrasings("unknown"), None);
    }

    #[test]
    fn story_steps_carry_context_and_transitions() {
        let prompts = story_step_prompts("a seed grows", 3, &StoryOptions::default());
        assert_eq!(
            prompts,
            owned(&[
                "a seed grows, step 1 of 3, narrative sequence, consistent art style",
                "a seed grows, step 2 of 3, narrative sequence, consistent art style, smooth transition from previous step",
                "a seed grows, step 3 of 3, narrative sequence, consistent art style, smooth transition from previous step",
            ])
        );
    }

    #[test]
    fn process_steps_use_instructional_context() {
        let options = StoryOptions {
            kind: StoryKind::Process,
            style: "evolving".to_string(),
            transition: "fade".to_string(),
        };
        let prompts = story_step_prompts("brew coffee", 2, &options);
        assert_eq!(
            prompts[1],
            "brew coffee, step 2 of 2, procedural step, instructional illustration, fade transition from previous step"
        );
    }

    #[test]
    fn pattern_prompt_marks_seamless_tiles() {
        let prompt = pattern_prompt("leaves", &PatternOptions::default());
        assert_eq!(
            prompt,
            "leaves, abstract style seamless pattern, medium density, colorful colors, tileable, repeating pattern, 256x256 tile size, high quality"
        );

        let texture = PatternOptions {
            kind: "texture".to_string(),
            ..PatternOptions::default()
        };
        assert!(!pattern_prompt("stone", &texture).contains("tileable"));
    }

    #[test]
    fn diagram_prompt_lists_every_option() {
        let prompt = diagram_prompt("login flow", &DiagramOptions::default());
        assert!(prompt.starts_with("login flow, flowchart diagram, professional style"));
        assert!(prompt.ends_with("clear visual hierarchy"));
        assert!(prompt.contains("detailed annotations and labels"));
    }
}
