use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_REFERENCE_IMAGES: usize = 14;
pub const DEFAULT_PARALLEL: u32 = 2;
pub const MAX_PARALLEL: u32 = 8;
pub const STORY_MIN_STEPS: u32 = 2;
pub const STORY_MAX_STEPS: u32 = 8;
pub const DEFAULT_STORY_STEPS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Generate,
    Edit,
    Restore,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
            Self::Restore => "restore",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Generate => "generated",
            Self::Edit => "edited",
            Self::Restore => "restored",
        }
    }
}

/// Output container. JPEG is the lossy raster target and has no alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Png)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 10] = [
        Self::Square,
        Self::Portrait2x3,
        Self::Landscape3x2,
        Self::Portrait3x4,
        Self::Landscape4x3,
        Self::Portrait4x5,
        Self::Landscape5x4,
        Self::Portrait9x16,
        Self::Landscape16x9,
        Self::Ultrawide21x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait2x3 => "2:3",
            Self::Landscape3x2 => "3:2",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait4x5 => "4:5",
            Self::Landscape5x4 => "5:4",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
            Self::Ultrawide21x9 => "21:9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryKind {
    #[default]
    Story,
    Process,
    Tutorial,
    Timeline,
}

impl StoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Process => "process",
            Self::Tutorial => "tutorial",
            Self::Timeline => "timeline",
        }
    }
}

macro_rules! impl_text_enum {
    ($ty:ty, $label:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let normalized = raw.trim();
                [$($variant),+]
                    .into_iter()
                    .find(|candidate: &$ty| candidate.as_str().eq_ignore_ascii_case(normalized))
                    .ok_or_else(|| {
                        let allowed = [$($variant.as_str()),+].join(", ");
                        format!("unsupported {} '{normalized}' (expected one of: {allowed})", $label)
                    })
            }
        }
    };
}

impl_text_enum!(Mode, "mode", [Mode::Generate, Mode::Edit, Mode::Restore]);
impl_text_enum!(OutputFormat, "output format", [OutputFormat::Jpeg, OutputFormat::Png]);
impl_text_enum!(
    Resolution,
    "resolution",
    [Resolution::OneK, Resolution::TwoK, Resolution::FourK]
);
impl_text_enum!(
    StoryKind,
    "story type",
    [
        StoryKind::Story,
        StoryKind::Process,
        StoryKind::Tutorial,
        StoryKind::Timeline,
    ]
);

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == normalized)
            .ok_or_else(|| format!("unsupported aspect ratio '{normalized}'"))
    }
}

/// One logical image request, immutable once handed to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub input_image: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
    /// Images to fan out to; the step count in story mode. Zero is rejected.
    pub output_count: u32,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub variations: Vec<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
    pub seed: Option<i64>,
    #[serde(default)]
    pub resolution: Resolution,
    pub aspect_ratio: Option<AspectRatio>,
    pub parallel: u32,
    #[serde(default)]
    pub preview: bool,
    pub filename: Option<String>,
    #[serde(default)]
    pub filename_suffixes: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            input_image: None,
            reference_images: Vec::new(),
            output_count: 1,
            mode: Mode::Generate,
            styles: Vec::new(),
            variations: Vec::new(),
            output_format: OutputFormat::Jpeg,
            seed: None,
            resolution: Resolution::OneK,
            aspect_ratio: None,
            parallel: DEFAULT_PARALLEL,
            preview: false,
            filename: None,
            filename_suffixes: Vec::new(),
        }
    }

    pub fn concurrency_width(&self) -> usize {
        self.parallel.clamp(1, MAX_PARALLEL) as usize
    }

    pub fn has_fan_out_modifiers(&self) -> bool {
        !self.styles.is_empty() || !self.variations.is_empty()
    }

    pub fn filename_suffix(&self, index: usize) -> Option<&str> {
        self.filename_suffixes.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOptions {
    pub kind: StoryKind,
    pub style: String,
    pub transition: String,
}

impl Default for StoryOptions {
    fn default() -> Self {
        Self {
            kind: StoryKind::Story,
            style: "consistent".to_string(),
            transition: "smooth".to_string(),
        }
    }
}
