use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Local;
use sha2::{Digest, Sha256};

use nanobanana_contracts::request::OutputFormat;

use crate::backend::InlineImage;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;

const MAX_PROMPT_STEM_CHARS: usize = 50;
const CUSTOM_NAME_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLookup {
    pub found: bool,
    pub path: Option<PathBuf>,
    pub searched: Vec<String>,
}

/// Output directory plus the places relative input names are looked up in.
#[derive(Debug, Clone)]
pub struct Workspace {
    output_dir: PathBuf,
    search_dirs: Vec<PathBuf>,
}

impl Workspace {
    /// Relative inputs are searched in the working directory, the output
    /// directory and the home directory, in that order.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let mut search_dirs = Vec::new();
        if let Ok(cwd) = env::current_dir() {
            search_dirs.push(cwd);
        }
        search_dirs.push(output_dir.clone());
        if let Some(home) = home_dir() {
            search_dirs.push(home);
        }
        Self {
            output_dir,
            search_dirs,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    pub fn with_search_dirs(output_dir: impl Into<PathBuf>, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            search_dirs,
        }
    }

    pub fn ensure_output_dir(&self) -> Result<(), GenerationError> {
        fs::create_dir_all(&self.output_dir).map_err(|err| {
            GenerationError::io(
                format!("failed creating {}", self.output_dir.display()),
                err,
            )
        })
    }

    pub fn resolve_input_file(&self, name: &str) -> InputLookup {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            let found = candidate.exists();
            return InputLookup {
                found,
                path: found.then(|| candidate.to_path_buf()),
                searched: vec![name.to_string()],
            };
        }

        let mut searched = Vec::with_capacity(self.search_dirs.len());
        for dir in &self.search_dirs {
            let path = dir.join(candidate);
            searched.push(path.display().to_string());
            if path.exists() {
                return InputLookup {
                    found: true,
                    path: Some(path),
                    searched,
                };
            }
        }
        InputLookup {
            found: false,
            path: None,
            searched,
        }
    }

    pub fn persist_bytes(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, GenerationError> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(filename);
        fs::write(&path, bytes)
            .map_err(|err| GenerationError::io(format!("failed writing {}", path.display()), err))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "saved image");
        Ok(path)
    }
}

pub fn read_file_as_base64(path: &Path) -> Result<String, GenerationError> {
    let bytes = fs::read(path)
        .map_err(|err| GenerationError::io(format!("failed reading {}", path.display()), err))?;
    Ok(BASE64.encode(bytes))
}

pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

pub fn load_inline_image(path: &Path) -> Result<InlineImage, GenerationError> {
    Ok(InlineImage {
        mime_type: mime_type_for_path(path).to_string(),
        data: read_file_as_base64(path)?,
    })
}

/// Builds the output file name for attempt `index`.
///
/// A custom name wins over the prompt-derived stem. Custom names only gain a
/// counter when `force_suffix` is set or `index > 0`; an explicit `suffix`
/// replaces the counter.
pub fn synthesize_filename(
    prompt: &str,
    format: OutputFormat,
    index: usize,
    custom: Option<&str>,
    force_suffix: bool,
    suffix: Option<&str>,
) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    filename_at(prompt, format, index, custom, force_suffix, suffix, &timestamp)
}

fn filename_at(
    prompt: &str,
    format: OutputFormat,
    index: usize,
    custom: Option<&str>,
    force_suffix: bool,
    suffix: Option<&str>,
    timestamp: &str,
) -> String {
    let ext = format.extension();

    if let Some(custom) = custom.filter(|name| !name.is_empty()) {
        let base = strip_image_extension(custom);
        return match suffix.filter(|value| !value.is_empty()) {
            Some(suffix) => format!("{base}_{suffix}.{ext}"),
            None if force_suffix || index > 0 => format!("{base}_{}.{ext}", index + 1),
            None => format!("{base}.{ext}"),
        };
    }

    let stem = sanitize_prompt(prompt);
    let hash = prompt_hash(prompt);
    if index > 0 {
        format!("{stem}_{timestamp}_{hash}_{}.{ext}", index + 1)
    } else {
        format!("{stem}_{timestamp}_{hash}.{ext}")
    }
}

fn strip_image_extension(name: &str) -> &str {
    let lowered = name.to_ascii_lowercase();
    for ext in CUSTOM_NAME_EXTENSIONS {
        if lowered.ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// Keeps word characters, collapses whitespace runs to `_`, caps the length.
fn sanitize_prompt(prompt: &str) -> String {
    let kept: String = prompt
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_' || ch.is_whitespace())
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_PROMPT_STEM_CHARS)
        .collect()
}

fn prompt_hash(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    hex::encode(&digest[..3])
}

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(|key| env::var_os(key))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}
