use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use nanobanana_contracts::events::EventWriter;
use nanobanana_contracts::prompts::{diagram_prompt, pattern_prompt, DiagramOptions, PatternOptions};
use nanobanana_contracts::request::{
    AspectRatio, GenerationRequest, Mode, OutputFormat, Resolution, StoryKind, StoryOptions,
    DEFAULT_PARALLEL, DEFAULT_STORY_STEPS,
};
use nanobanana_contracts::result::GenerationResult;
use nanobanana_engine::{Credential, GeneratorConfig, ImageGenerator};

const DEBUG_ENV: &str = "NANOBANANA_DEBUG";

#[derive(Debug, Parser)]
#[command(name = "nanobanana-rs", version, about = "Gemini image generation with model fallback")]
struct Cli {
    /// Append structured run events to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(GenerateArgs),
    Edit(EditArgs),
    Restore(EditArgs),
    Story(StoryArgs),
    Pattern(PatternArgs),
    Diagram(DiagramArgs),
}

#[derive(Debug, Args)]
struct OutputArgs {
    #[arg(long)]
    filename: Option<String>,
    #[arg(long = "format", default_value = "jpeg", value_parser = str::parse::<OutputFormat>)]
    output_format: OutputFormat,
    #[arg(long, default_value = "1K", value_parser = str::parse::<Resolution>)]
    resolution: Resolution,
    #[arg(long, value_parser = str::parse::<AspectRatio>)]
    aspect_ratio: Option<AspectRatio>,
    #[arg(long)]
    seed: Option<i64>,
    /// Reference image, repeatable (at most 14).
    #[arg(long = "reference")]
    references: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_PARALLEL)]
    parallel: u32,
    #[arg(long)]
    preview: bool,
}

impl OutputArgs {
    fn request(self, prompt: String, mode: Mode) -> GenerationRequest {
        let mut request = GenerationRequest::new(prompt);
        request.mode = mode;
        request.filename = self.filename;
        request.output_format = self.output_format;
        request.resolution = self.resolution;
        request.aspect_ratio = self.aspect_ratio;
        request.seed = self.seed;
        request.reference_images = self.references;
        request.parallel = self.parallel;
        request.preview = self.preview;
        request
    }
}

#[derive(Debug, Args)]
struct GenerateArgs {
    prompt: String,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=8))]
    count: u32,
    #[arg(long = "style")]
    styles: Vec<String>,
    #[arg(long = "variation")]
    variations: Vec<String>,
    #[arg(long = "filename-suffix")]
    filename_suffixes: Vec<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct EditArgs {
    prompt: String,
    #[arg(long)]
    input: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct StoryArgs {
    prompt: String,
    #[arg(long, default_value_t = DEFAULT_STORY_STEPS)]
    steps: u32,
    #[arg(long = "type", default_value = "story", value_parser = str::parse::<StoryKind>)]
    kind: StoryKind,
    #[arg(long = "art-style", default_value = "consistent")]
    style: String,
    #[arg(long, default_value = "smooth")]
    transition: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct PatternArgs {
    prompt: String,
    #[arg(long, default_value = "256x256")]
    size: String,
    #[arg(long = "type", default_value = "seamless")]
    kind: String,
    #[arg(long = "pattern-style", default_value = "abstract")]
    style: String,
    #[arg(long, default_value = "medium")]
    density: String,
    #[arg(long, default_value = "colorful")]
    colors: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct DiagramArgs {
    prompt: String,
    #[arg(long = "type", default_value = "flowchart")]
    kind: String,
    #[arg(long = "diagram-style", default_value = "professional")]
    style: String,
    #[arg(long, default_value = "hierarchical")]
    layout: String,
    #[arg(long, default_value = "detailed")]
    complexity: String,
    #[arg(long, default_value = "accent")]
    colors: String,
    #[arg(long, default_value = "detailed")]
    annotations: String,
    #[command(flatten)]
    output: OutputArgs,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("nanobanana-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let level = if env::var_os(DEBUG_ENV).is_some() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let tool = tool_name(&cli.command);

    let config = GeneratorConfig::from_env();
    let credential = match Credential::from_env() {
        Ok(credential) => credential,
        Err(err) => {
            let result = GenerationResult::failure("Authentication failed", err.to_string());
            return print_result(tool, &result);
        }
    };
    tracing::debug!(source = credential.source(), model = %config.primary_model, "starting");

    let mut generator = ImageGenerator::new(&config, credential);
    if let Some(path) = cli.events {
        generator = generator.with_events(EventWriter::new(path, Uuid::new_v4().to_string()));
    }

    let result = match cli.command {
        Command::Generate(args) => {
            let mut request = args.output.request(args.prompt, Mode::Generate);
            request.output_count = args.count;
            request.styles = args.styles;
            request.variations = args.variations;
            request.filename_suffixes = args.filename_suffixes;
            generator.generate(&request)
        }
        Command::Edit(args) => generator.edit(&edit_request(args, Mode::Edit)),
        Command::Restore(args) => generator.edit(&edit_request(args, Mode::Restore)),
        Command::Story(args) => {
            let mut request = args.output.request(args.prompt, Mode::Generate);
            request.output_count = args.steps;
            let story = StoryOptions {
                kind: args.kind,
                style: args.style,
                transition: args.transition,
            };
            generator.generate_story(&request, &story)
        }
        Command::Pattern(args) => {
            let options = PatternOptions {
                size: args.size,
                kind: args.kind,
                style: args.style,
                density: args.density,
                colors: args.colors,
            };
            let prompt = pattern_prompt(&args.prompt, &options);
            generator.generate(&args.output.request(prompt, Mode::Generate))
        }
        Command::Diagram(args) => {
            let options = DiagramOptions {
                kind: args.kind,
                style: args.style,
                layout: args.layout,
                complexity: args.complexity,
                colors: args.colors,
                annotations: args.annotations,
            };
            let prompt = diagram_prompt(&args.prompt, &options);
            generator.generate(&args.output.request(prompt, Mode::Generate))
        }
    };

    print_result(tool, &result)
}

fn edit_request(args: EditArgs, mode: Mode) -> GenerationRequest {
    let mut request = args.output.request(args.prompt, mode);
    request.input_image = args.input;
    request
}

fn tool_name(command: &Command) -> &'static str {
    match command {
        Command::Generate(_) => "generate_image",
        Command::Edit(_) => "edit_image",
        Command::Restore(_) => "restore_image",
        Command::Story(_) => "generate_story",
        Command::Pattern(_) => "generate_pattern",
        Command::Diagram(_) => "generate_diagram",
    }
}

fn print_result(tool: &str, result: &GenerationResult) -> Result<i32> {
    let mut value = serde_json::to_value(result).context("failed to serialize result")?;
    if let Value::Object(map) = &mut value {
        map.insert("tool".to_string(), Value::String(tool.to_string()));
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(if result.success { 0 } else { 1 })
}
