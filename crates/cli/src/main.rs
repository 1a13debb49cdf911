//! CLI tool for turning free-form text into PowerPoint decks.

mod cleanup;
mod pipeline;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cleanup::{sweep, CleanupPolicy};
use pipeline::{GenerationRequest, Pipeline};
use slidegen_core::AppConfig;
use slidegen_llm::OpenAiClient;
use slidegen_pptx::PptxParser;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Environment variable read when `--api-key` is not given.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Split text into slides with an LLM and write them to a PowerPoint file.
#[derive(Parser, Debug)]
#[command(name = "slidegen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a presentation from text
    Generate(GenerateArgs),

    /// Delete uploaded and generated files older than the configured age
    Cleanup,

    /// Print the slides of a presentation
    Inspect {
        /// Presentation file (.pptx)
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Text to turn into slides
    #[arg(short, long, conflicts_with = "input", required_unless_present = "input")]
    text: Option<String>,

    /// Read the text from a file ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Style guidance for the model, e.g. "one idea per slide"
    #[arg(short, long)]
    guidance: Option<String>,

    /// API key for the chat-completion service (default: $OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Template whose theme and layouts are reused (.pptx or .potx)
    #[arg(short = 'T', long)]
    template: Option<PathBuf>,

    /// Output directory (default: from config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Chat model (default: from config)
    #[arg(short, long)]
    model: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(args) => generate(config, args),
        Command::Cleanup => {
            let report = sweep(&CleanupPolicy::from_config(&config), SystemTime::now());
            println!(
                "Removed {} of {} file(s){}",
                report.removed,
                report.scanned,
                if report.failed > 0 {
                    format!(", {} failure(s)", report.failed)
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Command::Inspect { file } => inspect(&file),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn generate(mut config: AppConfig, args: GenerateArgs) -> Result<()> {
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    let text = match (args.text, args.input) {
        (Some(text), _) => text,
        (None, Some(path)) => read_input(&path)?,
        (None, None) => bail!("either --text or --input is required"),
    };

    let mut request = GenerationRequest::new(text);
    if let Some(guidance) = args.guidance {
        request = request.with_guidance(guidance);
    }
    if let Some(api_key) = args.api_key.or_else(|| std::env::var(API_KEY_ENV).ok()) {
        request = request.with_api_key(api_key);
    }
    if let Some(template) = args.template {
        request = request.with_template(template);
    }

    let client = OpenAiClient::new(config.llm.clone());
    let pipeline = Pipeline::new(config, client);
    log::debug!(
        "using model {}, writing to {}",
        pipeline.config().llm.model,
        pipeline.config().output_dir.display()
    );

    let result = pipeline.run(&request);

    // Sweep after the request, whatever its outcome; its template stays.
    let mut policy = CleanupPolicy::from_config(pipeline.config());
    if let Some(template) = request.template.path() {
        policy = policy.keeping(template);
    }
    sweep(&policy, SystemTime::now());

    let output = result.context("Failed to generate presentation")?;
    println!("{}", output.display());
    Ok(())
}

/// Read the input text from a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    let mut text = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
    } else {
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut text))
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    Ok(text)
}

fn inspect(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let slides = PptxParser::new()
        .parse(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    for (i, slide) in slides.iter().enumerate() {
        println!("Slide {}: {}", i + 1, slide.title);
        for bullet in &slide.bullets {
            println!("  - {}", bullet);
        }
        if let Some(notes) = &slide.notes {
            println!("  Notes: {}", notes.replace('\n', "\n         "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidegen_core::{SlideRecord, TemplateSource};
    use std::net::TcpListener;
    use std::time::Duration;

    fn backdate(path: &Path, age: Duration) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    fn refused_endpoint() -> String {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        format!("http://127.0.0.1:{}/v1/chat/completions", port)
    }

    #[test]
    fn test_generate_keeps_old_template() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();

        let template = uploads.join("theme.pptx");
        slidegen_pptx::generate(&TemplateSource::None, &[SlideRecord::new("Theme")], &template)
            .unwrap();
        let stale = uploads.join("stale.pptx");
        std::fs::write(&stale, b"x").unwrap();
        backdate(&template, Duration::from_secs(2 * 3600));
        backdate(&stale, Duration::from_secs(2 * 3600));

        let mut config = AppConfig {
            upload_dir: uploads.clone(),
            output_dir: dir.path().join("generated"),
            ..AppConfig::default()
        };
        config.llm.endpoint = refused_endpoint();

        let args = GenerateArgs {
            text: Some("Some text".to_string()),
            input: None,
            guidance: None,
            api_key: Some("sk-test".to_string()),
            template: Some(template.clone()),
            output_dir: None,
            model: None,
        };

        assert!(generate(config, args).is_err());
        assert!(template.exists());
        assert!(!stale.exists());
    }
}
