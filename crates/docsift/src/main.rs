//! # docsift CLI
//!
//! Command-line interface for docsift.
//!
//! docsift turns documents (PDF, Office files, e-books, images, markup and
//! plain text) into normalized UTF-8 text, using OCR for images and scanned
//! PDF pages.
//!
//! ## Commands
//!
//! - `docsift extract <FILES>...` - Extract text from files (`-` reads stdin)
//! - `docsift detect <FILES>...` - Show the detected MIME type and format
//! - `docsift formats` - List supported formats
//! - `docsift config show|init|path` - Manage configuration
//!
//! ## Examples
//!
//! ```bash
//! # Extract a scanned PDF
//! docsift extract scan.pdf
//!
//! # Pipe an upload through, using its name for the extension hint
//! curl -s https://example.com/notes | docsift extract - --name notes.md
//!
//! # Get JSON output
//! docsift --format json extract report.docx slides.pptx
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsift_core::{DocumentFormat, ErrorKind, ExtractError, ExtractionResult, SourceDocument};
use docsift_extract::{detect_bytes, ExtractionPool, ExtractorRegistry, StagedDocument};
use futures::future::join_all;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "Extract plain text from documents, spreadsheets, slides and images")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/docsift/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from one or more files
    Extract {
        /// Files to extract; `-` reads from stdin
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Filename hint for stdin input (its extension guides detection)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Detect the MIME type and format of files
    Detect {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List supported formats
    Formats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for one extracted file.
#[derive(Serialize)]
struct ExtractOutput {
    file: String,
    #[serde(flatten)]
    result: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
}

#[derive(Serialize)]
struct ErrorOutput {
    kind: &'static str,
    message: String,
}

/// Output structure for detection.
#[derive(Serialize)]
struct DetectOutput {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<DocumentFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Output structure for the format listing.
#[derive(Serialize)]
struct FormatOutput {
    format: DocumentFormat,
    name: &'static str,
    family: String,
    mime_type: &'static str,
    extensions: &'static [&'static str],
}

/// Why a single input failed.
enum Failure {
    /// The input was never handed to the extractor.
    Input(anyhow::Error),
    Extract(ExtractError),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Extract(e) => match e.kind() {
                ErrorKind::Unsupported => 2,
                ErrorKind::Parsing => 3,
                ErrorKind::Internal => 1,
            },
            Self::Input(_) => 1,
        }
    }

    fn to_output(&self) -> ErrorOutput {
        match self {
            Self::Extract(e) => ErrorOutput {
                kind: e.kind().as_str(),
                message: e.to_string(),
            },
            Self::Input(e) => ErrorOutput {
                kind: ErrorKind::Internal.as_str(),
                message: format!("{e:#}"),
            },
        }
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read a file, rejecting it before it is loaded if it is over the limit.
fn read_limited(path: &Path, max_size: u64) -> Result<Vec<u8>> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    if metadata.len() > max_size {
        anyhow::bail!(
            "{} is {} bytes, over the {} byte limit",
            path.display(),
            metadata.len(),
            max_size
        );
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_stdin(max_size: u64) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    std::io::stdin()
        .take(max_size.saturating_add(1))
        .read_to_end(&mut bytes)
        .context("Failed to read stdin")?;
    if bytes.len() as u64 > max_size {
        anyhow::bail!("stdin is over the {max_size} byte limit");
    }
    Ok(bytes)
}

/// Extract one input through the pool.
async fn extract_one(
    pool: &ExtractionPool,
    path: &Path,
    name: Option<&str>,
    max_size: u64,
) -> Result<ExtractionResult, Failure> {
    if is_stdin(path) {
        let bytes = read_stdin(max_size).map_err(Failure::Input)?;
        let staged = StagedDocument::stage(&bytes, name).map_err(Failure::Extract)?;
        debug!("stdin staged at {}", staged.path().display());
        return pool.extract_path(staged.path()).await.map_err(Failure::Extract);
    }

    let bytes = read_limited(path, max_size).map_err(Failure::Input)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string);
    let document = SourceDocument::new(bytes, filename);
    pool.extract_document(&document)
        .await
        .map_err(Failure::Extract)
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Extract { files, name } => {
            if files.iter().filter(|f| is_stdin(f)).count() > 1 {
                anyhow::bail!("stdin ('-') can only be given once");
            }

            let registry = Arc::new(ExtractorRegistry::new(&config.to_extractor_config()));
            let mut pool = ExtractionPool::new(registry, config.limits.max_concurrent);
            if let Some(timeout) = config.limits.timeout() {
                pool = pool.with_timeout(timeout);
            }
            info!(
                "Extracting {} file(s), up to {} at a time",
                files.len(),
                pool.max_concurrent()
            );

            let max_size = config.limits.max_file_size;
            let outcomes = join_all(
                files
                    .iter()
                    .map(|file| extract_one(&pool, file, name.as_deref(), max_size)),
            )
            .await;

            let mut exit_code = 0;
            let mut outputs = Vec::with_capacity(files.len());
            for (file, outcome) in files.iter().zip(outcomes) {
                let label = file.display().to_string();
                match outcome {
                    Ok(result) => outputs.push(ExtractOutput {
                        file: label,
                        result: Some(result),
                        error: None,
                    }),
                    Err(failure) => {
                        let error = failure.to_output();
                        warn!("{}: {}", label, error.message);
                        if exit_code == 0 {
                            exit_code = failure.exit_code();
                        }
                        outputs.push(ExtractOutput {
                            file: label,
                            result: None,
                            error: Some(error),
                        });
                    }
                }
            }

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&outputs)
                            .context("Failed to serialize results")?
                    );
                }
                OutputFormat::Text => {
                    let show_headers = outputs.len() > 1;
                    for output in &outputs {
                        if show_headers {
                            println!("==> {} <==", output.file);
                        }
                        if let Some(result) = &output.result {
                            println!("{}", result.text);
                        }
                        if let Some(error) = &output.error {
                            eprintln!("{}: {} ({})", output.file, error.message, error.kind);
                        }
                    }
                }
            }

            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }

        Commands::Detect { files } => {
            let registry = ExtractorRegistry::new(&config.to_extractor_config());
            let mut outputs = Vec::with_capacity(files.len());

            for file in &files {
                let label = file.display().to_string();
                let bytes = match read_limited(file, config.limits.max_file_size) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        outputs.push(DetectOutput {
                            file: label,
                            mime_type: None,
                            format: None,
                            error: Some(format!("{e:#}")),
                        });
                        continue;
                    }
                };
                let filename = file.file_name().and_then(|n| n.to_str());
                let document = SourceDocument::new(bytes, filename.map(ToString::to_string));

                let output = match detect_bytes(document.bytes(), document.filename()) {
                    Ok(mime) => {
                        let format = registry.resolve_format(&mime, &document);
                        DetectOutput {
                            file: label,
                            error: format.as_ref().err().map(ToString::to_string),
                            format: format.ok(),
                            mime_type: Some(mime),
                        }
                    }
                    Err(e) => DetectOutput {
                        file: label,
                        mime_type: None,
                        format: None,
                        error: Some(e.to_string()),
                    },
                };
                outputs.push(output);
            }

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&outputs)
                            .context("Failed to serialize detection results")?
                    );
                }
                OutputFormat::Text => {
                    for output in &outputs {
                        let mime = output.mime_type.as_deref().unwrap_or("-");
                        match (&output.format, &output.error) {
                            (Some(format), _) => println!("{}: {} ({})", output.file, mime, format),
                            (None, Some(error)) => println!("{}: {} [{}]", output.file, mime, error),
                            (None, None) => println!("{}: {}", output.file, mime),
                        }
                    }
                }
            }
        }

        Commands::Formats => {
            let formats: Vec<FormatOutput> = DocumentFormat::ALL
                .iter()
                .map(|&format| FormatOutput {
                    format,
                    name: format.name(),
                    family: format!("{:?}", format.family()).to_lowercase(),
                    mime_type: format.mime_type(),
                    extensions: format.extensions(),
                })
                .collect();

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&formats)
                            .context("Failed to serialize formats")?
                    );
                }
                OutputFormat::Text => {
                    for f in &formats {
                        println!(
                            "{:<10} {:<14} {:<75} .{}",
                            f.name,
                            f.family,
                            f.mime_type,
                            f.extensions.join(", .")
                        );
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                print!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}
