//! CLI binary for edgequake-pdf2speech.
//!
//! A thin shim over the library crate: each subcommand maps flags to a
//! `ReaderConfig`, runs one or two `Reader` operations and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdf2speech::{
    ConvertRequest, ErrorResponse, Reader, ReaderConfig, ReaderError, Session, SummaryNormalizer,
    UploadResponse,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # How many pages?
  pdf2speech pages report.pdf

  # Read page 3 aloud (prints the MP3 path)
  pdf2speech speak report.pdf --page 3

  # Summarise page 3 and speak the summary too
  pdf2speech summarize report.pdf --page 3 --speak

  # Clean up a summary produced elsewhere
  echo "In summary, the text covers cats!!" | pdf2speech clean

  # Remove uploads and generated audio
  pdf2speech cleanup

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (summaries and speech)
  ANTHROPIC_API_KEY       Anthropic API key (summaries)
  GEMINI_API_KEY          Google Gemini API key (summaries)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

/// Read PDF pages aloud and summarise them with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2speech",
    version,
    about = "Read PDF pages aloud and summarise them with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for uploaded PDFs.
    #[arg(long, global = true, env = "PDF2SPEECH_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory for generated MP3 files.
    #[arg(long, global = true, env = "PDF2SPEECH_AUDIO_DIR", default_value = "audio")]
    audio_dir: PathBuf,

    /// LLM provider for summaries: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "PDF2SPEECH_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID for summaries (default: gpt-4.1-nano).
    #[arg(long, global = true, env = "PDF2SPEECH_MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible speech API.
    #[arg(long, global = true, env = "PDF2SPEECH_SPEECH_URL")]
    speech_url: Option<String>,

    /// Speech model ID.
    #[arg(long, global = true, env = "PDF2SPEECH_SPEECH_MODEL")]
    speech_model: Option<String>,

    /// Speech voice.
    #[arg(long, global = true, env = "PDF2SPEECH_VOICE")]
    voice: Option<String>,

    /// Retries per API call.
    #[arg(long, global = true, env = "PDF2SPEECH_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call API timeout in seconds.
    #[arg(long, global = true, env = "PDF2SPEECH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Output structured JSON instead of text.
    #[arg(long, global = true, env = "PDF2SPEECH_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2SPEECH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "PDF2SPEECH_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a PDF and print its page count.
    Pages {
        /// Local PDF file.
        pdf: PathBuf,
    },
    /// Convert one page to speech and print the audio path.
    Speak {
        pdf: PathBuf,
        /// 1-indexed page number.
        #[arg(short, long)]
        page: usize,
    },
    /// Summarise one page and print the cleaned summary.
    Summarize {
        pdf: PathBuf,
        /// 1-indexed page number.
        #[arg(short, long)]
        page: usize,
        /// Also convert the summary to speech.
        #[arg(long)]
        speak: bool,
    },
    /// Clean up summary text (argument or stdin) without calling any API.
    Clean {
        text: Option<String>,
    },
    /// Delete every uploaded PDF and all generated audio.
    Cleanup,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback in normal mode; library INFO logs
    // would only interleave with it.
    let show_spinner = !cli.quiet && !cli.json && io::stderr().is_terminal();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&cli, show_spinner && !cli.verbose).await {
        if cli.json {
            let body = match err.downcast_ref::<ReaderError>() {
                Some(e) => ErrorResponse::from(e),
                None => ErrorResponse {
                    error: format!("{err:#}"),
                },
            };
            if let Ok(json) = serde_json::to_string_pretty(&body) {
                println!("{json}");
            }
        } else {
            eprintln!("{} {:#}", red("✘"), err);
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, spinner: bool) -> Result<()> {
    let mut session = Session::new();

    match &cli.command {
        Command::Clean { text } => clean(cli, text.as_deref())?,
        Command::Pages { pdf } => {
            let reader = open_reader(cli)?;
            let upload = with_spinner(
                spinner,
                "Opening PDF…",
                upload_pdf(&reader, &mut session, pdf),
            )
            .await?;
            if cli.json {
                print_json(&upload)?;
            } else {
                println!("{}", upload.total_pages);
                if !cli.quiet {
                    eprintln!("{} {} pages", green("✔"), bold(&upload.filename));
                }
            }
        }
        Command::Speak { pdf, page } => {
            let reader = open_reader(cli)?;
            let upload = upload_pdf(&reader, &mut session, pdf).await?;
            let request = ConvertRequest::for_page(&upload, *page);
            let response = with_spinner(
                spinner,
                &format!("Speaking page {page}…"),
                reader.convert_page(&mut session, &request),
            )
            .await
            .with_context(|| format!("Failed to convert page {page}"))?;

            if cli.json {
                print_json(&response)?;
            } else {
                let path = reader.audio_path(&response.audio_file)?;
                println!("{}", path.display());
                if !cli.quiet {
                    eprintln!("{} {}", green("✔"), dim(&response.message));
                }
            }
        }
        Command::Summarize { pdf, page, speak } => {
            let reader = open_reader(cli)?;
            let upload = upload_pdf(&reader, &mut session, pdf).await?;
            let request = ConvertRequest::for_page(&upload, *page);
            reader
                .read_page(&mut session, &request)
                .await
                .with_context(|| format!("Failed to read page {page}"))?;

            let summary = with_spinner(
                spinner,
                &format!("Summarising page {page}…"),
                reader.summarize(&mut session),
            )
            .await
            .context("Summarisation failed")?;

            let audio = if *speak {
                Some(
                    with_spinner(
                        spinner,
                        "Speaking summary…",
                        reader.summary_audio(&session),
                    )
                    .await
                    .context("Failed to convert summary to speech")?,
                )
            } else {
                None
            };

            if cli.json {
                #[derive(Serialize)]
                struct SummaryOutput<'a> {
                    #[serde(flatten)]
                    summary: &'a edgequake_pdf2speech::SummaryResponse,
                    #[serde(skip_serializing_if = "Option::is_none")]
                    audio: Option<&'a edgequake_pdf2speech::ConversionResponse>,
                }
                print_json(&SummaryOutput {
                    summary: &summary,
                    audio: audio.as_ref(),
                })?;
            } else {
                println!("{}", summary.summary);
                if let Some(audio) = audio {
                    let path = reader.audio_path(&audio.audio_file)?;
                    if !cli.quiet {
                        eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
            }
        }
        Command::Cleanup => {
            let reader = open_reader(cli)?;
            let response = reader.purge().await;
            if cli.json {
                print_json(&response)?;
            } else if !cli.quiet {
                eprintln!(
                    "{} {} ({} files removed)",
                    green("✔"),
                    response.message,
                    response.removed_files
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ReaderConfig`.
fn build_config(cli: &Cli) -> Result<ReaderConfig> {
    let mut builder = ReaderConfig::builder()
        .upload_dir(&cli.upload_dir)
        .audio_dir(&cli.audio_dir)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = cli.speech_url {
        builder = builder.speech_url(url);
    }
    if let Some(ref model) = cli.speech_model {
        builder = builder.speech_model(model);
    }
    if let Some(ref voice) = cli.voice {
        builder = builder.voice(voice);
    }

    builder.build().context("Invalid configuration")
}

fn open_reader(cli: &Cli) -> Result<Reader> {
    Reader::new(build_config(cli)?).context("Failed to initialise reader")
}

async fn upload_pdf(reader: &Reader, session: &mut Session, pdf: &Path) -> Result<UploadResponse> {
    let bytes = tokio::fs::read(pdf)
        .await
        .with_context(|| format!("Failed to read {}", pdf.display()))?;
    let name = pdf.file_name().and_then(|n| n.to_str());
    reader
        .upload(session, name, &bytes)
        .await
        .with_context(|| format!("Failed to upload {}", pdf.display()))
}

fn clean(cli: &Cli, text: Option<&str>) -> Result<()> {
    let raw = match text {
        Some(t) => t.to_string(),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let normalizer = SummaryNormalizer::default();
    if cli.verbose {
        for (step, value) in normalizer.trace(&raw) {
            eprintln!("{:<20} {}", dim(step), value);
        }
    }

    let cleaned = normalizer.normalize(&raw);
    if cli.json {
        print_json(&serde_json::json!({ "success": true, "summary": cleaned }))?;
    } else {
        println!("{cleaned}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

/// Run `fut` behind a terminal spinner when `enabled`.
async fn with_spinner<F, T>(enabled: bool, message: &str, fut: F) -> F::Output
where
    F: std::future::Future<Output = T>,
{
    if !enabled {
        return fut.await;
    }

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));

    let out = fut.await;
    bar.finish_and_clear();
    out
}
