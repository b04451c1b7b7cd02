//! sanity-check - copy-edit text files with an LLM, reviewing every change before it lands

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use llm_client::{MODEL_SHORTLIST, get_provider};
use sanity_check::review::{AutoAccept, TerminalReviewer};
use sanity_check::{HostEditor, Position, ReviewOutcome, Reviewer, SanityCheck, TextBuffer};
use settings::Settings;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "sanity-check",
    about = "Copy-edit text with an LLM and review the changes before applying them",
    long_about = "Splits the selected text into paragraph chunks, edits them concurrently with an OpenAI-compatible model, shows the marked-up changes, and rewrites the file only if you accept"
)]
#[command(version)]
struct Args {
    /// Enable debug mode for verbose output
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a sanity check on a file, or on a range of its lines
    Check {
        /// File to edit
        file: PathBuf,

        /// Line range to check, 1-based and inclusive (e.g. "3-10" or "7")
        #[arg(short, long)]
        lines: Option<String>,

        /// Cursor position to restore after applying, as LINE:COLUMN (1-based)
        #[arg(long)]
        cursor: Option<String>,

        /// Apply the changes without asking
        #[arg(short, long)]
        yes: bool,

        /// Model to use for this run (overrides the settings file)
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum chunk length in characters
        #[arg(long)]
        max_chunk_length: Option<usize>,

        /// Extra attempts per chunk for rate limits, timeouts and overloads
        #[arg(long)]
        retries: Option<u32>,

        /// Wait for every chunk and report all failures instead of stopping at the first
        #[arg(long)]
        report_all: bool,
    },
    /// Settings management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current settings
    Show,
    /// Set the API key
    SetKey {
        /// API key for the editing service
        key: String,
    },
    /// Set the API endpoint (OpenAI or compatible)
    SetEndpoint {
        /// Base URL, e.g. https://api.openai.com/v1
        url: String,
    },
    /// Set the model name
    SetModel {
        /// One of the listed models or any model your endpoint serves
        model: String,
    },
    /// List suggested models
    Models,
    /// Set the maximum chunk length
    SetChunkLength {
        /// Length in characters
        value: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match &args.command {
        Commands::Config { action } => handle_config_command(action),
        Commands::Check {
            file,
            lines,
            cursor,
            yes,
            model,
            max_chunk_length,
            retries,
            report_all,
        } => {
            let mut settings = Settings::load().context("Failed to load settings")?;

            // Command-line overrides apply to this run only
            if let Some(model) = model {
                settings.service.api_model = model.clone();
            }
            if let Some(length) = max_chunk_length {
                settings.max_chunk_length = *length;
            }
            if let Some(retries) = retries {
                settings.max_retries = *retries;
            }
            if *report_all {
                settings.fail_fast = false;
            }
            settings.validate()?;

            let target = CheckTarget {
                file,
                lines: lines.as_deref(),
                cursor: cursor.as_deref(),
                auto_accept: *yes,
            };
            run_check(settings, target, args.debug).await
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output for our crates with --debug.
fn init_logging(debug: bool) {
    let default_filter = if debug {
        "sanity_check=debug,llm_client=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Which part of which file to check.
struct CheckTarget<'a> {
    file: &'a Path,
    lines: Option<&'a str>,
    cursor: Option<&'a str>,
    auto_accept: bool,
}

async fn run_check(settings: Settings, target: CheckTarget<'_>, debug: bool) -> Result<()> {
    let content = std::fs::read_to_string(target.file)
        .with_context(|| format!("Failed to read {}", target.file.display()))?;

    let mut editor = TextBuffer::new(content);
    match target.lines {
        Some(range) => {
            let (start, end) = parse_line_range(range)?;
            editor
                .select_lines(start, end)
                .with_context(|| format!("Invalid line range: {}", range))?;
        }
        None => editor.select_content(),
    }
    if let Some(cursor) = target.cursor {
        editor.set_cursor(parse_cursor(cursor)?);
    }

    let provider =
        get_provider(&settings.service).context("Failed to initialize the editing service")?;

    if debug {
        eprintln!(
            "Using LLM provider: {} (model: {}, endpoint: {})",
            provider.name(),
            settings.service.api_model,
            settings.service.api_endpoint
        );
    }

    let check = SanityCheck::new(provider, settings.check_options());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks ({elapsed})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let prepared = check
        .prepare(&editor, |progress| {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.completed as u64);
        })
        .await;
    let prepared = match prepared {
        Ok(prepared) => {
            pb.finish_and_clear();
            prepared
        }
        Err(e) => {
            pb.abandon();
            return Err(e).context("Sanity check failed; the file was not modified");
        }
    };

    if debug {
        eprintln!(
            "Chunks: {}, Tokens: {} in, {} out",
            prepared.chunk_count, prepared.usage.input_tokens, prepared.usage.output_tokens
        );
    }

    let mut reviewer: Box<dyn Reviewer> = if target.auto_accept {
        Box::new(AutoAccept)
    } else {
        Box::new(TerminalReviewer::stdio())
    };
    let decision = reviewer.review(prepared.gate.document());

    let outcome = prepared
        .gate
        .resolve(decision, &mut editor)
        .context("Could not apply the changes; the file was not modified")?;

    match outcome {
        ReviewOutcome::Applied => {
            let cursor = editor.cursor();
            std::fs::write(target.file, editor.into_text())
                .with_context(|| format!("Failed to write {}", target.file.display()))?;
            eprintln!(
                "Applied changes to {} (cursor at {}:{})",
                target.file.display(),
                cursor.line + 1,
                cursor.column + 1
            );
        }
        ReviewOutcome::Rejected => {
            eprintln!("Changes rejected; {} left untouched", target.file.display());
        }
        ReviewOutcome::Dismissed => {
            eprintln!("No decision made; {} left untouched", target.file.display());
        }
    }

    Ok(())
}

/// Parse a line range string like "3-10" or "7".
fn parse_line_range(range: &str) -> Result<(usize, usize)> {
    match range.split_once('-') {
        Some((start, end)) => {
            let start: usize = start.trim().parse().context("Invalid start line")?;
            let end: usize = end.trim().parse().context("Invalid end line")?;
            Ok((start, end))
        }
        None => {
            let line: usize = range.trim().parse().context("Invalid line number")?;
            Ok((line, line))
        }
    }
}

/// Parse a 1-based "LINE:COLUMN" cursor into a 0-based position.
fn parse_cursor(cursor: &str) -> Result<Position> {
    let (line, column) = cursor
        .split_once(':')
        .context("Cursor must look like LINE:COLUMN")?;
    let line: usize = line.trim().parse().context("Invalid cursor line")?;
    let column: usize = column.trim().parse().context("Invalid cursor column")?;
    Ok(Position::new(line.saturating_sub(1), column.saturating_sub(1)))
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load()?;
            println!("Settings file: {}", Settings::config_path()?.display());
            println!();
            match &settings.service.api_key {
                Some(key) => println!("api_key = {}", mask_key(key)),
                None => println!("api_key = (not set, using OPENAI_API_KEY)"),
            }
            println!("api_endpoint = \"{}\"", settings.service.api_endpoint);
            println!("api_model = \"{}\"", settings.service.api_model);
            println!("timeout_secs = {}", settings.service.timeout_secs);
            println!("max_chunk_length = {}", settings.max_chunk_length);
            println!("max_retries = {}", settings.max_retries);
            println!("retry_backoff_ms = {}", settings.retry_backoff_ms);
            println!("max_retry_wait_secs = {}", settings.max_retry_wait_secs);
            println!("fail_fast = {}", settings.fail_fast);
            match settings.temperature {
                Some(t) => println!("temperature = {}", t),
                None => println!("temperature = (service default)"),
            }
        }
        ConfigAction::SetKey { key } => {
            let mut settings = Settings::load()?;
            settings.service.api_key = Some(key.trim().to_string());
            settings.save()?;
            println!("API key saved");
        }
        ConfigAction::SetEndpoint { url } => {
            let mut settings = Settings::load()?;
            settings.service.api_endpoint = url.trim().to_string();
            settings.validate()?;
            settings.save()?;
            println!("API endpoint set to: {}", settings.service.api_endpoint);
        }
        ConfigAction::SetModel { model } => {
            let mut settings = Settings::load()?;
            settings.service.api_model = model.trim().to_string();
            settings.validate()?;
            settings.save()?;
            let custom = if settings.service.is_custom_model() {
                " (custom)"
            } else {
                ""
            };
            println!("Model set to: {}{}", settings.service.api_model, custom);
        }
        ConfigAction::Models => {
            let settings = Settings::load()?;
            println!("Suggested models:");
            for model in MODEL_SHORTLIST {
                let marker = if *model == settings.service.api_model {
                    " (current)"
                } else {
                    ""
                };
                println!("  {}{}", model, marker);
            }
            if settings.service.is_custom_model() {
                println!("  {} (current, custom)", settings.service.api_model);
            }
            println!();
            println!("Any other model your endpoint serves works too: sanity-check config set-model <name>");
        }
        ConfigAction::SetChunkLength { value } => {
            let mut settings = Settings::load()?;
            settings.max_chunk_length = *value;
            settings.validate()?;
            settings.save()?;
            println!("Maximum chunk length set to: {}", value);
        }
    }
    Ok(())
}

/// Show only the ends of an API key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
