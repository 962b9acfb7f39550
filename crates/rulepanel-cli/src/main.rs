//! rulepanel - rule panel code review CLI
//!
//! Runs every review rule against a source file concurrently, merges the
//! findings into one report and writes a rewritten file.
//!
//! ## Commands
//!
//! - `review`: review a file (or stdin) and write `final_<name>`
//! - `rules`: list the active rule set
//! - `probe`: send one short prompt through the configured provider

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};

use rulepanel_core::{ReviewConfig, ReviewPipeline, ReviewReport, RuleSet, TaskExecutor};
use rulepanel_llm::{ExecutorConfig, ProviderConfig, StubGenerator, TextGenerator};

#[derive(Parser)]
#[command(name = "rulepanel")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parallel rule-by-rule code review with a merged report and rewrite", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review a source file and write the rewritten version
    Review {
        /// Source file to review, or `-` for stdin
        input: PathBuf,

        /// Where to write the rewritten file (default: final_<input name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the full review report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Rule set TOML file (`[[rule]]` tables); defaults to the Java guidelines
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Review configuration TOML file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the offline stub instead of a provider
        #[arg(long)]
        stub: bool,

        /// What to print on stdout
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the active rules
    Rules {
        /// Rule set TOML file; defaults to the Java guidelines
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Send a short prompt through the configured provider and show the reply
    Probe {
        /// Prompt to send
        #[arg(short, long, default_value = "Reply with the single word: pong")]
        prompt: String,

        /// Route through the offline stub provider instead of the network
        #[arg(long)]
        stub: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Merged report followed by a summary
    Text,
    /// The full review report as JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local .env only if present; real environment wins
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rulepanel_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Review {
            input,
            output,
            report,
            rules,
            config,
            stub,
            format,
        } => {
            cmd_review(
                &input,
                output.as_deref(),
                report.as_deref(),
                rules.as_deref(),
                config.as_deref(),
                stub,
                format,
            )
            .await
        }
        Commands::Rules { rules } => cmd_rules(rules.as_deref()),
        Commands::Probe { prompt, stub } => cmd_probe(&prompt, stub).await,
    }
}

/// Decode source bytes as UTF-8, falling back to Latin-1.
fn decode_source(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

fn read_source(input: &Path) -> Result<String> {
    let bytes = if input == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read source from stdin")?;
        buf
    } else {
        std::fs::read(input).with_context(|| format!("Failed to read source file {:?}", input))?
    };
    Ok(decode_source(&bytes))
}

/// `final_<name>` next to `input`; `None` for stdin.
fn default_output_path(input: &Path) -> Option<PathBuf> {
    if input == Path::new("-") {
        return None;
    }
    let name = input.file_name()?.to_string_lossy();
    Some(input.with_file_name(format!("final_{name}")))
}

fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    let Some(path) = path else {
        return Ok(RuleSet::java_guidelines());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule set {:?}", path))?;
    RuleSet::from_toml_str(&source).with_context(|| format!("Invalid rule set {:?}", path))
}

fn load_review_config(path: Option<&Path>) -> Result<ReviewConfig> {
    let Some(path) = path else {
        return Ok(ReviewConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read review config {:?}", path))?;
    ReviewConfig::from_toml_str(&source).with_context(|| format!("Invalid review config {:?}", path))
}

/// Executor from the environment; `stub` forces stub mode.
fn build_executor(stub: bool) -> TaskExecutor {
    let mut config = ExecutorConfig::from_env();
    if stub {
        config.stub = true;
    }
    TaskExecutor::from_configs(config, &ProviderConfig::from_env())
}

fn print_summary(report: &ReviewReport) {
    println!();
    println!("Review {}", report.review_id);
    println!("  Input digest:     {}", report.input_digest);
    println!("  Duration:         {} ms", report.duration_ms);
    println!(
        "  Tasks repaired:   {}/{}",
        report.repaired_tasks(),
        report.tasks.len()
    );
    if !report.synthesized_rules.is_empty() {
        let ids: Vec<&str> = report.synthesized_rules.iter().map(|i| i.as_str()).collect();
        println!("  Synthesized:      {}", ids.join(","));
    }
    if report.header_synthesized {
        println!("  Provenance header added by rulepanel");
    }
}

/// Review one source and write the rewritten text
async fn cmd_review(
    input: &Path,
    output: Option<&Path>,
    report_path: Option<&Path>,
    rules: Option<&Path>,
    config: Option<&Path>,
    stub: bool,
    format: OutputFormat,
) -> Result<()> {
    let source = read_source(input)?;
    let rules = load_rules(rules)?;
    let config = load_review_config(config)?;
    let pipeline = ReviewPipeline::new(build_executor(stub), rules, config);

    info!(
        input = %input.display(),
        rules = pipeline.rules().len(),
        provider = pipeline.executor().provider_name(),
        "starting review"
    );

    let report = pipeline
        .run_review(&source)
        .await
        .context("Review failed")?;

    let output = output.map(Path::to_path_buf).or_else(|| default_output_path(input));
    if let Some(path) = &output {
        std::fs::write(path, &report.final_text)
            .with_context(|| format!("Failed to write rewritten file {:?}", path))?;
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write review report {:?}", path))?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{}", report.merged_report);
            if output.is_none() {
                println!();
                println!("{}", report.final_text);
            }
            print_summary(&report);
            if let Some(path) = &output {
                println!("  Rewritten file:   {:?}", path);
            }
        }
    }

    Ok(())
}

/// List the active rules
fn cmd_rules(rules: Option<&Path>) -> Result<()> {
    let rules = load_rules(rules)?;
    for rule in rules.iter() {
        println!("{}  {}", rule.id, rule.title);
        println!("     {}", rule.description);
    }
    Ok(())
}

/// Send one prompt and report provider, attempts and the normalized reply
async fn cmd_probe(prompt: &str, stub: bool) -> Result<()> {
    let executor = if stub {
        let config = ExecutorConfig {
            stub: false,
            ..ExecutorConfig::from_env()
        };
        TaskExecutor::new(config, Some(Arc::new(StubGenerator) as Arc<dyn TextGenerator>))
    } else {
        build_executor(false)
    };

    let (max_tokens, temperature) = (executor.config().max_tokens, executor.config().temperature);
    let reply = executor
        .invoke_detailed(prompt, max_tokens, temperature)
        .await;

    println!("Provider: {}", executor.provider_name());
    println!("Attempts: {}", reply.attempts);
    println!("Failed:   {}", reply.failed);
    println!();
    println!("{}", reply.content);

    if reply.failed {
        anyhow::bail!("Provider probe failed");
    }
    Ok(())
}
