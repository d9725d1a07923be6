//! CLI binary for trlscope.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReportConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use trlscope::{
    default_output_name, default_search_domains, generate_report_from_pdf, write_report,
    ProgressCallback, ReportConfig, ReportProgressCallback, ReportStep,
};

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner with the current step, plus a log line per
/// completed step and per search query.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ReportProgressCallback for CliProgress {
    fn on_step_start(&self, step: ReportStep) {
        self.bar.set_message(format!(
            "Step {}/{}: {}…",
            step.index(),
            ReportStep::COUNT,
            step
        ));
    }

    fn on_step_complete(&self, step: ReportStep, output_len: usize) {
        self.bar.println(format!(
            "  {} Step {}/{}  {}  {}",
            green("✓"),
            step.index(),
            ReportStep::COUNT,
            step,
            dim(&format!("{output_len} chars")),
        ));
    }

    fn on_search(&self, _step: ReportStep, query: &str) {
        self.bar.println(format!("    {} {}", cyan("🔎"), dim(query)));
    }

    fn on_search_failed(&self, _step: ReportStep, query: &str, error: String) {
        self.bar.println(format!(
            "    {} {} — {}",
            red("✗"),
            dim(query),
            red(&error)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate a report to stdout
  trlscope paper.pdf

  # Write the report next to you, named after the paper
  trlscope paper.pdf --auto-output

  # Explicit output file, wider competitor search
  trlscope paper.pdf -o report.md --competitor-results 10

  # Restrict sources to two domains
  trlscope paper.pdf --domains arxiv.org,nature.com

  # Structured JSON (report + intermediate results + stats)
  trlscope paper.pdf --json > report.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      LLM API key (required)
  TAVILY_API_KEY      Search API key (required)
  TRLSCOPE_SECRETS    Path to a TOML secrets file (fallback key source)
  TRLSCOPE_MODEL      Override the chat model

SETUP:
  1. Set API keys:    export OPENAI_API_KEY=sk-...
                      export TAVILY_API_KEY=tvly-...
  2. Generate:        trlscope paper.pdf --auto-output

  Keys can also live in ./secrets.toml:
      OPENAI_API_KEY = "sk-..."
      TAVILY_API_KEY = "tvly-..."
"#;

/// Estimate the technology-transfer potential and TRL of a scientific paper.
#[derive(Parser, Debug)]
#[command(
    name = "trlscope",
    version,
    about = "Estimate the technology-transfer potential and TRL of a scientific paper",
    long_about = "Analyse a scientific paper (PDF), research market trends and the competitive \
landscape through web search, and produce a Markdown report with a TRL roadmap.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the paper (PDF).
    input: PathBuf,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "TRLSCOPE_OUTPUT")]
    output: Option<PathBuf>,

    /// Write to `tech_transfer_<stem>.md` in the current directory.
    #[arg(long, conflicts_with = "output")]
    auto_output: bool,

    /// Chat model ID.
    #[arg(long, env = "TRLSCOPE_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "TRLSCOPE_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "TRLSCOPE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Minimum extracted-text length before the paper is rejected.
    #[arg(long, env = "TRLSCOPE_MIN_TEXT_CHARS", default_value_t = 100)]
    min_text_chars: usize,

    /// Search results per query during market-trend research.
    #[arg(long, env = "TRLSCOPE_TREND_RESULTS", default_value_t = 5)]
    trend_results: usize,

    /// Search results per query during competitor research.
    #[arg(long, env = "TRLSCOPE_COMPETITOR_RESULTS", default_value_t = 8)]
    competitor_results: usize,

    /// Comma-separated domain allow-list for web search.
    #[arg(long, env = "TRLSCOPE_DOMAINS", value_delimiter = ',')]
    domains: Option<Vec<String>>,

    /// Hard cap on web searches per research step.
    #[arg(long, env = "TRLSCOPE_MAX_TOOL_CALLS", default_value_t = 6)]
    max_tool_calls: usize,

    /// Retries per LLM call on transient failure.
    #[arg(long, env = "TRLSCOPE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-network-call timeout in seconds.
    #[arg(long, env = "TRLSCOPE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Output structured JSON (report + intermediate results + stats).
    #[arg(long, env = "TRLSCOPE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "TRLSCOPE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TRLSCOPE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report itself.
    #[arg(short, long, env = "TRLSCOPE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // progress lines provide all the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<Arc<CliProgress>> = show_progress.then(CliProgress::new);

    let mut builder = ReportConfig::builder()
        .model(cli.model.as_str())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .min_text_chars(cli.min_text_chars)
        .trend_search_results(cli.trend_results)
        .competitor_search_results(cli.competitor_results)
        .max_tool_calls(cli.max_tool_calls)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .search_domains(cli.domains.clone().unwrap_or_else(default_search_domains));

    if let Some(ref cb) = progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let result = generate_report_from_pdf(&cli.input, &config).await;

    if let Some(ref cb) = progress {
        cb.finish();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", red("✘"), bold("Report generation failed"));
            eprintln!();
            eprintln!("Please check that:");
            eprintln!("  • the PDF contains selectable text (not only scanned images)");
            eprintln!("  • OPENAI_API_KEY and TAVILY_API_KEY are configured");
            eprintln!("  • your internet connection is stable");
            return Err(anyhow::Error::from(e).context("Report generation failed"));
        }
    };

    // ── Emit the report ──────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(path) = cli
        .output
        .clone()
        .or_else(|| cli.auto_output.then(|| default_output_name(&cli.input)))
    {
        write_report(&report, &path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{}  report  →  {}",
                green("✔"),
                bold(&path.display().to_string())
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !report.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} LLM calls  /  {} searches  —  {} tokens in / {} out  —  {}ms total",
            dim(&report.stats.llm_calls.to_string()),
            dim(&report.stats.search_calls.to_string()),
            dim(&report.stats.total_input_tokens.to_string()),
            dim(&report.stats.total_output_tokens.to_string()),
            report.stats.total_duration_ms,
        );
    }

    Ok(())
}
