//! Report generation entry points.
//!
//! The pipeline is strictly sequential: each step completes — including all
//! nested tool calls — before the next begins, because each step's output
//! is embedded in the next step's prompt. There is no partial-result
//! delivery: any fatal error aborts the run and propagates to the caller
//! with a step-prefixed message.

use crate::config::ReportConfig;
use crate::credentials;
use crate::error::ReportError;
use crate::llm::{ChatMessage, ChatProvider, OpenAiChat};
use crate::output::{ReportOutput, ReportStats};
use crate::pipeline::{agent, extract, postprocess};
use crate::progress::ReportStep;
use crate::prompts;
use crate::search::{SearchProvider, TavilySearch};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Generate a technology-transfer report from already-extracted paper text.
///
/// This is the primary entry point for the library.
///
/// # Preconditions, checked in order
/// 1. `paper_text` must contain at least
///    [`ReportConfig::min_text_chars`] characters — otherwise
///    [`ReportError::InsufficientText`], before anything else happens.
/// 2. Both API keys must resolve (unless both providers are injected) —
///    otherwise [`ReportError::MissingCredentials`], before any network
///    call is attempted.
pub async fn generate_report(
    paper_text: &str,
    config: &ReportConfig,
) -> Result<ReportOutput, ReportError> {
    let total_start = Instant::now();

    let chars = paper_text.trim().chars().count();
    if chars < config.min_text_chars {
        return Err(ReportError::InsufficientText {
            chars,
            min: config.min_text_chars,
        });
    }

    let (chat, search) = resolve_providers(config)?;
    let options = config.completion_options();
    let mut stats = ReportStats::default();

    // ── Step 1: paper analysis ───────────────────────────────────────────
    notify_start(config, ReportStep::Analysis);
    let step_start = Instant::now();
    let turn = chat
        .chat(
            &[ChatMessage::user(prompts::analysis_prompt(paper_text))],
            None,
            &options,
        )
        .await
        .map_err(|e| with_step_context(ReportStep::Analysis, e))?;
    if turn.content.trim().is_empty() {
        return Err(ReportError::LlmApi {
            message: "analysis step returned an empty response".into(),
        });
    }
    let analysis = turn.content;
    stats.llm_calls += 1;
    stats.total_input_tokens += turn.prompt_tokens as u64;
    stats.total_output_tokens += turn.completion_tokens as u64;
    stats.analysis_duration_ms = step_start.elapsed().as_millis() as u64;
    notify_complete(config, ReportStep::Analysis, analysis.len());

    // ── Step 2: market-trend research ────────────────────────────────────
    notify_start(config, ReportStep::MarketResearch);
    let step_start = Instant::now();
    let trends = agent::run_research(
        &chat,
        &search,
        ReportStep::MarketResearch,
        prompts::TREND_RESEARCH_SYSTEM,
        prompts::trend_research_request(&analysis),
        config.trend_search_results,
        config,
    )
    .await
    .map_err(|e| with_step_context(ReportStep::MarketResearch, e))?;
    record_research(&mut stats, &trends);
    stats.trends_duration_ms = step_start.elapsed().as_millis() as u64;
    notify_complete(config, ReportStep::MarketResearch, trends.summary.len());

    // ── Step 3: competitive-landscape research ───────────────────────────
    notify_start(config, ReportStep::CompetitorResearch);
    let step_start = Instant::now();
    let competitors = agent::run_research(
        &chat,
        &search,
        ReportStep::CompetitorResearch,
        prompts::COMPETITOR_RESEARCH_SYSTEM,
        prompts::competitor_research_request(&analysis),
        config.competitor_search_results,
        config,
    )
    .await
    .map_err(|e| with_step_context(ReportStep::CompetitorResearch, e))?;
    record_research(&mut stats, &competitors);
    stats.competitors_duration_ms = step_start.elapsed().as_millis() as u64;
    notify_complete(config, ReportStep::CompetitorResearch, competitors.summary.len());

    // ── Step 4: synthesis ────────────────────────────────────────────────
    notify_start(config, ReportStep::Synthesis);
    let step_start = Instant::now();
    let turn = chat
        .chat(
            &[ChatMessage::user(prompts::synthesis_prompt(
                paper_text,
                &analysis,
                &trends.summary,
                &competitors.summary,
            ))],
            None,
            &options,
        )
        .await
        .map_err(|e| with_step_context(ReportStep::Synthesis, e))?;
    if turn.content.trim().is_empty() {
        return Err(ReportError::LlmApi {
            message: "synthesis step returned an empty response".into(),
        });
    }
    stats.llm_calls += 1;
    stats.total_input_tokens += turn.prompt_tokens as u64;
    stats.total_output_tokens += turn.completion_tokens as u64;
    stats.synthesis_duration_ms = step_start.elapsed().as_millis() as u64;

    let markdown = postprocess::clean_report(&turn.content);
    notify_complete(config, ReportStep::Synthesis, markdown.len());

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Report generated: {} LLM calls, {} searches, {}ms total",
        stats.llm_calls, stats.search_calls, stats.total_duration_ms
    );

    Ok(ReportOutput {
        markdown,
        analysis,
        market_trends: trends.summary,
        competitive_landscape: competitors.summary,
        stats,
    })
}

/// Generate a report straight from a PDF file on disk.
pub async fn generate_report_from_pdf(
    input: impl AsRef<Path>,
    config: &ReportConfig,
) -> Result<ReportOutput, ReportError> {
    let path = input.as_ref();
    info!("Extracting text from {}", path.display());
    let text = extract::extract_text(path).await?;
    generate_report(&text, config).await
}

/// Generate a report from in-memory PDF bytes.
///
/// Writes `bytes` to a managed [`tempfile`] so pdfium has a file-system
/// path to open; the file is cleaned up automatically on return or panic.
pub async fn generate_report_from_bytes(
    bytes: &[u8],
    config: &ReportConfig,
) -> Result<ReportOutput, ReportError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ReportError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ReportError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_path_buf();
    // `tmp` is dropped (and the file deleted) when this function returns
    generate_report_from_pdf(&path, config).await
}

/// Write the report Markdown to a file, byte-identical to
/// [`ReportOutput::markdown`].
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_report(
    output: &ReportOutput,
    path: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ReportError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &output.markdown)
        .await
        .map_err(|e| ReportError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ReportError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}

/// Default report file name for a given input: `tech_transfer_<stem>.md`,
/// in the current directory.
pub fn default_output_name(input: impl AsRef<Path>) -> PathBuf {
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    PathBuf::from(format!("tech_transfer_{stem}.md"))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the chat and search providers, injection-first.
///
/// 1. **Pre-built providers** (`config.chat` / `config.search`) — when both
///    are supplied no credential lookup happens at all. This is the test
///    seam and the hook for custom middleware.
/// 2. **Credential chain** — otherwise both API keys are resolved up front
///    (config → environment → secrets file) and the default HTTP clients
///    are constructed. Either key missing fails the run here, before any
///    request is sent.
fn resolve_providers(
    config: &ReportConfig,
) -> Result<(Arc<dyn ChatProvider>, Arc<dyn SearchProvider>), ReportError> {
    if let (Some(chat), Some(search)) = (&config.chat, &config.search) {
        debug!("Using injected chat and search providers");
        return Ok((Arc::clone(chat), Arc::clone(search)));
    }

    let creds = credentials::resolve(
        config.openai_api_key.as_deref(),
        config.tavily_api_key.as_deref(),
    )?;

    let chat: Arc<dyn ChatProvider> = match &config.chat {
        Some(provider) => Arc::clone(provider),
        None => Arc::new(OpenAiChat::new(
            creds.openai_api_key,
            config.model.clone(),
            config.api_timeout_secs,
            config.max_retries,
            config.retry_backoff_ms,
        )?),
    };

    let search: Arc<dyn SearchProvider> = match &config.search {
        Some(provider) => Arc::clone(provider),
        None => Arc::new(
            TavilySearch::new(
                creds.tavily_api_key,
                config.search_domains.clone(),
                config.api_timeout_secs,
            )
            .map_err(|e| ReportError::Internal(e.to_string()))?,
        ),
    };

    Ok((chat, search))
}

fn record_research(stats: &mut ReportStats, outcome: &agent::ResearchOutcome) {
    stats.llm_calls += outcome.llm_calls;
    stats.search_calls += outcome.searches;
    stats.total_input_tokens += outcome.input_tokens;
    stats.total_output_tokens += outcome.output_tokens;
}

/// Prefix API failures with the step they occurred in; pass everything
/// else through untouched.
fn with_step_context(step: ReportStep, err: ReportError) -> ReportError {
    match err {
        ReportError::LlmApi { message } => ReportError::LlmApi {
            message: format!("step '{step}': {message}"),
        },
        other => other,
    }
}

fn notify_start(config: &ReportConfig, step: ReportStep) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_start(step);
    }
}

fn notify_complete(config: &ReportConfig, step: ReportStep, len: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_complete(step, len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_name_uses_the_input_stem() {
        assert_eq!(
            default_output_name("papers/quantum_sensing.pdf"),
            PathBuf::from("tech_transfer_quantum_sensing.md")
        );
    }

    #[test]
    fn default_output_name_without_extension() {
        assert_eq!(
            default_output_name("paper"),
            PathBuf::from("tech_transfer_paper.md")
        );
    }

    #[test]
    fn step_context_wraps_api_errors_only() {
        let wrapped = with_step_context(
            ReportStep::Synthesis,
            ReportError::LlmApi {
                message: "HTTP 500".into(),
            },
        );
        assert!(wrapped.to_string().contains("Writing the final report"));

        let passthrough = with_step_context(
            ReportStep::Analysis,
            ReportError::InsufficientText { chars: 1, min: 100 },
        );
        assert!(matches!(
            passthrough,
            ReportError::InsufficientText { .. }
        ));
    }
}
