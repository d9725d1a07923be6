//! # trlscope
//!
//! Estimate the technology-transfer potential and Technology Readiness
//! Level (TRL) of a scientific paper.
//!
//! ## What it does
//!
//! Given a paper as a PDF, trlscope extracts the text, has a language model
//! analyse the research, sends two tool-using research agents out to a
//! web-search API (market trends, then competitive landscape), and finally
//! synthesises everything into a fixed-structure Markdown report: project
//! analysis, market context, competitive landscape, a TRL roadmap, and the
//! sources consulted.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    pdfium text extraction (CPU-bound, spawn_blocking)
//!  ├─ 2. Analyze    one LLM call: technology, problem, methodology, keywords
//!  ├─ 3. Research   agent loop: model picks queries → web_search tool → consolidate
//!  ├─ 4. Research   same loop, competitive-landscape prompt, wider net
//!  └─ 5. Synthesize one LLM call fills the rigid report template
//! ```
//!
//! Execution is strictly sequential — each step's output is embedded in the
//! next step's prompt. The agent loops are hard-bounded (see
//! [`ReportConfig::max_tool_calls`]); search failures degrade the report
//! instead of aborting it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trlscope::{generate_report_from_pdf, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Keys resolved from OPENAI_API_KEY / TAVILY_API_KEY or secrets.toml
//!     let config = ReportConfig::default();
//!     let output = generate_report_from_pdf("paper.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `trlscope` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! trlscope = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credentials;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod search;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{default_search_domains, ReportConfig, ReportConfigBuilder};
pub use error::{ReportError, SearchError};
pub use llm::{AssistantTurn, ChatMessage, ChatProvider, CompletionOptions, OpenAiChat, ToolSpec};
pub use output::{ReportOutput, ReportStats};
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback, ReportStep};
pub use report::{
    default_output_name, generate_report, generate_report_from_bytes, generate_report_from_pdf,
    write_report,
};
pub use search::{SearchProvider, SearchResult, TavilySearch};
