//! Configuration types for report generation.
//!
//! All pipeline behaviour is controlled through [`ReportConfig`], built via
//! its [`ReportConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across invocations, log them, and diff two runs
//! to understand why their reports differ.
//!
//! The result-count and domain-list fields are deliberately tunables rather
//! than constants: different deployments want different source sets and
//! different search breadth, and nothing in the pipeline depends on a
//! specific value.

use crate::error::ReportError;
use crate::llm::{ChatProvider, CompletionOptions};
use crate::progress::ProgressCallback;
use crate::search::SearchProvider;
use std::fmt;
use std::sync::Arc;

/// Default domain allow-list for the web-search tool: academic sources plus
/// the business-news outlets the market-research prompts ask for.
pub fn default_search_domains() -> Vec<String> {
    [
        "scholar.google.com",
        "arxiv.org",
        "ieee.org",
        "nature.com",
        "science.org",
        "sciencedirect.com",
        "techcrunch.com",
        "crunchbase.com",
        "reuters.com",
        "bloomberg.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Configuration for one report generation.
///
/// Built via [`ReportConfig::builder()`] or [`ReportConfig::default()`].
///
/// # Example
/// ```rust
/// use trlscope::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .model("gpt-4o")
///     .trend_search_results(5)
///     .max_tool_calls(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Chat model identifier. Default: "gpt-4o".
    pub model: String,

    /// Sampling temperature for every LLM call. Default: 0.3.
    ///
    /// Low enough that the analysis and synthesis stay grounded in the
    /// paper text, high enough that the report prose is not robotic.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Minimum extracted-text length, in characters, below which the
    /// document is rejected as unreadable. Default: 100.
    pub min_text_chars: usize,

    /// Domain allow-list for the web-search tool. Results whose URL host is
    /// outside this list are dropped. Default: [`default_search_domains`].
    pub search_domains: Vec<String>,

    /// Search results requested per query during market-trend research.
    /// Default: 5.
    pub trend_search_results: usize,

    /// Search results requested per query during competitive-landscape
    /// research. Default: 8 — the competitor scan casts a wider net.
    pub competitor_search_results: usize,

    /// Truncate each result snippet to this many characters before it is
    /// shown to the model. `None` disables truncation. Default: Some(500).
    pub snippet_max_chars: Option<usize>,

    /// Hard cap on search invocations per research step. The agent loop
    /// forces a final answer once the budget is spent. Default: 6.
    pub max_tool_calls: usize,

    /// Maximum retry attempts on a transient LLM API failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-network-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Explicit LLM API key. Head of the credential lookup chain; when
    /// `None`, the environment and the secrets file are consulted.
    pub openai_api_key: Option<String>,

    /// Explicit search API key. Same chain as `openai_api_key`.
    pub tavily_api_key: Option<String>,

    /// Pre-constructed chat provider. Takes precedence over credential
    /// resolution; the injection point for tests and custom middleware.
    pub chat: Option<Arc<dyn ChatProvider>>,

    /// Pre-constructed search provider. Same precedence as `chat`.
    pub search: Option<Arc<dyn SearchProvider>>,

    /// Progress events for each pipeline step. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            min_text_chars: 100,
            search_domains: default_search_domains(),
            trend_search_results: 5,
            competitor_search_results: 8,
            snippet_max_chars: Some(500),
            max_tool_calls: 6,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            openai_api_key: None,
            tavily_api_key: None,
            chat: None,
            search: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("min_text_chars", &self.min_text_chars)
            .field("search_domains", &self.search_domains)
            .field("trend_search_results", &self.trend_search_results)
            .field("competitor_search_results", &self.competitor_search_results)
            .field("snippet_max_chars", &self.snippet_max_chars)
            .field("max_tool_calls", &self.max_tool_calls)
            .field("max_retries", &self.max_retries)
            .field("chat", &self.chat.as_ref().map(|_| "<dyn ChatProvider>"))
            .field("search", &self.search.as_ref().map(|_| "<dyn SearchProvider>"))
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Sampling options forwarded to every LLM call.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Builder for [`ReportConfig`].
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n.max(1);
        self
    }

    pub fn search_domains(mut self, domains: Vec<String>) -> Self {
        self.config.search_domains = domains;
        self
    }

    pub fn trend_search_results(mut self, n: usize) -> Self {
        self.config.trend_search_results = n.max(1);
        self
    }

    pub fn competitor_search_results(mut self, n: usize) -> Self {
        self.config.competitor_search_results = n.max(1);
        self
    }

    pub fn snippet_max_chars(mut self, limit: Option<usize>) -> Self {
        self.config.snippet_max_chars = limit;
        self
    }

    pub fn max_tool_calls(mut self, n: usize) -> Self {
        self.config.max_tool_calls = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.tavily_api_key = Some(key.into());
        self
    }

    pub fn chat(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.config.chat = Some(provider);
        self
    }

    pub fn search(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.config.search = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config;
        if c.model.is_empty() {
            return Err(ReportError::InvalidConfig("Model must not be empty".into()));
        }
        if c.search_domains.is_empty() {
            return Err(ReportError::InvalidConfig(
                "Search domain allow-list must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ReportError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = ReportConfig::default();
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.min_text_chars, 100);
        assert_eq!(c.trend_search_results, 5);
        assert_eq!(c.competitor_search_results, 8);
        assert_eq!(c.snippet_max_chars, Some(500));
        assert!(c.search_domains.contains(&"arxiv.org".to_string()));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ReportConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_floors_counts_at_one() {
        let c = ReportConfig::builder()
            .trend_search_results(0)
            .max_tool_calls(0)
            .min_text_chars(0)
            .build()
            .unwrap();
        assert_eq!(c.trend_search_results, 1);
        assert_eq!(c.max_tool_calls, 1);
        assert_eq!(c.min_text_chars, 1);
    }

    #[test]
    fn empty_domain_list_is_rejected() {
        let result = ReportConfig::builder().search_domains(vec![]).build();
        assert!(matches!(result, Err(ReportError::InvalidConfig(_))));
    }

    #[test]
    fn empty_model_is_rejected() {
        let result = ReportConfig::builder().model("").build();
        assert!(matches!(result, Err(ReportError::InvalidConfig(_))));
    }

    #[test]
    fn completion_options_mirror_config() {
        let c = ReportConfig::builder()
            .temperature(0.7)
            .max_tokens(2048)
            .build()
            .unwrap();
        let opts = c.completion_options();
        assert_eq!(opts.temperature, 0.7);
        assert_eq!(opts.max_tokens, 2048);
    }
}
