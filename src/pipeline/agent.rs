//! The bounded tool-use loop driving both research steps.
//!
//! The model is given a single tool (`web_search`) and a task. Each turn it
//! either requests searches or produces its consolidated answer. The loop
//! is explicitly bounded in two ways:
//!
//! * a **search budget** (`ReportConfig::max_tool_calls`) — every tool call
//!   the model requests counts against it, valid or not, so a model that
//!   emits garbage arguments cannot spin forever;
//! * a **round cap** of `max_tool_calls + 2` model turns.
//!
//! When either bound is hit, one final request is made with tools disabled
//! and an explicit instruction to consolidate, forcing a textual answer.
//!
//! Search failures are non-fatal by contract: the error text becomes the
//! tool observation, and the model folds the failure into its reasoning.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::llm::{AssistantTurn, ChatMessage, ChatProvider, FunctionSpec, ToolSpec};
use crate::progress::ReportStep;
use crate::prompts::{FINAL_ANSWER_NUDGE, WEB_SEARCH_TOOL_DESCRIPTION, WEB_SEARCH_TOOL_NAME};
use crate::search::{self, SearchProvider};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a research step produced, plus its resource usage.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// The model's consolidated findings.
    pub summary: String,
    /// Web searches actually executed.
    pub searches: usize,
    /// Completion requests issued.
    pub llm_calls: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Argument object the model must supply for a `web_search` call.
#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

/// The single tool exposed to the research agents.
pub fn web_search_tool_spec() -> ToolSpec {
    ToolSpec {
        kind: "function".into(),
        function: FunctionSpec {
            name: WEB_SEARCH_TOOL_NAME.into(),
            description: WEB_SEARCH_TOOL_DESCRIPTION.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to run"
                    }
                },
                "required": ["query"]
            }),
        },
    }
}

/// Run one research step to completion.
///
/// `max_results` is the per-query result count — the two research steps use
/// different breadths ([`ReportConfig::trend_search_results`] vs
/// [`ReportConfig::competitor_search_results`]).
pub async fn run_research(
    chat: &Arc<dyn ChatProvider>,
    search: &Arc<dyn SearchProvider>,
    step: ReportStep,
    system_prompt: &str,
    request: String,
    max_results: usize,
    config: &ReportConfig,
) -> Result<ResearchOutcome, ReportError> {
    let options = config.completion_options();
    let tools = [web_search_tool_spec()];
    let mut messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(request),
    ];

    let mut outcome = ResearchOutcome {
        summary: String::new(),
        searches: 0,
        llm_calls: 0,
        input_tokens: 0,
        output_tokens: 0,
    };
    // Counts every requested call, including malformed ones, so budget
    // consumption does not depend on the model producing valid arguments.
    let mut calls_requested = 0usize;
    let max_rounds = config.max_tool_calls + 2;

    for round in 0..max_rounds {
        if calls_requested >= config.max_tool_calls {
            break;
        }

        let turn = chat.chat(&messages, Some(&tools[..]), &options).await?;
        record_usage(&mut outcome, &turn);

        if turn.is_final() {
            return finish(step, turn.content, outcome);
        }

        debug!(
            "{step}: round {round}, {} tool call(s) requested",
            turn.tool_calls.len()
        );

        let tool_calls = turn.tool_calls.clone();
        messages.push(ChatMessage::assistant_tool_request(
            (!turn.content.is_empty()).then(|| turn.content.clone()),
            tool_calls.clone(),
        ));

        // Every requested call gets an observation, even after the budget
        // runs out mid-turn — the chat protocol requires a tool message per
        // tool_call id.
        for call in tool_calls {
            let within_budget = calls_requested < config.max_tool_calls;
            calls_requested += 1;

            let observation = if !within_budget {
                "Search budget exhausted; this query was not run.".to_string()
            } else {
                execute_tool_call(search, step, &call.function.name, &call.function.arguments, max_results, config, &mut outcome)
                    .await
            };
            messages.push(ChatMessage::tool(call.id, observation));
        }
    }

    // Budget or round cap hit with the model still asking for tools:
    // disable tools and demand the consolidated answer.
    warn!("{step}: search budget exhausted, forcing final answer");
    messages.push(ChatMessage::user(FINAL_ANSWER_NUDGE));
    let turn = chat.chat(&messages, None, &options).await?;
    record_usage(&mut outcome, &turn);
    finish(step, turn.content, outcome)
}

/// Execute one tool call, rendering every failure mode into observation text.
async fn execute_tool_call(
    search: &Arc<dyn SearchProvider>,
    step: ReportStep,
    name: &str,
    arguments: &str,
    max_results: usize,
    config: &ReportConfig,
    outcome: &mut ResearchOutcome,
) -> String {
    if name != WEB_SEARCH_TOOL_NAME {
        return format!("Unknown tool '{name}'; only '{WEB_SEARCH_TOOL_NAME}' is available.");
    }

    let args: SearchArgs = match serde_json::from_str(arguments) {
        Ok(args) => args,
        Err(e) => return format!("Could not parse tool arguments: {e}"),
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_search(step, &args.query);
    }

    outcome.searches += 1;
    match search.search(&args.query, max_results).await {
        Ok(mut results) => {
            search::retain_allowed_domains(&mut results, &config.search_domains);
            if let Some(limit) = config.snippet_max_chars {
                search::truncate_snippets(&mut results, limit);
            }
            search::format_observation(&results)
        }
        Err(e) => {
            warn!("{step}: search '{}' failed — {e}", args.query);
            if let Some(ref cb) = config.progress_callback {
                cb.on_search_failed(step, &args.query, e.to_string());
            }
            format!("Search failed: {e}")
        }
    }
}

fn record_usage(outcome: &mut ResearchOutcome, turn: &AssistantTurn) {
    outcome.llm_calls += 1;
    outcome.input_tokens += turn.prompt_tokens as u64;
    outcome.output_tokens += turn.completion_tokens as u64;
}

fn finish(
    step: ReportStep,
    content: String,
    mut outcome: ResearchOutcome,
) -> Result<ResearchOutcome, ReportError> {
    if content.trim().is_empty() {
        return Err(ReportError::LlmApi {
            message: format!("model returned an empty answer during step '{step}'"),
        });
    }
    outcome.summary = content;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::llm::{CompletionOptions, FunctionCall, ToolCall};
    use crate::search::SearchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed list of turns, then keeps returning the last one.
    struct ScriptedChat {
        turns: Mutex<Vec<AssistantTurn>>,
        calls: AtomicUsize,
        /// Tools offered on the most recent request, per call.
        tools_offered: Mutex<Vec<bool>>,
    }

    impl ScriptedChat {
        fn new(turns: Vec<AssistantTurn>) -> Arc<Self> {
            Arc::new(Self {
                turns: Mutex::new(turns),
                calls: AtomicUsize::new(0),
                tools_offered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedChat {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            tools: Option<&[ToolSpec]>,
            _options: &CompletionOptions,
        ) -> Result<AssistantTurn, ReportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tools_offered.lock().unwrap().push(tools.is_some());
            let mut turns = self.turns.lock().unwrap();
            if turns.len() > 1 {
                Ok(turns.remove(0))
            } else {
                Ok(turns[0].clone())
            }
        }
    }

    struct CannedSearch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for CannedSearch {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SearchResult {
                title: "Perovskite market report".into(),
                url: "https://www.nature.com/articles/x".into(),
                content: "The market grew".into(),
                score: 0.9,
                published_date: Some("2025-01-15".into()),
            }])
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchProvider for FailingSearch {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchResult>, SearchError> {
            Err(SearchError::QuotaExceeded)
        }
    }

    fn tool_call_turn(query: &str) -> AssistantTurn {
        AssistantTurn {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                kind: "function".into(),
                function: FunctionCall {
                    name: WEB_SEARCH_TOOL_NAME.into(),
                    arguments: format!("{{\"query\": \"{query}\"}}"),
                },
            }],
            prompt_tokens: 100,
            completion_tokens: 10,
        }
    }

    fn final_turn(content: &str) -> AssistantTurn {
        AssistantTurn {
            content: content.into(),
            tool_calls: vec![],
            prompt_tokens: 200,
            completion_tokens: 50,
        }
    }

    fn test_config() -> ReportConfig {
        ReportConfig::builder()
            .search_domains(vec!["nature.com".into()])
            .max_tool_calls(3)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn loop_terminates_on_final_answer() {
        let chat = ScriptedChat::new(vec![
            tool_call_turn("solar market size"),
            final_turn("Consolidated findings with [link](https://nature.com)."),
        ]);
        let search = Arc::new(CannedSearch {
            calls: AtomicUsize::new(0),
        });

        let outcome = run_research(
            &(chat.clone() as Arc<dyn ChatProvider>),
            &(search.clone() as Arc<dyn SearchProvider>),
            ReportStep::MarketResearch,
            "system",
            "request".into(),
            5,
            &test_config(),
        )
        .await
        .unwrap();

        assert!(outcome.summary.contains("Consolidated findings"));
        assert_eq!(outcome.searches, 1);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.llm_calls, 2);
        assert_eq!(outcome.input_tokens, 300);
    }

    #[tokio::test]
    async fn failing_search_still_yields_a_summary() {
        let chat = ScriptedChat::new(vec![
            tool_call_turn("funding data"),
            final_turn("No external data was reachable; based on the analysis alone…"),
        ]);
        let search: Arc<dyn SearchProvider> = Arc::new(FailingSearch);

        let outcome = run_research(
            &(chat as Arc<dyn ChatProvider>),
            &search,
            ReportStep::MarketResearch,
            "system",
            "request".into(),
            5,
            &test_config(),
        )
        .await
        .unwrap();

        assert!(!outcome.summary.trim().is_empty());
    }

    #[tokio::test]
    async fn tool_budget_is_enforced() {
        // Model asks for a search on every turn until it is cut off.
        let chat = ScriptedChat::new(vec![
            tool_call_turn("q1"),
            tool_call_turn("q2"),
            tool_call_turn("q3"),
            final_turn("Forced summary."),
        ]);
        let search = Arc::new(CannedSearch {
            calls: AtomicUsize::new(0),
        });

        let outcome = run_research(
            &(chat.clone() as Arc<dyn ChatProvider>),
            &(search.clone() as Arc<dyn SearchProvider>),
            ReportStep::CompetitorResearch,
            "system",
            "request".into(),
            8,
            &test_config(), // max_tool_calls = 3
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary, "Forced summary.");
        assert!(
            search.calls.load(Ordering::SeqCst) <= 3,
            "search executed more times than the budget allows"
        );
        // The forced-final request must have had tools disabled.
        let offered = chat.tools_offered.lock().unwrap();
        assert_eq!(offered.last(), Some(&false));
    }

    #[tokio::test]
    async fn malformed_arguments_become_observations() {
        let bad_call = AssistantTurn {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_bad".into(),
                kind: "function".into(),
                function: FunctionCall {
                    name: WEB_SEARCH_TOOL_NAME.into(),
                    arguments: "{not json".into(),
                },
            }],
            prompt_tokens: 0,
            completion_tokens: 0,
        };
        let chat = ScriptedChat::new(vec![bad_call, final_turn("Summary anyway.")]);
        let search = Arc::new(CannedSearch {
            calls: AtomicUsize::new(0),
        });

        let outcome = run_research(
            &(chat as Arc<dyn ChatProvider>),
            &(search.clone() as Arc<dyn SearchProvider>),
            ReportStep::MarketResearch,
            "system",
            "request".into(),
            5,
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary, "Summary anyway.");
        // The malformed call never reached the search provider.
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        // But it still consumed budget.
        assert_eq!(outcome.searches, 0);
    }

    #[tokio::test]
    async fn unknown_tool_is_answered_not_executed() {
        let odd_call = AssistantTurn {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_odd".into(),
                kind: "function".into(),
                function: FunctionCall {
                    name: "read_email".into(),
                    arguments: "{}".into(),
                },
            }],
            prompt_tokens: 0,
            completion_tokens: 0,
        };
        let chat = ScriptedChat::new(vec![odd_call, final_turn("Done.")]);
        let search = Arc::new(CannedSearch {
            calls: AtomicUsize::new(0),
        });

        let outcome = run_research(
            &(chat as Arc<dyn ChatProvider>),
            &(search.clone() as Arc<dyn SearchProvider>),
            ReportStep::MarketResearch,
            "system",
            "request".into(),
            5,
            &test_config(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary, "Done.");
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_final_answer_is_an_error() {
        let chat = ScriptedChat::new(vec![final_turn("   ")]);
        let search: Arc<dyn SearchProvider> = Arc::new(FailingSearch);

        let result = run_research(
            &(chat as Arc<dyn ChatProvider>),
            &search,
            ReportStep::MarketResearch,
            "system",
            "request".into(),
            5,
            &test_config(),
        )
        .await;

        assert!(matches!(result, Err(ReportError::LlmApi { .. })));
    }

    #[test]
    fn tool_spec_declares_the_query_parameter() {
        let spec = web_search_tool_spec();
        assert_eq!(spec.function.name, WEB_SEARCH_TOOL_NAME);
        assert_eq!(spec.function.parameters["required"][0], "query");
    }
}
