//! Output types returned by the report pipeline.

use serde::{Deserialize, Serialize};

/// Result of a successful report generation.
///
/// `markdown` is the finished report. The intermediate step results are
/// kept so callers can log them, display them, or debug a weak report
/// without re-running the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    /// The final Markdown report.
    pub markdown: String,

    /// Step 1 result: the internal paper analysis.
    pub analysis: String,

    /// Step 2 result: consolidated market-trend findings.
    pub market_trends: String,

    /// Step 3 result: consolidated competitive-landscape findings.
    pub competitive_landscape: String,

    /// Aggregate counters and timings.
    pub stats: ReportStats,
}

/// Aggregate statistics for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportStats {
    /// Chat-completion requests issued (including agent-loop turns).
    pub llm_calls: usize,

    /// Web searches executed across both research steps.
    pub search_calls: usize,

    pub total_input_tokens: u64,
    pub total_output_tokens: u64,

    pub analysis_duration_ms: u64,
    pub trends_duration_ms: u64,
    pub competitors_duration_ms: u64,
    pub synthesis_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_round_trips_through_json() {
        let output = ReportOutput {
            markdown: "# Report\n".into(),
            analysis: "analysis".into(),
            market_trends: "trends".into(),
            competitive_landscape: "competitors".into(),
            stats: ReportStats {
                llm_calls: 6,
                search_calls: 5,
                total_input_tokens: 12_000,
                total_output_tokens: 3_400,
                ..Default::default()
            },
        };

        let json = serde_json::to_string_pretty(&output).unwrap();
        let back: ReportOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.markdown, output.markdown);
        assert_eq!(back.stats.llm_calls, 6);
        assert_eq!(back.stats.search_calls, 5);
    }
}
