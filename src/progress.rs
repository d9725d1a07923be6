//! Progress-callback trait for per-step pipeline events.
//!
//! Inject an [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through its four steps. Callers
//! can forward events to a terminal spinner, a log, or a web socket without
//! the library knowing how the host application communicates.

use std::fmt;
use std::sync::Arc;

/// The four LLM-driven pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStep {
    Analysis,
    MarketResearch,
    CompetitorResearch,
    Synthesis,
}

impl ReportStep {
    /// Total number of steps, for "step N of M" displays.
    pub const COUNT: usize = 4;

    /// 1-based position of this step.
    pub fn index(&self) -> usize {
        match self {
            ReportStep::Analysis => 1,
            ReportStep::MarketResearch => 2,
            ReportStep::CompetitorResearch => 3,
            ReportStep::Synthesis => 4,
        }
    }

    /// Human-readable activity label.
    pub fn label(&self) -> &'static str {
        match self {
            ReportStep::Analysis => "Analyzing paper content",
            ReportStep::MarketResearch => "Researching market trends",
            ReportStep::CompetitorResearch => "Mapping the competitive landscape",
            ReportStep::Synthesis => "Writing the final report",
        }
    }
}

impl fmt::Display for ReportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`.
pub trait ReportProgressCallback: Send + Sync {
    /// Called just before a step's first LLM request.
    fn on_step_start(&self, step: ReportStep) {
        let _ = step;
    }

    /// Called when a step finishes, with the byte length of its output.
    fn on_step_complete(&self, step: ReportStep, output_len: usize) {
        let _ = (step, output_len);
    }

    /// Called each time a research step issues a web search.
    fn on_search(&self, step: ReportStep, query: &str) {
        let _ = (step, query);
    }

    /// Called when a web search fails. The failure is absorbed into the
    /// agent's context, so this is informational only.
    fn on_search_failed(&self, step: ReportStep, query: &str, error: String) {
        let _ = (step, query, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        steps: Arc<AtomicUsize>,
        searches: Arc<AtomicUsize>,
        failures: Arc<AtomicUsize>,
    }

    impl ReportProgressCallback for TrackingCallback {
        fn on_step_start(&self, _step: ReportStep) {
            self.steps.fetch_add(1, Ordering::SeqCst);
        }

        fn on_search(&self, _step: ReportStep, _query: &str) {
            self.searches.fetch_add(1, Ordering::SeqCst);
        }

        fn on_search_failed(&self, _step: ReportStep, _query: &str, _error: String) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn steps_are_ordered_one_to_four() {
        assert_eq!(ReportStep::Analysis.index(), 1);
        assert_eq!(ReportStep::MarketResearch.index(), 2);
        assert_eq!(ReportStep::CompetitorResearch.index(), 3);
        assert_eq!(ReportStep::Synthesis.index(), 4);
        assert_eq!(ReportStep::COUNT, 4);
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_step_start(ReportStep::Analysis);
        cb.on_step_complete(ReportStep::Synthesis, 42);
        cb.on_search(ReportStep::MarketResearch, "solar cell market size");
        cb.on_search_failed(
            ReportStep::CompetitorResearch,
            "competitors",
            "timeout".to_string(),
        );
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            steps: Arc::new(AtomicUsize::new(0)),
            searches: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(AtomicUsize::new(0)),
        };

        tracker.on_step_start(ReportStep::Analysis);
        tracker.on_step_start(ReportStep::MarketResearch);
        tracker.on_search(ReportStep::MarketResearch, "q1");
        tracker.on_search(ReportStep::MarketResearch, "q2");
        tracker.on_search_failed(ReportStep::MarketResearch, "q3", "quota".into());

        assert_eq!(tracker.steps.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.searches.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ReportProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_step_start(ReportStep::Analysis);
        cb.on_step_complete(ReportStep::Analysis, 512);
    }
}
