//! Prompt templates for the report pipeline.
//!
//! Centralising every piece of model-facing text here serves two purposes:
//!
//! 1. **Single source of truth** — changing the report structure or the
//!    research instructions requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompts
//!    directly without calling a model, so a template regression (a dropped
//!    section heading, a lost placeholder) is caught immediately.

/// The five fixed section headings of the final report, in the order the
/// synthesis template demands them.
pub const REPORT_SECTIONS: [&str; 5] = [
    "## 1. Project Analysis",
    "## 2. Market Context",
    "## 3. Competitive Landscape",
    "## 4. TRL Roadmap",
    "## 5. Sources",
];

/// Name of the search tool as exposed to the model.
pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

/// Tool description shown to the model alongside the argument schema.
pub const WEB_SEARCH_TOOL_DESCRIPTION: &str =
    "Search the web for current information about technologies, markets, \
     companies, and research trends. Results are restricted to a curated list \
     of academic and business sources.";

/// Instruction sent when the search budget is exhausted and the model must
/// answer with whatever it has gathered so far.
pub const FINAL_ANSWER_NUDGE: &str =
    "The search budget for this task is exhausted. Do not request further \
     searches. Consolidate everything gathered so far into your final \
     structured summary now.";

// ── Step 2: paper analysis ───────────────────────────────────────────────

/// Build the single-shot analysis prompt embedding the full paper text.
pub fn analysis_prompt(paper: &str) -> String {
    format!(
        r#"You are an expert in scientific research analysis. Analyze the following paper and extract:

1. The core technology or solution
2. The specific problem it addresses
3. The methodology used
4. The innovative and disruptive potential
5. Relevant technical keywords

Paper to analyze:
{paper}

Provide a structured, concise analysis."#
    )
}

// ── Step 3: market-trend research ────────────────────────────────────────

/// System prompt for the market-trend research agent.
pub const TREND_RESEARCH_SYSTEM: &str = r#"You are a market analyst specialized in technology. Based on the paper analysis you are given, decide on 3-4 specific search queries to find:

1. Current market size and growth figures for this technology area
2. Recent funding and investment data
3. Emerging technologies in the same field
4. Current commercial applications and use cases

Use the web_search tool to run each query, then consolidate the findings into a structured summary. The summary MUST cite its sources as clickable Markdown links and MUST include the publication date of each source when available."#;

/// Build the user turn that seeds the trend-research agent.
pub fn trend_research_request(analysis: &str) -> String {
    format!(
        "Paper analysis:\n{analysis}\n\nRun searches to find relevant market trends and consolidate what you learn."
    )
}

// ── Step 4: competitive-landscape research ───────────────────────────────

/// System prompt for the competitive-landscape research agent.
pub const COMPETITOR_RESEARCH_SYSTEM: &str = r#"You are a competitive-intelligence analyst. Based on the paper analysis you are given, decide on 3-4 specific search queries to find:

1. Companies and startups working on similar technologies
2. Research centers and universities active in the same field
3. Potential strategic partners or direct competitors
4. Relevant intellectual property and patent activity

Use the web_search tool to run each query, then provide a structured analysis. Cite sources as clickable Markdown links with publication dates when available."#;

/// Build the user turn that seeds the competitor-research agent.
pub fn competitor_research_request(analysis: &str) -> String {
    format!(
        "Paper analysis:\n{analysis}\n\nSearch for information about the competitive landscape and consolidate what you learn."
    )
}

// ── Step 5: synthesis ────────────────────────────────────────────────────

/// Build the final synthesis prompt embedding the paper, the analysis, and
/// both research summaries, together with the rigid report template.
pub fn synthesis_prompt(paper: &str, analysis: &str, trends: &str, competitors: &str) -> String {
    format!(
        r#"You are an expert technology-transfer consultant. Based on all the information gathered below, produce a complete report following EXACTLY this Markdown structure:

# Technology Transfer Potential Report

## 1. Project Analysis

**Core Technology/Solution:**
* [Summary of the key technology identified in the paper]

**Problem Addressed:**
* [Description of the problem the research aims to solve]

**Intrinsic Innovative Potential:**
* [Assessment of the novelty and disruptive character of the proposal]

---

## 2. Market Context

**Relevant Market Trends:**
* [List of market trends identified, with figures where available]

**Related and Emerging Technologies:**
* [List of complementary or evolving technologies]

---

## 3. Competitive Landscape

**Key Market Players (Companies/Startups):**
* [List of potential competitors with a short description of each]

**Research Centers and Potential Academic Partners:**
* [List of universities or centers researching the same topics]

---

## 4. TRL Roadmap

**Current Maturity Assessment (Estimated TRL):**
* Based on the description, the current Technology Readiness Level is estimated at **TRL [X]**.
* Rationale: [Short explanation of why you estimate that TRL].

**Actionable Next Steps:**
1. **To reach TRL [X+1]:** [Concrete suggestion]
2. **To reach TRL [X+2]:** [Concrete suggestion]
3. **Key Questions to Resolve:** [Questions the researcher should answer to advance]

---

## 5. Sources

* [Every source cited in sections 2 and 3, as a clickable Markdown link with its publication date when known]

INFORMATION FOR THE ANALYSIS:

Original Paper:
{paper}

Internal Analysis:
{analysis}

Market Trends:
{trends}

Competitive Landscape:
{competitors}

Produce the complete report following exactly the structure above."#
    )
}
