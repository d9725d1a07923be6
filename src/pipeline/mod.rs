//! Pipeline stages for report generation.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap an
//! implementation (e.g. a different extraction backend) without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ analyze ──▶ research ──▶ research ──▶ synthesize ──▶ postprocess
//! (pdfium)    (1 LLM      (trends,     (competitors, (1 LLM call,   (cleanup)
//!              call)       agent loop)  agent loop)   template)
//! ```
//!
//! 1. [`extract`] — pull plain text out of the PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`agent`]   — the bounded tool-use loop driving both research steps;
//!    the only stage that touches the search API
//! 3. [`postprocess`] — deterministic text cleanup of the synthesised
//!    report (fences, line endings, blank lines)
//!
//! The analyze and synthesize steps are single completion requests; they
//! live in [`crate::report`] next to the step sequencing.

pub mod agent;
pub mod extract;
pub mod postprocess;
