//! # solstice-study
//!
//! Fan-out fact-checking studies over ingested documents.
//!
//! A study takes a claims file and a list of ingested document IDs and
//! evaluates every claim against every document through the LLM gateway.
//! Claim tasks run concurrently under a counting semaphore
//! (`max_concurrent_claims`); every evaluation's quotes are verified
//! against the document text before they count as evidence.
//!
//! Artifacts: a timestamped `study_results_*.json` with the full
//! structured output, and `consolidated_results.json` pooling each claim's
//! evidence across documents.

pub mod client;
pub mod consolidated;
pub mod error;
pub mod evaluator;
pub mod reader;
pub mod study;

pub use client::{HttpGatewayClient, ResponsesClient};
pub use consolidated::{consolidate, ConsolidatedClaim, ConsolidatedEvidence, ConsolidatedOutput};
pub use error::{Result, StudyError};
pub use evaluator::{
    ClaimEvaluator, Evaluation, EvaluatorConfig, ImageEvidence, TextEvidence, Verdict,
};
pub use reader::{BlockRecord, DocumentReader, FigurePayload, OutputFormat};
pub use study::{
    load_claims, persist_study, run_study, Claim, ClaimOutcome, DocumentEvaluation, StudyConfig,
    StudyMetadata, StudyResult, StudySummary,
};
