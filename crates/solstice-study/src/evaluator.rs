//! Per-(claim, document) evaluation with quote verification.
//!
//! The evaluator asks the model for verbatim supporting quotes, reasoning,
//! and a verdict, then refuses to trust quotes it cannot find in the
//! document text. A failed quote gets one corrective re-ask; if the model
//! still cannot produce verifiable quotes the verdict collapses to
//! `insufficient` with zero confidence.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::ResponsesClient;
use crate::error::{Result, StudyError};
use crate::reader::{DocumentReader, OutputFormat};

/// Verdict on a claim against one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The document supports the claim
    Supports,
    /// The document contradicts the claim
    DoesNotSupport,
    /// The document does not settle the claim
    Insufficient,
}

impl Verdict {
    fn parse(s: &str) -> Self {
        match s.to_lowercase().replace('-', "_").as_str() {
            "supports" | "support" | "supported" => Self::Supports,
            "does_not_support" | "contradicts" | "refutes" => Self::DoesNotSupport,
            _ => Self::Insufficient,
        }
    }
}

/// A verified verbatim quote with its character span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEvidence {
    /// Verbatim quote from the document text
    pub quote: String,
    /// Why this quote bears on the claim
    pub explanation: String,
    /// Start character offset in the concatenated document text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// End character offset (exclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// Figure/table evidence reported by a vision-capable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEvidence {
    /// Figure crop filename
    pub filename: String,
    /// Why the figure bears on the claim
    pub reasoning: String,
}

/// Final evaluation of one claim against one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Verdict after quote verification
    pub verdict: Verdict,
    /// Model confidence in `[0, 1]` (zeroed when verification fails)
    pub confidence: f64,
    /// Model reasoning
    pub reasoning: String,
    /// Verified quotes with character spans
    pub evidence: Vec<TextEvidence>,
    /// Figure evidence (not quote-verified)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_evidence: Vec<ImageEvidence>,
}

/// Evaluator configuration.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Model requested from the gateway
    pub model: String,
    /// Sampling temperature (0 for reproducible studies)
    pub temperature: f64,
    /// Include figure placeholders in the document view
    pub include_figures: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            include_figures: true,
        }
    }
}

/// Claim evaluator over a shared gateway client.
pub struct ClaimEvaluator {
    client: Arc<dyn ResponsesClient>,
    config: EvaluatorConfig,
}

impl ClaimEvaluator {
    /// Create an evaluator over the shared gateway client.
    #[must_use = "returns the constructed evaluator"]
    pub fn new(client: Arc<dyn ResponsesClient>, config: EvaluatorConfig) -> Self {
        Self { client, config }
    }

    /// Evaluate one claim against one document.
    ///
    /// # Errors
    ///
    /// Returns an error when the gateway call fails or the model's answer
    /// cannot be parsed even once.
    pub async fn evaluate(&self, claim: &str, reader: &DocumentReader) -> Result<Evaluation> {
        let format = if self.config.include_figures {
            OutputFormat::TextWithPlaceholders
        } else {
            OutputFormat::TextOnly
        };
        let document_text = reader.full_text(format);

        let first = self
            .ask(claim, &document_text, None)
            .await?;
        let failed = unverifiable_quotes(&first, &document_text);
        let final_answer = if failed.is_empty() {
            first
        } else {
            info!(
                failed = failed.len(),
                "quotes failed verification, asking for corrections"
            );
            let corrected = self.ask(claim, &document_text, Some(failed.as_slice())).await?;
            let still_failed = unverifiable_quotes(&corrected, &document_text);
            if still_failed.is_empty() {
                corrected
            } else {
                warn!("corrected quotes still unverifiable, returning insufficient");
                return Ok(Evaluation {
                    verdict: Verdict::Insufficient,
                    confidence: 0.0,
                    reasoning: format!(
                        "Quote verification failed: {} quote(s) could not be found in the document.",
                        still_failed.len()
                    ),
                    evidence: Vec::new(),
                    image_evidence: corrected.image_evidence,
                });
            }
        };

        Ok(enrich_offsets(final_answer, reader, &document_text))
    }

    /// One round trip to the gateway: initial ask or corrective re-ask.
    async fn ask(
        &self,
        claim: &str,
        document_text: &str,
        failed_quotes: Option<&[String]>,
    ) -> Result<Evaluation> {
        let input = match failed_quotes {
            None => format!(
                "CLAIM:\n{claim}\n\nDOCUMENT:\n{document_text}\n\nEvaluate the claim against the document. Return valid JSON only."
            ),
            Some(failed) => format!(
                "CLAIM:\n{claim}\n\nDOCUMENT:\n{document_text}\n\nYour previous answer contained quotes that are NOT verbatim \
                 substrings of the document:\n{}\n\nRe-answer with corrected verbatim quotes. Return valid JSON only.",
                failed
                    .iter()
                    .map(|q| format!("- \"{q}\""))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        };

        let request = json!({
            "model": self.config.model,
            "instructions": EVALUATION_PROMPT,
            "input": input,
            "temperature": self.config.temperature,
        });

        let response = self.client.create(request).await?;
        let content = extract_output_text(&response).ok_or_else(|| {
            StudyError::BadResponse("response carries no output text".to_string())
        })?;
        parse_evaluation(&content)
    }
}

/// Quotes in `evaluation` that are not verbatim substrings of the text.
fn unverifiable_quotes(evaluation: &Evaluation, document_text: &str) -> Vec<String> {
    evaluation
        .evidence
        .iter()
        .filter(|e| !document_text.contains(e.quote.as_str()))
        .map(|e| e.quote.clone())
        .collect()
}

/// Attach character offsets to every verified quote.
fn enrich_offsets(
    mut evaluation: Evaluation,
    reader: &DocumentReader,
    document_text: &str,
) -> Evaluation {
    for evidence in &mut evaluation.evidence {
        if let Some((start, end)) = reader.locate_quote(document_text, &evidence.quote) {
            evidence.start = Some(start);
            evidence.end = Some(end);
        }
    }
    evaluation
}

/// Shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct RawEvaluation {
    verdict: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    supporting_quotes: Vec<RawQuote>,
    #[serde(default)]
    image_evidence: Vec<ImageEvidence>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    quote: String,
    #[serde(default)]
    explanation: String,
}

/// Parse the model's JSON answer (possibly fenced) into an evaluation.
fn parse_evaluation(content: &str) -> Result<Evaluation> {
    let json_text = extract_json(content);
    let raw: RawEvaluation = serde_json::from_str(&json_text)
        .map_err(|e| StudyError::BadResponse(format!("{e}: {json_text}")))?;

    Ok(Evaluation {
        verdict: Verdict::parse(&raw.verdict),
        confidence: raw.confidence.clamp(0.0, 1.0),
        reasoning: raw.reasoning,
        evidence: raw
            .supporting_quotes
            .into_iter()
            .map(|q| TextEvidence {
                quote: q.quote,
                explanation: q.explanation,
                start: None,
                end: None,
            })
            .collect(),
        image_evidence: raw.image_evidence,
    })
}

/// Pull the generated text out of a Responses API body.
fn extract_output_text(response: &Value) -> Option<String> {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let output = response.get("output")?.as_array()?;
    let mut combined = String::new();
    for item in output {
        let Some(content) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in content {
            let is_text = part
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t == "output_text" || t == "text");
            if is_text {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    combined.push_str(text);
                }
            }
        }
    }
    (!combined.is_empty()).then_some(combined)
}

/// Strip a markdown fence (or surrounding prose) from a JSON answer.
fn extract_json(text: &str) -> String {
    let text = text.trim();

    if text.starts_with("```") {
        if let Some(start) = text.find('\n') {
            let after_fence = &text[start + 1..];
            if let Some(end) = after_fence.rfind("```") {
                return after_fence[..end].trim().to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

const EVALUATION_PROMPT: &str = r#"You are a meticulous fact-checker. Evaluate whether the DOCUMENT supports the CLAIM.

OUTPUT JSON SCHEMA:
{
  "verdict": "<supports|does_not_support|insufficient>",
  "confidence": <0.0-1.0>,
  "reasoning": "<step-by-step reasoning>",
  "supporting_quotes": [
    {"quote": "<VERBATIM substring of the document>", "explanation": "<why it matters>"}
  ],
  "image_evidence": [
    {"filename": "<figure filename from a placeholder>", "reasoning": "<why it matters>"}
  ]
}

RULES:
1. Quotes MUST be verbatim substrings of the document text, character for character.
2. Prefer short, precise quotes over long passages.
3. If the document does not address the claim, use verdict "insufficient" with no quotes.
4. Use "does_not_support" only when the document contradicts the claim.
5. Reference figures only via the [FIGURE ...] placeholder filenames.

Return ONLY valid JSON. No markdown, no explanation."#;
