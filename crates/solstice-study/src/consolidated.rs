//! Consolidated study output.
//!
//! One entry per claim, listing every piece of supporting evidence found
//! across the study's documents. Claims with no evidence anywhere are
//! omitted.

use serde::{Deserialize, Serialize};

use crate::study::StudyResult;

/// Consolidated evidence entry, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsolidatedEvidence {
    /// A verified quote
    Text {
        /// Verbatim quote
        quote: String,
        /// Why it supports the claim
        explanation: String,
        /// Document the quote came from
        document: String,
    },
    /// A figure or table
    Image {
        /// Figure crop filename
        filename: String,
        /// Why it supports the claim
        reasoning: String,
        /// Document the figure came from
        document: String,
    },
}

/// One claim with its pooled evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedClaim {
    /// Claim text
    pub claim: String,
    /// Evidence across all documents, in document input order
    pub evidence: Vec<ConsolidatedEvidence>,
}

/// The `consolidated_results.json` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedOutput {
    /// Study name
    pub study_name: String,
    /// Study finish timestamp (RFC 3339)
    pub timestamp: String,
    /// Claims that found evidence
    pub claims: Vec<ConsolidatedClaim>,
}

/// Build the consolidated view of a study result.
#[must_use = "returns the consolidated output"]
pub fn consolidate(result: &StudyResult) -> ConsolidatedOutput {
    let mut claims = Vec::new();

    for outcome in &result.claims {
        let mut evidence = Vec::new();
        for doc in &outcome.documents {
            let Some(evaluation) = &doc.evaluation else {
                continue;
            };
            for text in &evaluation.evidence {
                evidence.push(ConsolidatedEvidence::Text {
                    quote: text.quote.clone(),
                    explanation: text.explanation.clone(),
                    document: doc.document_id.clone(),
                });
            }
            for image in &evaluation.image_evidence {
                evidence.push(ConsolidatedEvidence::Image {
                    filename: image.filename.clone(),
                    reasoning: image.reasoning.clone(),
                    document: doc.document_id.clone(),
                });
            }
        }

        if !evidence.is_empty() {
            claims.push(ConsolidatedClaim {
                claim: outcome.claim.clone(),
                evidence,
            });
        }
    }

    ConsolidatedOutput {
        study_name: result.metadata.study_name.clone(),
        timestamp: result.metadata.finished_at.clone(),
        claims,
    }
}
