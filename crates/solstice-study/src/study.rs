//! Study orchestration: bounded fan-out over claims × documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use solstice_core::{load_document, DocumentPaths};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::client::ResponsesClient;
use crate::error::{Result, StudyError};
use crate::evaluator::{ClaimEvaluator, Evaluation, EvaluatorConfig};
use crate::reader::DocumentReader;

/// One claim to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Stable claim identifier (assigned `claim_<NNN>` when absent)
    pub id: String,
    /// Claim text
    pub claim: String,
}

/// Claims-file shape: `{"claims": [{"id"?: str, "claim": str}, ...]}`.
#[derive(Debug, Deserialize)]
struct ClaimsFile {
    claims: Vec<RawClaim>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    #[serde(default)]
    id: Option<String>,
    claim: String,
}

/// Load claims, assigning `claim_<NNN>` IDs by index where missing.
///
/// # Errors
///
/// Returns [`StudyError::ClaimsFile`] when the file is unreadable or
/// malformed.
pub fn load_claims(path: &Path) -> Result<Vec<Claim>> {
    let bytes = std::fs::read(path)
        .map_err(|e| StudyError::ClaimsFile(format!("{}: {e}", path.display())))?;
    let file: ClaimsFile = serde_json::from_slice(&bytes)
        .map_err(|e| StudyError::ClaimsFile(format!("{}: {e}", path.display())))?;

    Ok(file
        .claims
        .into_iter()
        .enumerate()
        .map(|(i, raw)| Claim {
            id: raw.id.unwrap_or_else(|| format!("claim_{i:03}")),
            claim: raw.claim,
        })
        .collect())
}

/// Study configuration.
#[derive(Debug, Clone)]
pub struct StudyConfig {
    /// Study name recorded in artifacts
    pub study_name: String,
    /// Ingestion cache root the documents live under
    pub cache_root: PathBuf,
    /// Directory study artifacts are written to
    pub output_dir: PathBuf,
    /// Bound on concurrently evaluating claims (default 3)
    pub max_concurrent_claims: usize,
    /// Evaluator settings shared by every task
    pub evaluator: EvaluatorConfig,
}

impl StudyConfig {
    /// Defaults for a study rooted at the given directories.
    #[must_use = "returns the study configuration"]
    pub fn new(study_name: String, cache_root: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            study_name,
            cache_root,
            output_dir,
            max_concurrent_claims: 3,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

/// Outcome for one (claim, document) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEvaluation {
    /// Document the claim was evaluated against
    pub document_id: String,
    /// Whether the evaluation completed
    pub success: bool,
    /// The evaluation, when successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    /// Error message, when not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentEvaluation {
    /// Number of evidence items (text plus image) this pair produced.
    #[must_use = "returns the evidence count"]
    pub fn evidence_count(&self) -> usize {
        self.evaluation
            .as_ref()
            .map(|e| e.evidence.len() + e.image_evidence.len())
            .unwrap_or(0)
    }
}

/// All outcomes for one claim, in document input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOutcome {
    /// Claim identifier
    pub claim_id: String,
    /// Claim text
    pub claim: String,
    /// Per-document outcomes
    pub documents: Vec<DocumentEvaluation>,
}

/// Study-level counters and coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    /// Total claim-document pairs attempted
    pub total_pairs: usize,
    /// Pairs whose evaluation completed
    pub successful_pairs: usize,
    /// Per-claim coverage: `complete`, `partial`, or `none`
    pub coverage: BTreeMap<String, String>,
    /// Mean evidence items per claim (across its documents)
    pub average_evidence_per_claim: f64,
    /// Claims that produced no evidence anywhere
    pub claims_with_no_evidence: Vec<String>,
}

/// Study run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMetadata {
    /// Study name
    pub study_name: String,
    /// Claims file the run consumed
    pub claims_file: String,
    /// Documents evaluated, in input order
    pub document_ids: Vec<String>,
    /// RFC 3339 start timestamp
    pub started_at: String,
    /// RFC 3339 finish timestamp
    pub finished_at: String,
}

/// Full structured output of a study; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyResult {
    /// Run metadata
    pub metadata: StudyMetadata,
    /// Per-claim outcomes in claim input order
    pub claims: Vec<ClaimOutcome>,
    /// Aggregated summary
    pub summary: StudySummary,
}

/// Run a study: evaluate every claim against every document with at most
/// `max_concurrent_claims` claims in flight.
///
/// Per-claim failures are recorded and do not abort the run; document
/// ordering inside each claim follows `document_ids`.
///
/// # Errors
///
/// Fails only on study-level problems: unreadable claims file or a
/// document ID with no ingested `content.json`.
pub async fn run_study(
    claims_path: &Path,
    document_ids: &[String],
    client: Arc<dyn ResponsesClient>,
    config: &StudyConfig,
) -> Result<StudyResult> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let claims = load_claims(claims_path)?;
    info!(
        study = %config.study_name,
        claims = claims.len(),
        documents = document_ids.len(),
        max_concurrent = config.max_concurrent_claims,
        "starting study"
    );

    // Load every document once; readers are shared across claim tasks.
    let mut readers = Vec::with_capacity(document_ids.len());
    for doc_id in document_ids {
        let document = load_document(&config.cache_root, doc_id)
            .map_err(|_| StudyError::DocumentNotFound(doc_id.clone()))?;
        let paths = DocumentPaths::new(&config.cache_root, doc_id);
        readers.push((
            doc_id.clone(),
            DocumentReader::new(document, paths.extracted_dir()),
        ));
    }
    let readers = Arc::new(readers);

    let evaluator = Arc::new(ClaimEvaluator::new(client, config.evaluator.clone()));
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_claims.max(1)));

    let mut handles = Vec::with_capacity(claims.len());
    for claim in &claims {
        let claim = claim.clone();
        let readers = Arc::clone(&readers);
        let evaluator = Arc::clone(&evaluator);
        let semaphore = Arc::clone(&semaphore);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            evaluate_claim(&claim, &readers, &evaluator).await
        }));
    }

    // Collect in claim input order.
    let mut outcomes = Vec::with_capacity(handles.len());
    for (claim, handle) in claims.iter().zip(handles) {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(claim = %claim.id, error = %e, "claim task panicked");
                outcomes.push(ClaimOutcome {
                    claim_id: claim.id.clone(),
                    claim: claim.claim.clone(),
                    documents: vec![],
                });
            }
        }
    }

    let summary = summarize(&outcomes, document_ids.len());
    let finished_at = chrono::Utc::now().to_rfc3339();

    Ok(StudyResult {
        metadata: StudyMetadata {
            study_name: config.study_name.clone(),
            claims_file: claims_path.display().to_string(),
            document_ids: document_ids.to_vec(),
            started_at,
            finished_at,
        },
        claims: outcomes,
        summary,
    })
}

/// Evaluate one claim against every document, capturing failures.
async fn evaluate_claim(
    claim: &Claim,
    readers: &[(String, DocumentReader)],
    evaluator: &ClaimEvaluator,
) -> ClaimOutcome {
    let mut documents = Vec::with_capacity(readers.len());
    for (doc_id, reader) in readers {
        match evaluator.evaluate(&claim.claim, reader).await {
            Ok(evaluation) => documents.push(DocumentEvaluation {
                document_id: doc_id.clone(),
                success: true,
                evaluation: Some(evaluation),
                error: None,
            }),
            Err(e) => {
                error!(claim = %claim.id, document = %doc_id, error = %e, "evaluation failed");
                documents.push(DocumentEvaluation {
                    document_id: doc_id.clone(),
                    success: false,
                    evaluation: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    ClaimOutcome {
        claim_id: claim.id.clone(),
        claim: claim.claim.clone(),
        documents,
    }
}

/// Compute the study summary.
fn summarize(outcomes: &[ClaimOutcome], document_count: usize) -> StudySummary {
    let total_pairs = outcomes.len() * document_count;
    let successful_pairs = outcomes
        .iter()
        .flat_map(|o| &o.documents)
        .filter(|d| d.success)
        .count();

    let mut coverage = BTreeMap::new();
    let mut claims_with_no_evidence = Vec::new();
    let mut total_evidence = 0usize;

    for outcome in outcomes {
        let with_evidence = outcome
            .documents
            .iter()
            .filter(|d| d.evidence_count() > 0)
            .count();
        total_evidence += outcome
            .documents
            .iter()
            .map(DocumentEvaluation::evidence_count)
            .sum::<usize>();

        let label = if document_count > 0 && with_evidence == document_count {
            "complete"
        } else if with_evidence > 0 {
            "partial"
        } else {
            "none"
        };
        coverage.insert(outcome.claim_id.clone(), label.to_string());
        if with_evidence == 0 {
            claims_with_no_evidence.push(outcome.claim_id.clone());
        }
    }

    let average_evidence_per_claim = if outcomes.is_empty() {
        0.0
    } else {
        total_evidence as f64 / outcomes.len() as f64
    };

    StudySummary {
        total_pairs,
        successful_pairs,
        coverage,
        average_evidence_per_claim,
        claims_with_no_evidence,
    }
}

/// Persist the study artifacts: `study_results_<timestamp>.json` plus
/// `consolidated_results.json`. Returns the timestamped path.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created or written.
pub fn persist_study(result: &StudyResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let results_path = output_dir.join(format!("study_results_{timestamp}.json"));
    write_pretty(&results_path, &serde_json::to_value(result).map_err(to_io)?)?;

    let consolidated = crate::consolidated::consolidate(result);
    let consolidated_path = output_dir.join("consolidated_results.json");
    write_pretty(
        &consolidated_path,
        &serde_json::to_value(&consolidated).map_err(to_io)?,
    )?;

    info!(
        results = %results_path.display(),
        consolidated = %consolidated_path.display(),
        "study artifacts written"
    );
    Ok(results_path)
}

fn write_pretty(path: &Path, value: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(to_io)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn to_io(e: serde_json::Error) -> StudyError {
    StudyError::Io(std::io::Error::other(e))
}
