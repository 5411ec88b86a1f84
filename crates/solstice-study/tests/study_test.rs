//! End-to-end study orchestration tests over a scripted gateway client.

use async_trait::async_trait;
use serde_json::{json, Value};
use solstice_core::{
    write_json_pretty, Block, BlockRole, BoundingBox, Document, DocumentMetadata, DocumentPaths,
    PipelineMetadata,
};
use solstice_study::{
    consolidate, persist_study, run_study, ResponsesClient, Result, StudyConfig,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Client double that answers every request with a fixed supporting quote
/// and tracks how many claim evaluations are in flight at once.
struct CountingClient {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    quote: String,
}

impl CountingClient {
    fn new(quote: &str) -> Arc<Self> {
        Arc::new(Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            quote: quote.to_string(),
        })
    }
}

#[async_trait]
impl ResponsesClient for CountingClient {
    async fn create(&self, _request: Value) -> Result<Value> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let answer = json!({
            "verdict": "supports",
            "confidence": 0.9,
            "reasoning": "stated in the text",
            "supporting_quotes": [{"quote": self.quote, "explanation": "verbatim"}]
        });
        Ok(json!({"output_text": answer.to_string()}))
    }
}

/// Write a minimal single-block document into the cache layout.
fn seed_document(cache_root: &Path, doc_id: &str, text: &str) {
    let document = Document {
        source_pdf: format!("{doc_id}.pdf"),
        blocks: vec![Block {
            id: "det_0_000".to_string(),
            page_index: 0,
            role: BlockRole::Text,
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 50.0).unwrap(),
            text: Some(text.to_string()),
            image_path: None,
            metadata: BTreeMap::new(),
        }],
        reading_order: vec![vec!["det_0_000".to_string()]],
        metadata: DocumentMetadata {
            total_pages: 1,
            detection_dpi: 400,
            pipeline: "clinical".to_string(),
        },
        pipeline_metadata: PipelineMetadata {
            raw_detection_count: 1,
            after_consolidation_count: 1,
            final_block_count: 1,
            id_format: PipelineMetadata::standard_id_format(),
        },
    };
    document.validate().unwrap();
    let paths = DocumentPaths::new(cache_root, doc_id);
    write_json_pretty(&paths.content_json(), &document).unwrap();
}

fn seed_claims(path: &Path, count: usize) {
    let claims: Vec<Value> = (0..count)
        .map(|i| json!({"claim": format!("claim number {i}")}))
        .collect();
    std::fs::write(path, json!({"claims": claims}).to_string()).unwrap();
}

#[tokio::test]
async fn study_respects_the_concurrency_bound() {
    let dir = tempfile::tempdir().unwrap();
    let cache_root = dir.path().join("cache");
    seed_document(&cache_root, "doc_a", "The efficacy was 92% overall.");

    let claims_path = dir.path().join("claims.json");
    seed_claims(&claims_path, 6);

    let client = CountingClient::new("efficacy was 92%");
    let mut config = StudyConfig::new(
        "bound-test".to_string(),
        cache_root,
        dir.path().join("out"),
    );
    config.max_concurrent_claims = 2;

    let result = run_study(
        &claims_path,
        &["doc_a".to_string()],
        client.clone(),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(result.claims.len(), 6);
    assert!(result.claims.iter().all(|c| c.documents[0].success));
    // Never more than max_concurrent_claims evaluations at once
    assert!(client.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn study_preserves_input_order_and_aggregates() {
    let dir = tempfile::tempdir().unwrap();
    let cache_root = dir.path().join("cache");
    seed_document(&cache_root, "doc_a", "The efficacy was 92% overall.");
    seed_document(&cache_root, "doc_b", "Unrelated content entirely.");

    let claims_path = dir.path().join("claims.json");
    seed_claims(&claims_path, 3);

    let client = CountingClient::new("efficacy was 92%");
    let config = StudyConfig::new(
        "order-test".to_string(),
        cache_root,
        dir.path().join("out"),
    );

    let documents = vec!["doc_a".to_string(), "doc_b".to_string()];
    let result = run_study(&claims_path, &documents, client, &config)
        .await
        .unwrap();

    // Claim order follows the input file
    let ids: Vec<&str> = result.claims.iter().map(|c| c.claim_id.as_str()).collect();
    assert_eq!(ids, vec!["claim_000", "claim_001", "claim_002"]);
    // Document order follows the input list
    for outcome in &result.claims {
        let docs: Vec<&str> = outcome
            .documents
            .iter()
            .map(|d| d.document_id.as_str())
            .collect();
        assert_eq!(docs, vec!["doc_a", "doc_b"]);
    }

    assert_eq!(result.summary.total_pairs, 6);
    assert_eq!(result.summary.successful_pairs, 6);

    // The quote only verifies against doc_a, so every claim is partial:
    // doc_b evaluations collapse to insufficient with no evidence.
    for outcome in &result.claims {
        assert_eq!(result.summary.coverage[&outcome.claim_id], "partial");
        let doc_b = &outcome.documents[1];
        let eval = doc_b.evaluation.as_ref().unwrap();
        assert!(eval.evidence.is_empty());
        assert_eq!(eval.confidence, 0.0);
    }
}

#[tokio::test]
async fn study_artifacts_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let cache_root = dir.path().join("cache");
    seed_document(&cache_root, "doc_a", "The efficacy was 92% overall.");

    let claims_path = dir.path().join("claims.json");
    seed_claims(&claims_path, 2);

    let client = CountingClient::new("efficacy was 92%");
    let output_dir = dir.path().join("out");
    let config = StudyConfig::new("persist-test".to_string(), cache_root, output_dir.clone());

    let result = run_study(&claims_path, &["doc_a".to_string()], client, &config)
        .await
        .unwrap();
    let results_path = persist_study(&result, &output_dir).unwrap();

    assert!(results_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("study_results_"));
    assert!(output_dir.join("consolidated_results.json").exists());

    let consolidated: Value = serde_json::from_slice(
        &std::fs::read(output_dir.join("consolidated_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(consolidated["study_name"], "persist-test");
    assert_eq!(consolidated["claims"].as_array().unwrap().len(), 2);
    assert_eq!(consolidated["claims"][0]["evidence"][0]["type"], "text");

    // Consolidation matches the library view
    let direct = consolidate(&result);
    assert_eq!(direct.claims.len(), 2);
}

#[tokio::test]
async fn missing_document_fails_the_study() {
    let dir = tempfile::tempdir().unwrap();
    let claims_path = dir.path().join("claims.json");
    seed_claims(&claims_path, 1);

    let client = CountingClient::new("q");
    let config = StudyConfig::new(
        "missing-doc".to_string(),
        dir.path().join("cache"),
        dir.path().join("out"),
    );

    let result = run_study(&claims_path, &["ghost".to_string()], client, &config).await;
    assert!(result.is_err());
}
