//! Mention-extraction stage behavior: idempotence, resumability, and the
//! retry bound, all against a deterministic counting stub instead of a
//! live model.

use async_trait::async_trait;
use rivalry_pipeline::config::{self, Config};
use rivalry_pipeline::mentions::excerpt::BusinessSection;
use rivalry_pipeline::mentions::openai::{CompletionClient, CompletionError};
use rivalry_pipeline::mentions::{self, MentionRecord, Mentions};
use rivalry_pipeline::store::ArtifactStore;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Scripted completion endpoint: pops one canned outcome per call and
/// counts every call. Runs out -> answers NONE.
struct StubClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: AtomicUsize,
}

impl StubClient {
    fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok("NONE".to_string()),
        }
    }
}

fn server_error() -> CompletionError {
    CompletionError::Status {
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        body: "overloaded".to_string(),
    }
}

fn bad_request() -> CompletionError {
    CompletionError::Status {
        status: reqwest::StatusCode::BAD_REQUEST,
        body: "context length exceeded".to_string(),
    }
}

fn test_config() -> Config {
    Config {
        companies: config::roster()
            .into_iter()
            .filter(|c| c.ticker == "BKNG" || c.ticker == "EXPE")
            .collect(),
        start_year: 2020,
        end_year: 2020,
        openai_api_key: None,
        edgar_user_agent: None,
        data_dir: PathBuf::new(),
    }
}

fn filing_text(company_name: &str, body: &str) -> String {
    format!(
        "<SEC-HEADER>\n\
         CONFORMED SUBMISSION TYPE:\t10-K\n\
         CONFORMED PERIOD OF REPORT:\t20191231\n\
         FILED AS OF DATE:\t\t20200226\n\
         \tCOMPANY CONFORMED NAME:\t\t{company_name}\n\
         </SEC-HEADER>\n\
         <DOCUMENT><TYPE>10-K<TEXT><html><body>Item 1. Business. {body}</body></html></TEXT></DOCUMENT>"
    )
}

async fn seed_filings(store: &ArtifactStore, cfg: &Config) {
    for company in &cfg.companies {
        store
            .write_text(
                &store.filing_path(&company.ticker, 2020),
                &filing_text(&company.name, "We compete with other online travel brands."),
            )
            .await
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rerun_makes_no_calls_and_leaves_artifact_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let cfg = test_config();
    seed_filings(&store, &cfg).await;

    let stub = StubClient::new(vec![Ok("Expedia".into()), Ok("NONE".into())]);
    let first = mentions::run(&cfg, &store, &stub, &BusinessSection::default())
        .await
        .unwrap();
    assert_eq!(first.processed, 2);
    assert_eq!(stub.calls(), 2);

    let bytes_after_first = std::fs::read(store.mentions_path()).unwrap();

    let stub = StubClient::new(vec![]);
    let second = mentions::run(&cfg, &store, &stub, &BusinessSection::default())
        .await
        .unwrap();
    assert_eq!(stub.calls(), 0, "re-run must not spend API budget");
    assert_eq!(second.skipped, 2);

    let bytes_after_second = std::fs::read(store.mentions_path()).unwrap();
    assert_eq!(bytes_after_first, bytes_after_second);
}

#[tokio::test]
async fn partial_artifact_processes_only_the_missing_subset() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let cfg = test_config();
    seed_filings(&store, &cfg).await;

    // a record for BKNG already exists from an interrupted run
    let mut existing: Mentions = Default::default();
    existing.entry("BKNG".to_string()).or_default().insert(
        2020,
        MentionRecord {
            ticker: "BKNG".to_string(),
            year: 2020,
            mentioned: vec!["EXPE".to_string()],
            matched_names: vec!["expedia".to_string()],
            raw_response: "Expedia".to_string(),
            discarded: 0,
        },
    );
    store.write_json(&store.mentions_path(), &existing).await.unwrap();

    let stub = StubClient::new(vec![Ok("Booking Holdings".into())]);
    let summary = mentions::run(&cfg, &store, &stub, &BusinessSection::default())
        .await
        .unwrap();

    assert_eq!(stub.calls(), 1, "only EXPE's filing needed a call");
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);

    let merged: Mentions = store
        .read_json_if_present(&store.mentions_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged["BKNG"][&2020].mentioned, vec!["EXPE".to_string()]);
    assert_eq!(merged["EXPE"][&2020].mentioned, vec!["BKNG".to_string()]);
}

#[tokio::test]
async fn failures_below_the_retry_cap_still_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let mut cfg = test_config();
    cfg.companies.retain(|c| c.ticker == "BKNG");
    seed_filings(&store, &cfg).await;

    let stub = StubClient::new(vec![
        Err(server_error()),
        Err(CompletionError::RateLimited),
        Ok("Expedia".into()),
    ]);
    let summary = mentions::run(&cfg, &store, &stub, &BusinessSection::default())
        .await
        .unwrap();

    assert_eq!(stub.calls(), 3);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);

    let artifact: Mentions = store
        .read_json_if_present(&store.mentions_path())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact["BKNG"][&2020].mentioned, vec!["EXPE".to_string()]);
}

#[tokio::test]
async fn exhausted_retries_record_zero_mentions_and_continue() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let cfg = test_config();
    seed_filings(&store, &cfg).await;

    // BKNG exhausts the three attempts; EXPE succeeds afterwards
    let stub = StubClient::new(vec![
        Err(server_error()),
        Err(server_error()),
        Err(server_error()),
        Ok("Booking Holdings".into()),
    ]);
    let summary = mentions::run(&cfg, &store, &stub, &BusinessSection::default())
        .await
        .unwrap();

    assert_eq!(stub.calls(), 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);

    let artifact: Mentions = store
        .read_json_if_present(&store.mentions_path())
        .await
        .unwrap()
        .unwrap();
    assert!(artifact["BKNG"][&2020].mentioned.is_empty());
    assert_eq!(artifact["EXPE"][&2020].mentioned, vec!["BKNG".to_string()]);
}

#[tokio::test]
async fn rejected_credential_aborts_without_retries_or_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let cfg = test_config();
    seed_filings(&store, &cfg).await;

    let stub = StubClient::new(vec![Err(CompletionError::Unauthorized(
        reqwest::StatusCode::UNAUTHORIZED,
    ))]);
    let result = mentions::run(&cfg, &store, &stub, &BusinessSection::default()).await;

    assert!(result.is_err(), "a bad key must abort the stage");
    assert_eq!(stub.calls(), 1, "a bad key must not be retried");
    assert!(
        !store.exists(&store.mentions_path()),
        "no zero-mention records may be persisted under a bad key"
    );
}

#[tokio::test]
async fn non_transient_failures_are_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let cfg = test_config();
    seed_filings(&store, &cfg).await;

    // BKNG's filing draws a 4xx; EXPE's succeeds on its single attempt
    let stub = StubClient::new(vec![Err(bad_request()), Ok("Booking Holdings".into())]);
    let summary = mentions::run(&cfg, &store, &stub, &BusinessSection::default())
        .await
        .unwrap();

    assert_eq!(stub.calls(), 2, "a 4xx burns exactly one attempt");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);

    let artifact: Mentions = store
        .read_json_if_present(&store.mentions_path())
        .await
        .unwrap()
        .unwrap();
    assert!(artifact["BKNG"][&2020].mentioned.is_empty());
    assert_eq!(artifact["EXPE"][&2020].mentioned, vec!["BKNG".to_string()]);
}
