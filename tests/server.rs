//! HTTP API tests against a live server on an ephemeral port.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use ocr_harness::config::Config;
use ocr_harness::extract::{ExtractError, OcrEngine, TextExtractor};
use ocr_harness::fingerprint::fingerprint_bytes;
use ocr_harness::ingest::Ingestor;
use ocr_harness::server::router;
use ocr_harness::service::DocumentService;
use ocr_harness::store::RecordStore;
use ocr_harness::summarize::Summarizer;

/// One page whose text is the input file's bytes.
struct EchoEngine;

#[async_trait]
impl OcrEngine for EchoEngine {
    async fn render_to_images(
        &self,
        pdf: &Path,
        _dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let page = out_dir.join("page-1.png");
        std::fs::copy(pdf, &page)?;
        Ok(vec![page])
    }

    async fn image_to_text(&self, image: &Path, _lang: &str) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(&std::fs::read(image)?).into_owned())
    }
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a server backed by a fresh store; returns its base URL.
async fn start_server(tmp: &TempDir) -> String {
    let cfg = Config::minimal(tmp.path().join("data/ocrh.sqlite"));
    let store = RecordStore::open(&cfg).await.unwrap();
    let extractor = TextExtractor::new(Arc::new(EchoEngine), 200, "eng");
    let summarizer = Summarizer::new(None, &cfg.summarization);
    let service = Arc::new(DocumentService::new(Ingestor::new(
        store, extractor, summarizer,
    )));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router(service)).await.ok();
    });

    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn submit_text(client: &reqwest::Client, base: &str, body: Value) -> (u16, Value) {
    let resp = client
        .post(format!("{}/documents", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_root_and_health() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let root: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(root["name"], "OCR Harness API");
}

#[tokio::test]
async fn test_submit_list_get_delete() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = submit_text(
        &client,
        &base,
        json!({ "filename": "test.pdf", "extracted_text": "This is test text" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["skipped"], false);
    assert!(body["summary"].is_null());
    let id = body["id"].as_i64().unwrap();

    let list: Value = client
        .get(format!("{}/documents?limit=5", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 1);
    assert_eq!(list["documents"][0]["preview"], "This is test text...");
    assert!(list["documents"][0].get("extracted_text").is_none());

    let record: Value = client
        .get(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["word_count"], 4);
    assert_eq!(record["character_length"], 17);
    assert_eq!(record["extracted_text"], "This is test text");

    let resp = client
        .delete(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "not_found");

    let resp = client
        .delete(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_duplicate_hash_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (_, first) = submit_text(
        &client,
        &base,
        json!({ "filename": "a.pdf", "extracted_text": "one", "content_hash": "H1" }),
    )
    .await;
    assert_eq!(first["skipped"], false);

    let (status, second) = submit_text(
        &client,
        &base,
        json!({ "filename": "b.pdf", "extracted_text": "two", "content_hash": "H1" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(second["success"], true);
    assert_eq!(second["skipped"], true);
    assert!(second["message"].as_str().unwrap().contains("already exists"));

    let dup: Value = client
        .get(format!("{}/check-duplicate/H1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dup["is_duplicate"], true);

    let stats: Value = client
        .get(format!("{}/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_records"], 1);
    assert_eq!(stats["total_words"], 1);
    assert_eq!(stats["total_characters"], 3);
}

#[tokio::test]
async fn test_pdf_upload_is_fingerprinted() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();
    let bytes = b"Scanned words here";
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

    let (status, body) = submit_text(
        &client,
        &base,
        json!({ "filename": "scan.pdf", "content_base64": encoded }),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    let id = body["id"].as_i64().unwrap();

    let record: Value = client
        .get(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["extracted_text"], "--- Page 1 ---\nScanned words here");
    assert_eq!(record["content_hash"], fingerprint_bytes(bytes));

    let dup: Value = client
        .get(format!("{}/check-duplicate/{}", base, fingerprint_bytes(bytes)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dup["is_duplicate"], true);

    let (_, again) = submit_text(
        &client,
        &base,
        json!({ "filename": "scan-copy.pdf", "content_base64": encoded }),
    )
    .await;
    assert_eq!(again["skipped"], true);
}

#[tokio::test]
async fn test_submit_validation() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = submit_text(&client, &base, json!({ "filename": "a.pdf" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = submit_text(
        &client,
        &base,
        json!({ "filename": "a.pdf", "extracted_text": "x", "content_base64": "eA==" }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = submit_text(
        &client,
        &base,
        json!({ "filename": "a.pdf", "content_base64": "not base64!" }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = submit_text(
        &client,
        &base,
        json!({ "filename": " ", "extracted_text": "x" }),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_summary_endpoints() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let (_, empty) = submit_text(
        &client,
        &base,
        json!({ "filename": "blank.pdf", "extracted_text": "" }),
    )
    .await;
    let (_, full) = submit_text(
        &client,
        &base,
        json!({ "filename": "doc.pdf", "extracted_text": "Short body text." }),
    )
    .await;

    let missing: Value = client
        .get(format!("{}/documents/missing-summary", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(missing["count"], 2);

    let resp = client
        .post(format!("{}/documents/{}/summary", base, empty["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/documents/999/summary", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // No LLM client configured: the summary is the (short) text itself.
    let resp = client
        .post(format!("{}/documents/{}/summary", base, full["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let update: Value = resp.json().await.unwrap();
    assert_eq!(update["success"], true);
    assert_eq!(update["summary"], "Short body text.");

    let missing: Value = client
        .get(format!("{}/documents/missing-summary", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(missing["count"], 1);
    assert_eq!(missing["documents"][0]["filename"], "blank.pdf");
}
