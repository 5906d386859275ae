use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use statement_search_core::{
    extract_layout, CharacterNgramEmbedder, ExtractError, OcrClient, SearchOptions,
    StatementSearch,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct Received {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn transcribe(
    State(received): State<Received>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    received.requests.lock().await.push((authorization, body));

    Json(json!({
        "pages": [
            {"page": 1, "text": "1. Patch management\nVULN-1: Patches are applied within thirty days"}
        ]
    }))
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn serve_endpoint(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("endpoint should serve");
    });
    format!("http://{address}/ocr")
}

fn write_scanned_pdf(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, b"%PDF-1.4\n%scanned pages, no text layer")
}

#[tokio::test(flavor = "multi_thread")]
async fn unreadable_pdf_is_transcribed_by_the_endpoint() -> Result<(), Box<dyn std::error::Error>> {
    let received = Received::default();
    let endpoint = serve_endpoint(
        Router::new()
            .route("/ocr", post(transcribe))
            .with_state(received.clone()),
    )
    .await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scanned policy.pdf");
    write_scanned_pdf(&path)?;
    let ocr = OcrClient::new(endpoint, Some("secret".to_string()));

    let layout = tokio::task::spawn_blocking(move || extract_layout(&path, Some(&ocr))).await??;

    assert_eq!(layout.pages.len(), 1);
    assert!(layout.full_text().contains("VULN-1: Patches are applied"));
    assert!(layout.spans.is_empty());

    let requests = received.requests.lock().await;
    assert_eq!(requests.len(), 1);
    let (authorization, body) = &requests[0];
    assert_eq!(authorization.as_deref(), Some("Bearer secret"));
    assert_eq!(body["document"], "scanned policy");
    assert!(body["pdf_base64"]
        .as_str()
        .is_some_and(|encoded| !encoded.is_empty()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn search_answers_from_transcribed_documents() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = serve_endpoint(
        Router::new()
            .route("/ocr", post(transcribe))
            .with_state(Received::default()),
    )
    .await;

    let dir = tempfile::tempdir()?;
    write_scanned_pdf(&dir.path().join("scanned policy.pdf"))?;
    let search = StatementSearch::new(
        dir.path(),
        Arc::new(CharacterNgramEmbedder::default()),
        SearchOptions::default(),
    )?
    .with_ocr(OcrClient::new(endpoint, None));

    let answer =
        tokio::task::spawn_blocking(move || search.answer("how fast are patches applied")).await??;

    assert_eq!(answer.documents.len(), 1);
    assert_eq!(answer.documents[0].doc, "scanned policy");
    assert_eq!(
        answer.documents[0].reps,
        vec!["VULN-1 Patches are applied within thirty days".to_string()]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_endpoint_is_an_ocr_error() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = serve_endpoint(Router::new().route("/ocr", post(unavailable))).await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scanned policy.pdf");
    write_scanned_pdf(&path)?;
    let ocr = OcrClient::new(endpoint, None);

    let result = tokio::task::spawn_blocking(move || extract_layout(&path, Some(&ocr))).await?;

    assert!(matches!(result, Err(ExtractError::OcrFailed(_))));
    Ok(())
}
