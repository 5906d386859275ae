use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use statement_search_core::{DocumentMatches, SearchError, StatementSearch};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<StatementSearch>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionForm {
    #[serde(default)]
    pub question: String,
}

/// Field names are what the chat page reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub question: String,
    pub reponses: Vec<DocumentMatches>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/requestMapping", post(ask))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health() -> &'static str {
    "ok"
}

/// POST /requestMapping - rank documents, then statements, for one question.
pub async fn ask(
    State(state): State<AppState>,
    Form(form): Form<QuestionForm>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let search = state.search.clone();
    let question = form.question;

    let answer = tokio::task::spawn_blocking(move || search.answer(&question))
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("search task failed: {error}"),
            )
        })?
        .map_err(error_response)?;

    Ok(Json(ChatResponse {
        question: answer.question,
        reponses: answer.documents,
    }))
}

fn error_response(error: SearchError) -> (StatusCode, String) {
    match error {
        SearchError::EmptyQuestion => (StatusCode::BAD_REQUEST, "Question is required".to_string()),
        other => {
            tracing::error!(error = %other, "search failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}
