//! Routes, handlers and error mapping for the library API.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shelf_agent::QueryAdapter;
use shelf_core::{BookSummary, UserSummary};
use shelf_storage::{BorrowError, LibraryStore, StoreError};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    library: LibraryStore,
    adapter: QueryAdapter,
}

impl AppState {
    pub fn new(library: LibraryStore, adapter: QueryAdapter) -> Self {
        Self { library, adapter }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/users/", get(handle_get_users).post(handle_add_user))
        .route("/books/", get(handle_get_books).post(handle_add_book))
        .route("/borrow/", axum::routing::post(handle_borrow))
        .route("/question", get(handle_question))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP server for the library API.
pub struct ApiServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl ApiServer {
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        info!("Library API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Errors returned to API clients as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NameParams {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TitleParams {
    title: String,
}

#[derive(Debug, Deserialize)]
struct BorrowParams {
    username: String,
    title: String,
    /// Loan length; without it the book gets no due date
    days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct QuestionParams {
    question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question: String,
    pub answer: String,
}

/// Liveness message.
async fn handle_root() -> Json<MessageResponse> {
    MessageResponse::new("Library API is running")
}

async fn handle_get_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(state.library.get_users().await?))
}

async fn handle_get_books(
    State(state): State<AppState>,
) -> Result<Json<Vec<BookSummary>>, ApiError> {
    Ok(Json(state.library.get_books().await?))
}

async fn handle_add_user(
    State(state): State<AppState>,
    Query(params): Query<NameParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.library.add_user(&params.name).await?;
    Ok(MessageResponse::new(format!("User '{}' added", params.name)))
}

async fn handle_add_book(
    State(state): State<AppState>,
    Query(params): Query<TitleParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.library.add_book(&params.title).await?;
    Ok(MessageResponse::new(format!("Book '{}' added", params.title)))
}

/// Borrow a book. Every failure, including storage errors, is a 400.
async fn handle_borrow(
    State(state): State<AppState>,
    Query(params): Query<BorrowParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .library
        .borrow_book(&params.username, &params.title, params.days)
        .await
        .map_err(|e: BorrowError| {
            warn!("Borrow rejected: {}", e);
            ApiError::BadRequest(e.to_string())
        })?;

    Ok(MessageResponse::new(format!(
        "User '{}' borrowed '{}'",
        params.username, params.title
    )))
}

/// Natural-language question. Always 200; failures are in the answer text.
async fn handle_question(
    State(state): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> Json<QuestionResponse> {
    let answer = state.adapter.ask_text(&params.question).await;
    Json(QuestionResponse {
        question: params.question,
        answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use shelf_agent::{AgentError, SqlAgent};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct CannedAgent;

    #[async_trait]
    impl SqlAgent for CannedAgent {
        async fn run(&self, question: &str) -> shelf_agent::Result<String> {
            if question.contains("fail") {
                Err(AgentError::Api("model unavailable".to_string()))
            } else {
                Ok("There are 2 books.".to_string())
            }
        }
    }

    async fn create_test_app() -> (Router, LibraryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let library = LibraryStore::open(temp_dir.path().join("library.db"))
            .await
            .unwrap();
        let state = AppState::new(library.clone(), QueryAdapter::new(CannedAgent));
        (router(state), library, temp_dir)
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_root_is_alive() {
        let (app, _library, _dir) = create_test_app().await;
        let (status, body) = send(&app, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Library API is running");
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (app, _library, _dir) = create_test_app().await;

        let (status, body) = send(&app, Method::POST, "/users/?name=swadhi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User 'swadhi' added");

        let (status, body) = send(&app, Method::POST, "/books/?title=Heart%20Beat").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Book 'Heart Beat' added");

        let (_, users) = send(&app, Method::GET, "/users/").await;
        assert_eq!(users[0]["name"], "swadhi");
        assert_eq!(users[0]["borrowed"], serde_json::Value::Null);

        let (_, books) = send(&app, Method::GET, "/books/").await;
        assert_eq!(books[0]["title"], "Heart Beat");
        assert_eq!(books[0]["borrower"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_borrow_success_and_conflict() {
        let (app, library, _dir) = create_test_app().await;
        library.add_user("swadhi").await.unwrap();
        library.add_user("usha").await.unwrap();
        library.add_book("english").await.unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/borrow/?username=swadhi&title=english&days=5",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User 'swadhi' borrowed 'english'");

        let (status, body) =
            send(&app, Method::POST, "/borrow/?username=usha&title=english").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("already borrowed"));

        let (_, users) = send(&app, Method::GET, "/users/").await;
        assert_eq!(users[0]["borrowed"][0], "english");
        assert_eq!(users[1]["borrowed"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_borrow_unknown_user_is_bad_request() {
        let (app, library, _dir) = create_test_app().await;
        library.add_book("english").await.unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/borrow/?username=ghost_user&title=english&days=5",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "User: \"ghost_user\" does not exist");

        let books = library.get_books().await.unwrap();
        assert_eq!(books[0].borrower, None);
    }

    #[tokio::test]
    async fn test_missing_param_is_rejected() {
        let (app, _library, _dir) = create_test_app().await;
        let (status, _) = send(&app, Method::POST, "/users/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_question_answer_and_error_text() {
        let (app, _library, _dir) = create_test_app().await;

        let (status, body) =
            send(&app, Method::GET, "/question?question=how%20many%20books").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "how many books");
        assert_eq!(body["answer"], "There are 2 books.");

        let (status, body) = send(&app, Method::GET, "/question?question=please%20fail").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "error: API error: model unavailable");
    }

    #[test]
    fn test_store_error_maps_to_internal() {
        let err: ApiError = StoreError::NotFound("x".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
