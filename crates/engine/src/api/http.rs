//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use salon_domain::{Message, Participant, Room, RoomId, SetupResponse};

use crate::app::App;
use crate::infrastructure::ports::{LlmError, RepoError};
use crate::prompts::Locale;
use crate::use_cases::EngineError;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/rooms", post(create_room).get(list_rooms))
        .route("/api/rooms/{id}", get(get_room))
        .route(
            "/api/rooms/{id}/messages",
            post(post_message).get(list_messages),
        )
}

async fn health() -> &'static str {
    "OK"
}

fn locale_from(headers: &HeaderMap) -> Locale {
    headers
        .get(axum::http::header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(Locale::from_accept_language)
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    user_input: Option<String>,
    focus: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomResponse {
    room_id: RoomId,
    setup: SetupResponse,
}

async fn create_room(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let user_input = body
        .user_input
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("userInput is required".to_string()))?;

    let outcome = app
        .setup_room
        .execute(user_input, body.focus.as_deref(), locale_from(&headers))
        .await?;

    Ok(Json(CreateRoomResponse {
        room_id: outcome.room.id,
        setup: outcome.setup,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomSummary {
    id: RoomId,
    focus: Option<String>,
    participants: Vec<Participant>,
    status: &'static str,
    message_count: usize,
}

#[derive(Debug, Serialize)]
struct ListRoomsResponse {
    rooms: Vec<RoomSummary>,
}

const ROOM_LIST_LIMIT: u32 = 20;

async fn list_rooms(State(app): State<Arc<App>>) -> Result<Json<ListRoomsResponse>, ApiError> {
    let rooms = app.store.list_rooms(ROOM_LIST_LIMIT).await?;
    let rooms = rooms
        .into_iter()
        .map(|room| RoomSummary {
            id: room.id,
            focus: room.topic.clone(),
            status: room.state.status.as_str(),
            message_count: room.messages.len(),
            participants: room.participants,
        })
        .collect();
    Ok(Json(ListRoomsResponse { rooms }))
}

async fn get_room(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, ApiError> {
    let room = app.store.get_room(RoomId::from_uuid(id)).await?;
    Ok(Json(room))
}

#[derive(Debug, Deserialize)]
struct PostMessageRequest {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessageResponse {
    responses: Vec<Message>,
}

async fn post_message(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, ApiError> {
    let content = body
        .content
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("content is required".to_string()))?;

    let room_id = RoomId::from_uuid(id);

    // One turn at a time per room.
    let lock = app.turn_lock(room_id);
    let result = {
        let _guard = lock.lock().await;
        app.process_message
            .execute(room_id, content, locale_from(&headers))
            .await
    };
    drop(lock);
    app.release_turn_lock(room_id);

    Ok(Json(PostMessageResponse { responses: result? }))
}

#[derive(Debug, Serialize)]
struct ListMessagesResponse {
    messages: Vec<Message>,
}

async fn list_messages(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListMessagesResponse>, ApiError> {
    let messages = app.store.list_messages(RoomId::from_uuid(id)).await?;
    Ok(Json(ListMessagesResponse { messages }))
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Llm(LlmError),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => {
                (axum::http::StatusCode::NOT_FOUND, "Not found").into_response()
            }
            ApiError::BadRequest(msg) => {
                (axum::http::StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::Llm(e) => (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "LLM service error",
                    "code": e.code(),
                    "details": e.to_string(),
                })),
            )
                .into_response(),
            ApiError::Internal(_) => (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
            )
                .into_response(),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Llm(llm) => ApiError::Llm(llm),
            EngineError::Repo(repo) => repo.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::app_config::EngineConfig;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::persistence::InMemoryRoomStore;
    use crate::infrastructure::ports::{GenerateRequest, LlmPort};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct AlwaysFailingLlm(LlmError);

    #[async_trait]
    impl LlmPort for AlwaysFailingLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
            Err(self.0.clone())
        }
    }

    fn test_app(llm_error: LlmError) -> Router {
        let app = Arc::new(App::new(
            Arc::new(AlwaysFailingLlm(llm_error)),
            Arc::new(InMemoryRoomStore::new()),
            Arc::new(SystemClock),
            EngineConfig::default(),
        ));
        routes().with_state(app)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let router = test_app(LlmError::Connection("down".into()));
        let response = router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_room_requires_user_input() {
        let router = test_app(LlmError::Connection("down".into()));
        let response = router
            .oneshot(json_request("POST", "/api/rooms", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_room_uses_fallback_personas_when_backend_down() {
        let router = test_app(LlmError::Connection("down".into()));
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/rooms",
                serde_json::json!({ "userInput": "Einstein, Marie Curie" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let names: Vec<&str> = body["setup"]["participants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Einstein", "Marie Curie"]);
        assert!(body["roomId"].is_string());
    }

    #[tokio::test]
    async fn missing_model_surfaces_as_503_with_code() {
        let router = test_app(LlmError::ModelNotFound("qwen3".into()));
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/rooms",
                serde_json::json!({ "userInput": "Einstein" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["code"], "MODEL_NOT_FOUND");
        assert_eq!(body["error"], "LLM service error");
    }

    #[tokio::test]
    async fn message_to_unknown_room_is_404() {
        let router = test_app(LlmError::Connection("down".into()));
        let response = router
            .oneshot(json_request(
                "POST",
                &format!("/api/rooms/{}/messages", Uuid::new_v4()),
                serde_json::json!({ "content": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn turn_runs_against_created_room_even_when_backend_down() {
        let store = Arc::new(InMemoryRoomStore::new());
        let app = Arc::new(App::new(
            Arc::new(AlwaysFailingLlm(LlmError::Timeout("slow".into()))),
            store,
            Arc::new(SystemClock),
            EngineConfig::default(),
        ));
        let router = routes().with_state(app);

        let created = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/rooms",
                serde_json::json!({ "userInput": "Einstein" }),
            ))
            .await
            .unwrap();
        let room_id = body_json(created).await["roomId"]
            .as_str()
            .unwrap()
            .to_string();

        // Orchestration and reply both fall back, so the first persona answers.
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/rooms/{room_id}/messages"),
                serde_json::json!({ "content": "hello there" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let responses = body["responses"].as_array().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["author_name"], "Einstein");

        let listed = router
            .oneshot(
                Request::get(format!("/api/rooms/{room_id}/messages"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = body_json(listed).await;
        // setup system message + greeting + user message + reply
        assert_eq!(listed["messages"].as_array().unwrap().len(), 4);
    }
}
