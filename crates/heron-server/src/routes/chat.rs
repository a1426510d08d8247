use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use heron::models::message::Message;
use heron::models::role::Role;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::state::AppState;

const GENERIC_FAILURE: &str = "the assistant was unable to complete the request";

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// Convert incoming messages to the internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::new();

    for msg in incoming {
        match msg.role.as_str() {
            "user" => {
                messages.push(Message::user().with_text(msg.content));
            }
            "assistant" => {
                messages.push(Message::assistant().with_text(msg.content));
            }
            _ => {
                warn!("Unknown role: {}", msg.role);
            }
        }
    }

    messages
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let messages = convert_messages(request.messages);
    if !matches!(messages.last().map(|m| m.role), Some(Role::User)) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "conversation must end with a user message".to_string(),
            }),
        ));
    }

    match state.agent.respond(&messages).await {
        Ok(reply) => Ok(Json(ChatResponse {
            response: reply.text(),
        })),
        Err(e) => {
            // Log the detail, return a generic failure to the client
            error!("chat turn failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: GENERIC_FAILURE.to_string(),
                }),
            ))
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use heron::agent::Agent;
    use heron::providers::configs::OpenAiProviderConfig;
    use heron::providers::openai::OpenAiProvider;
    use heron::tools::ToolRegistry;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_convert_messages_skips_unknown_roles() {
        let incoming = vec![
            IncomingMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            },
            IncomingMessage {
                role: "system".to_string(),
                content: "ignored".to_string(),
            },
            IncomingMessage {
                role: "assistant".to_string(),
                content: "Hi!".to_string(),
            },
        ];

        let messages = convert_messages(incoming);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "Hello");
        assert_eq!(messages[1].text(), "Hi!");
    }

    async fn state_for(mock_server: &MockServer) -> AppState {
        let provider = OpenAiProvider::new(OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            max_tokens: None,
        })
        .unwrap();

        AppState {
            agent: Arc::new(Agent::new(
                Box::new(provider),
                Arc::new(ToolRegistry::new(vec![])),
            )),
        }
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_chat_roundtrip() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hi there!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 3, "total_tokens": 6}
            })))
            .mount(&mock_server)
            .await;

        let app = configure(state_for(&mock_server).await);
        let response = app
            .oneshot(chat_request(
                json!({"messages": [{"role": "user", "content": "Hello"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["response"], "Hi there!");
    }

    #[tokio::test]
    async fn test_chat_failure_is_generic() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let app = configure(state_for(&mock_server).await);
        let response = app
            .oneshot(chat_request(
                json!({"messages": [{"role": "user", "content": "Hello"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        // Internal detail stays in the logs
        assert_eq!(json["error"], GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_conversation() {
        let mock_server = MockServer::start().await;
        let app = configure(state_for(&mock_server).await);

        let response = app
            .oneshot(chat_request(json!({"messages": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_rejects_conversation_ending_with_assistant() {
        let mock_server = MockServer::start().await;
        let app = configure(state_for(&mock_server).await);

        let response = app
            .oneshot(chat_request(json!({"messages": [
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi!"}
            ]})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
