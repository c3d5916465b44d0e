//! Typed client for the Minddy cabinet REST backend
//!
//! One method per backend operation. Every call is a single attempt with no
//! retry and no timeout; failures surface to the caller as [`ApiError`].
//!
//! The client is an immutable value. Installing or dropping a session returns a
//! new client ([`ApiClient::with_session`], [`ApiClient::without_session`]), so
//! whoever owns the client owns the auth state.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    AuthResponse, FullProfile, IdentityAssertion, InitialQuestion, Persona, PersonaUpdate,
    PreviewChat, PreviewMessage, PreviewReply, ProfileDetails, ProfileUpdate, PublishResult,
    Session, SuggestField,
};

/// Header carrying the Telegram identity id next to the bearer token.
pub const IDENTITY_HEADER: &str = "X-Telegram-ID";

/// Title used when a preview chat is created without one.
pub const DEFAULT_CHAT_TITLE: &str = "Test Chat";

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Text suitable for showing to the user: the server's own message when
    /// there is one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Request { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuestionsRequest<'a> {
    questions: &'a [String],
}

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    field: SuggestField,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    suggestion: String,
}

#[derive(Debug, Serialize)]
struct CreateChatRequest<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    message: &'a str,
}

// ============================================================================
// ApiClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<Arc<Session>>,
}

impl ApiClient {
    /// Create a client without a session. A trailing slash on `base_url` is
    /// ignored.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            session: None,
        })
    }

    pub fn with_session(&self, session: Session) -> Self {
        Self {
            session: Some(Arc::new(session)),
            ..self.clone()
        }
    }

    pub fn without_session(&self) -> Self {
        Self {
            session: None,
            ..self.clone()
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    pub async fn authenticate(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<AuthResponse, ApiError> {
        let req = self
            .request(Method::POST, "/api/auth/telegram")
            .json(assertion);
        self.fetch(req).await
    }

    // ------------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------------

    pub async fn get_profile(&self) -> Result<FullProfile, ApiError> {
        self.fetch(self.request(Method::GET, "/api/profile")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<ProfileDetails, ApiError> {
        let req = self.request(Method::PUT, "/api/profile").json(update);
        self.fetch(req).await
    }

    // ------------------------------------------------------------------------
    // Persona
    // ------------------------------------------------------------------------

    pub async fn update_persona(&self, update: &PersonaUpdate) -> Result<Persona, ApiError> {
        let req = self.request(Method::PUT, "/api/ai-twin").json(update);
        self.fetch(req).await
    }

    /// Replace the ordered question list. Order of `questions` is preserved.
    pub async fn update_questions(
        &self,
        questions: &[String],
    ) -> Result<Vec<InitialQuestion>, ApiError> {
        let req = self
            .request(Method::PUT, "/api/ai-twin/questions")
            .json(&QuestionsRequest { questions });
        let list: Option<Vec<InitialQuestion>> = self.fetch(req).await?;
        Ok(list.unwrap_or_default())
    }

    pub async fn publish(&self) -> Result<PublishResult, ApiError> {
        self.fetch(self.request(Method::POST, "/api/ai-twin/publish"))
            .await
    }

    pub async fn unpublish(&self) -> Result<(), ApiError> {
        self.fetch_empty(self.request(Method::POST, "/api/ai-twin/unpublish"))
            .await
    }

    pub async fn suggest(
        &self,
        field: SuggestField,
        context: Option<&str>,
    ) -> Result<String, ApiError> {
        let req = self
            .request(Method::POST, "/api/suggest")
            .json(&SuggestRequest { field, context });
        let resp: SuggestResponse = self.fetch(req).await?;
        Ok(resp.suggestion)
    }

    // ------------------------------------------------------------------------
    // Preview chats
    // ------------------------------------------------------------------------

    pub async fn list_preview_chats(&self) -> Result<Vec<PreviewChat>, ApiError> {
        let list: Option<Vec<PreviewChat>> = self
            .fetch(self.request(Method::GET, "/api/preview-chats"))
            .await?;
        Ok(list.unwrap_or_default())
    }

    pub async fn create_preview_chat(&self, title: Option<&str>) -> Result<PreviewChat, ApiError> {
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CHAT_TITLE);
        let req = self
            .request(Method::POST, "/api/preview-chats")
            .json(&CreateChatRequest { title });
        self.fetch(req).await
    }

    pub async fn delete_preview_chat(&self, chat_id: &str) -> Result<(), ApiError> {
        let endpoint = format!("/api/preview-chats/{}", chat_id);
        self.fetch_empty(self.request(Method::DELETE, &endpoint))
            .await
    }

    pub async fn list_preview_messages(
        &self,
        chat_id: &str,
    ) -> Result<Vec<PreviewMessage>, ApiError> {
        let endpoint = format!("/api/preview-chats/{}/messages", chat_id);
        let list: Option<Vec<PreviewMessage>> =
            self.fetch(self.request(Method::GET, &endpoint)).await?;
        Ok(list.unwrap_or_default())
    }

    /// Send a user message and return the assistant's reply text.
    pub async fn send_preview_message(
        &self,
        chat_id: &str,
        message: &str,
    ) -> Result<String, ApiError> {
        let endpoint = format!("/api/preview-chats/{}/messages", chat_id);
        let req = self
            .request(Method::POST, &endpoint)
            .json(&SendMessageRequest { message });
        let reply: PreviewReply = self.fetch(req).await?;
        Ok(reply.response)
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        tracing::debug!(method = %method, endpoint, "API request");

        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, endpoint))
            .header(CONTENT_TYPE, "application/json");

        if let Some(session) = &self.session {
            req = req
                .header(AUTHORIZATION, format!("Bearer {}", session.token))
                .header(IDENTITY_HEADER, session.identity_id.as_str());
        }
        req
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(req).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// For endpoints whose success body carries nothing of interest.
    async fn fetch_empty(&self, req: RequestBuilder) -> Result<(), ApiError> {
        self.send(req).await?;
        Ok(())
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

            tracing::warn!(status = status.as_u16(), message = %message, "API request failed");

            return Err(ApiError::Request {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authed_client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri())
            .expect("Failed to create client")
            .with_session(Session::new("tok-123", "987654"))
    }

    fn persona_json() -> serde_json::Value {
        serde_json::json!({
            "id": "twin-1",
            "psychologist_id": "psy-1",
            "greeting": "Hello!",
            "system_prompt": "You are a gestalt therapist.",
            "is_published": false,
            "share_code": null
        })
    }

    #[tokio::test]
    async fn test_authenticated_request_carries_bearer_and_identity_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/profile"))
            .and(header("authorization", "Bearer tok-123"))
            .and(header("x-telegram-id", "987654"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "psychologist": null,
                "profile": null,
                "ai_twin": null,
                "questions": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = authed_client(&server).get_profile().await;
        assert!(profile.is_ok(), "Expected Ok, got: {:?}", profile.err());
    }

    #[tokio::test]
    async fn test_request_without_session_has_no_auth_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/telegram"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "fresh-token",
                "psychologist": {
                    "id": "psy-1",
                    "telegram_id": 123456789,
                    "first_name": "Test",
                    "created_at": "2026-01-05T10:00:00Z"
                },
                "is_new": true
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let auth = client
            .authenticate(&IdentityAssertion::dev())
            .await
            .expect("auth should succeed");
        assert_eq!(auth.token, "fresh-token");
        assert!(auth.is_new);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
        assert!(requests[0].headers.get("x-telegram-id").is_none());
    }

    #[tokio::test]
    async fn test_assertion_is_forwarded_verbatim() {
        let server = MockServer::start().await;
        let assertion = IdentityAssertion {
            id: 42,
            first_name: "Anna".to_string(),
            last_name: None,
            username: Some("anna_psy".to_string()),
            photo_url: None,
            auth_date: 1_760_000_000,
            hash: "abc123".to_string(),
        };

        Mock::given(method("POST"))
            .and(path("/api/auth/telegram"))
            .and(body_json(serde_json::json!({
                "id": 42,
                "first_name": "Anna",
                "username": "anna_psy",
                "auth_date": 1_760_000_000,
                "hash": "abc123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t",
                "psychologist": {
                    "id": "psy-42",
                    "telegram_id": 42,
                    "created_at": "2026-01-05T10:00:00Z"
                },
                "is_new": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        assert!(client.authenticate(&assertion).await.is_ok());
    }

    #[tokio::test]
    async fn test_error_uses_server_message() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/ai-twin"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "greeting too long" })),
            )
            .mount(&server)
            .await;

        let result = authed_client(&server)
            .update_persona(&PersonaUpdate {
                greeting: Some("x".repeat(10_000)),
                system_prompt: None,
            })
            .await;

        match result {
            Err(ApiError::Request { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "greeting too long");
            }
            other => panic!("Expected Request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_falls_back_to_status_when_body_is_not_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/profile"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = authed_client(&server).get_profile().await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.user_message(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_questions_are_sent_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/ai-twin/questions"))
            .and(body_json(serde_json::json!({
                "questions": ["What brings you here?", "How do you sleep?"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "q1", "ai_twin_id": "twin-1", "question": "What brings you here?", "order_index": 0 },
                { "id": "q2", "ai_twin_id": "twin-1", "question": "How do you sleep?", "order_index": 1 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let questions = authed_client(&server)
            .update_questions(&[
                "What brings you here?".to_string(),
                "How do you sleep?".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].order_index, 1);
    }

    #[tokio::test]
    async fn test_persona_update_omits_absent_fields() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/ai-twin"))
            .and(body_json(serde_json::json!({ "greeting": "Hello!" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(persona_json()))
            .expect(1)
            .mount(&server)
            .await;

        let persona = authed_client(&server)
            .update_persona(&PersonaUpdate {
                greeting: Some("Hello!".to_string()),
                system_prompt: None,
            })
            .await
            .unwrap();
        assert_eq!(persona.greeting, "Hello!");
    }

    #[tokio::test]
    async fn test_unpublish_and_delete_accept_empty_bodies() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/ai-twin/unpublish"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/preview-chats/chat-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = authed_client(&server);
        assert!(client.unpublish().await.is_ok());
        assert!(client.delete_preview_chat("chat-7").await.is_ok());
    }

    #[tokio::test]
    async fn test_suggest_sends_field_name() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/suggest"))
            .and(body_json(serde_json::json!({ "field": "system_prompt" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "suggestion": "Be warm." })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let suggestion = authed_client(&server)
            .suggest(SuggestField::SystemPrompt, None)
            .await
            .unwrap();
        assert_eq!(suggestion, "Be warm.");
    }

    #[tokio::test]
    async fn test_null_chat_list_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/preview-chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;

        let chats = authed_client(&server).list_preview_chats().await.unwrap();
        assert!(chats.is_empty());
    }

    #[tokio::test]
    async fn test_create_chat_defaults_title() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/preview-chats"))
            .and(body_json(serde_json::json!({ "title": "Test Chat" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chat-1",
                "psychologist_id": "psy-1",
                "ai_twin_id": "twin-1",
                "title": "Test Chat",
                "created_at": "2026-01-05T10:00:00Z",
                "updated_at": "2026-01-05T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = authed_client(&server).create_preview_chat(None).await.unwrap();
        assert_eq!(chat.id, "chat-1");
    }

    #[test]
    fn test_with_session_leaves_original_untouched() {
        let anonymous = ApiClient::new("http://localhost:8081/").unwrap();
        let authed = anonymous.with_session(Session::new("t", "1"));

        assert!(anonymous.session().is_none());
        assert_eq!(authed.session().map(|s| s.token.as_str()), Some("t"));
        assert!(authed.without_session().session().is_none());
        assert_eq!(anonymous.base_url(), "http://localhost:8081");
    }
}
