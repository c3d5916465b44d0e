//! Shared fixtures for the cabinet integration tests

#![allow(dead_code)]

use minddy_cabinet::Cabinet;
use minddy_core::{ApiClient, FullProfile, MemorySessionStore, Session};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "tok-abc";
pub const TELEGRAM_ID: &str = "123456789";

pub fn psychologist_json() -> Value {
    json!({
        "id": "psy-1",
        "telegram_id": 123456789,
        "username": "testuser",
        "first_name": "Test",
        "last_name": "User",
        "photo_url": null,
        "created_at": "2026-01-05T10:00:00Z"
    })
}

pub fn persona_json(greeting: &str, system_prompt: &str, published: bool) -> Value {
    json!({
        "id": "twin-1",
        "psychologist_id": "psy-1",
        "greeting": greeting,
        "system_prompt": system_prompt,
        "is_published": published,
        "share_code": if published { json!("abc123") } else { Value::Null }
    })
}

pub fn questions_json(questions: &[&str]) -> Value {
    Value::Array(
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                json!({
                    "id": format!("q{}", i + 1),
                    "ai_twin_id": "twin-1",
                    "question": q,
                    "order_index": i
                })
            })
            .collect(),
    )
}

pub fn full_profile_json(greeting: &str, system_prompt: &str, published: bool) -> Value {
    json!({
        "psychologist": psychologist_json(),
        "profile": {
            "id": "pr-1",
            "psychologist_id": "psy-1",
            "display_name": "Dr. Test",
            "bio": "Gestalt therapist",
            "education": null,
            "specializations": null,
            "experience": null
        },
        "ai_twin": persona_json(greeting, system_prompt, published),
        "questions": questions_json(&["What brings you here?", "How do you sleep?"])
    })
}

pub fn full_profile(greeting: &str, system_prompt: &str, published: bool) -> FullProfile {
    serde_json::from_value(full_profile_json(greeting, system_prompt, published))
        .expect("fixture should deserialize")
}

pub fn chat_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "psychologist_id": "psy-1",
        "ai_twin_id": "twin-1",
        "title": title,
        "created_at": "2026-01-05T10:00:00Z",
        "updated_at": "2026-01-05T10:00:00Z"
    })
}

pub fn authed_api(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri())
        .expect("Failed to create client")
        .with_session(Session::new(TOKEN, TELEGRAM_ID))
}

pub fn cabinet_with_stored_session(server: &MockServer) -> Cabinet<MemorySessionStore> {
    let store = MemorySessionStore::with_session(&Session::new(TOKEN, TELEGRAM_ID));
    Cabinet::new(ApiClient::new(server.uri()).unwrap(), store)
}

pub fn fresh_cabinet(server: &MockServer) -> Cabinet<MemorySessionStore> {
    Cabinet::new(ApiClient::new(server.uri()).unwrap(), MemorySessionStore::new())
}
