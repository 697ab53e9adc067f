#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use kaiwa_backend::auth::sign_session_token;
use kaiwa_backend::config::SessionConfig;
use kaiwa_backend::db::store::MemoryStore;
use kaiwa_backend::services::generator::{GenerationRequest, TextGenerator};
use kaiwa_backend::services::llm_provider::LLMError;
use kaiwa_backend::services::prompts::TRANSLATION_INSTRUCTION;
use kaiwa_backend::state::AppState;

pub const AUTH_SECRET: &str = "integration-test-secret";
pub const WEBHOOK_SECRET: &str = "whsec_aW50ZWdyYXRpb24td2ViaG9vaw==";

pub const HELLO_REPLY: &str = r#"```json
{"response":"Hi! What did you do today?","translation":"こんにちは！今日は何をしましたか？","corrections":[{"original":"I goed","correction":"I went","explanation":"past tense of go"}]}
```"#;

pub const DEFINITION_REPLY: &str = "- 日本語での意味: 冒険\n- 例文: Life is an adventure.";

/// How the fake model answers conversation requests
#[derive(Clone, Copy)]
pub enum Script {
    Reply(&'static str),
    Fail,
    /// Every request fails, translations and definitions included
    Offline,
}

pub struct ScriptedGenerator {
    script: Script,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LLMError> {
        if let Script::Offline = self.script {
            return Err(LLMError::EmptyChoices);
        }
        if request.system_text() == Some(TRANSLATION_INSTRUCTION) {
            return Ok("translated text".to_string());
        }
        let is_definition = request
            .messages
            .iter()
            .any(|m| m.content.contains("日本語での意味"));
        if is_definition {
            return Ok(DEFINITION_REPLY.to_string());
        }
        match self.script {
            Script::Reply(text) => Ok(text.to_string()),
            Script::Fail | Script::Offline => Err(LLMError::EmptyChoices),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn create_test_app(script: Script) -> TestApp {
    std::env::set_var("AUTH_JWT_SECRET", AUTH_SECRET);
    std::env::set_var("WEBHOOK_SECRET", WEBHOOK_SECRET);

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(ScriptedGenerator { script }),
        SessionConfig::default(),
    );

    TestApp {
        router: kaiwa_backend::create_app_with_state(state.clone()),
        state,
        store,
    }
}

pub fn token(account_id: &str) -> String {
    sign_session_token(account_id, AUTH_SECRET, 3600)
}

pub fn request(method: Method, uri: &str, account: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(account) = account {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(account)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, account: &str) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, Some(account), None)).await
    }

    pub async fn post(&self, uri: &str, account: &str, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, Some(account), Some(body)))
            .await
    }
}
