//! Shared test fixtures and mocks for the callback integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use lark_relay::api::{router, AppState};
use lark_relay::dispatch::Dispatcher;
use lark_relay::lark::{ChatDelivery, DeliveryReceipt};
use lark_relay::llm::CompletionProvider;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const TEST_MODEL: &str = "mock-model";

// ---------------------------------------------------------------------------
// MockCompletion
// ---------------------------------------------------------------------------

enum CompletionScript {
    Reply(String),
    Error(String),
}

/// CompletionProvider double that returns one scripted reply (or error) and
/// captures every `(model, input)` pair for assertions.
pub struct MockCompletion {
    script: CompletionScript,
    pub captured: Mutex<Vec<(String, String)>>,
}

impl MockCompletion {
    pub fn reply(text: &str) -> Arc<Self> {
        Arc::new(Self {
            script: CompletionScript::Reply(text.to_string()),
            captured: Mutex::new(Vec::new()),
        })
    }

    pub fn error(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: CompletionScript::Error(message.to_string()),
            captured: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.captured
            .lock()
            .unwrap()
            .iter()
            .map(|(_, input)| input.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    fn name(&self) -> &'static str {
        "mock-completion"
    }

    async fn complete(&self, model: &str, input: &str) -> Result<String> {
        self.captured
            .lock()
            .unwrap()
            .push((model.to_string(), input.to_string()));
        match &self.script {
            CompletionScript::Reply(text) => Ok(text.clone()),
            CompletionScript::Error(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockDelivery
// ---------------------------------------------------------------------------

/// ChatDelivery double that captures every `(chat_id, text)` pair and can be
/// told to fail.
pub struct MockDelivery {
    failure: Option<String>,
    pub captured: Mutex<Vec<(String, String)>>,
}

impl MockDelivery {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            failure: None,
            captured: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(message.to_string()),
            captured: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatDelivery for MockDelivery {
    fn channel(&self) -> &'static str {
        "mock-chat"
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<DeliveryReceipt> {
        self.captured
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        if let Some(message) = &self.failure {
            return Err(anyhow::anyhow!("{message}"));
        }
        Ok(DeliveryReceipt {
            message_id: Some("mock-message".to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Router / request helpers
// ---------------------------------------------------------------------------

pub fn build_state(
    completion: Arc<MockCompletion>,
    delivery: Arc<MockDelivery>,
    verification_token: Option<&str>,
) -> AppState {
    let dispatcher = Dispatcher::new(
        completion,
        delivery,
        TEST_MODEL.to_string(),
        verification_token.map(ToOwned::to_owned),
    );
    AppState::new(Arc::new(dispatcher))
}

pub fn build_router(
    completion: Arc<MockCompletion>,
    delivery: Arc<MockDelivery>,
    verification_token: Option<&str>,
) -> axum::Router {
    router(build_state(completion, delivery, verification_token))
}

pub fn post_callback(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/lark/callback")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn post_callback_raw(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/lark/callback")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn message_receive_body(chat_id: &str, message_type: &str, content: &str) -> Value {
    json!({
        "header": {"event_type": "im.message.receive_v1"},
        "event": {"message": {
            "chat_id": chat_id,
            "message_type": message_type,
            "content": content,
        }}
    })
}

pub fn group_mention_body(chat_id: &str, content: &str) -> Value {
    json!({
        "header": {"event_type": "im.message.group_at_msg_v1"},
        "event": {"message": {
            "chat_id": chat_id,
            "message_type": "text",
            "content": content,
        }}
    })
}
