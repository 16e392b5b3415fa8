use crate::event::{supplied_token, InboundEvent, MessageContent};
use crate::lark::ChatDelivery;
use crate::llm::CompletionProvider;
use anyhow::{anyhow, Context, Result};
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// Delivered instead of an empty completion.
pub const NO_RESPONSE_FALLBACK: &str = "(no response)";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: StatusCode,
    pub body: String,
}

impl DispatchOutcome {
    fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    fn unauthorized(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: body.into(),
        }
    }
}

/// Maps one webhook delivery to at most one completion call and at most one
/// outbound message.
pub struct Dispatcher {
    completion: Arc<dyn CompletionProvider>,
    delivery: Arc<dyn ChatDelivery>,
    model: String,
    verification_token: Option<String>,
}

impl Dispatcher {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        delivery: Arc<dyn ChatDelivery>,
        model: String,
        verification_token: Option<String>,
    ) -> Self {
        Self {
            completion,
            delivery,
            model,
            verification_token,
        }
    }

    /// Outer boundary: every internal failure is logged and acknowledged with
    /// a 200, because Lark disables or retry-storms a subscription that keeps
    /// answering non-2xx.
    pub async fn handle(&self, body: &[u8], headers: &HeaderMap) -> DispatchOutcome {
        match self.process(body, headers).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(error = %error, "callback processing failed");
                DispatchOutcome::ok("ok")
            }
        }
    }

    async fn process(&self, body: &[u8], headers: &HeaderMap) -> Result<DispatchOutcome> {
        let payload: Value =
            serde_json::from_slice(body).context("callback body is not valid JSON")?;
        let event = InboundEvent::classify(&payload);

        // The handshake runs before Lark trusts the endpoint, so it must be
        // answered before the token check.
        if let InboundEvent::UrlVerification { challenge } = &event {
            tracing::info!("answering url verification handshake");
            return Ok(DispatchOutcome::ok(challenge.clone()));
        }

        if !self.token_is_valid(&payload, headers) {
            tracing::warn!("callback verification token mismatch");
            return Ok(DispatchOutcome::unauthorized("invalid token"));
        }

        match event {
            InboundEvent::MessageReceive { chat_id, message } => {
                self.reply(chat_id, message, "message_receive").await
            }
            InboundEvent::GroupMention { chat_id, message } => {
                self.reply(chat_id, message, "group_mention").await
            }
            _ => {
                tracing::debug!("ignoring unrecognized callback event");
                Ok(DispatchOutcome::ok("ignored"))
            }
        }
    }

    fn token_is_valid(&self, payload: &Value, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.verification_token else {
            return true;
        };
        supplied_token(payload, headers) == Some(expected.as_str())
    }

    async fn reply(
        &self,
        chat_id: Option<String>,
        message: MessageContent,
        kind: &'static str,
    ) -> Result<DispatchOutcome> {
        let chat_id = chat_id.ok_or_else(|| anyhow!("{kind} event is missing chat_id"))?;
        let input = message.user_text()?;

        tracing::info!(
            kind,
            chat_id = %chat_id,
            input_chars = input.chars().count(),
            "relaying message to completion provider"
        );

        let output = self.completion.complete(&self.model, &input).await?;
        let reply = match output.trim() {
            "" => NO_RESPONSE_FALLBACK.to_string(),
            trimmed => trimmed.to_string(),
        };

        let receipt = self.delivery.send_text(&chat_id, &reply).await?;
        tracing::info!(
            kind,
            chat_id = %chat_id,
            message_id = receipt.message_id.as_deref().unwrap_or("unknown"),
            reply_chars = reply.chars().count(),
            "reply delivered"
        );

        Ok(DispatchOutcome::ok("ok"))
    }
}
