use anyhow::{Context, Result};
use axum::http::HeaderMap;
use serde_json::Value;

pub const MESSAGE_RECEIVE_EVENT: &str = "im.message.receive_v1";
pub const GROUP_MENTION_EVENT: &str = "im.message.group_at_msg_v1";

/// Stands in for the user text when a message is not plain text.
pub const NON_TEXT_PLACEHOLDER: &str = "[non-text message]";

const SIGNATURE_TOKEN_HEADER: &str = "x-lark-signature-token";

/// One decoded webhook delivery. Decoding never fails: anything that does
/// not match a known discriminator becomes `Unknown`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    UrlVerification {
        challenge: String,
    },
    MessageReceive {
        chat_id: Option<String>,
        message: MessageContent,
    },
    GroupMention {
        chat_id: Option<String>,
        message: MessageContent,
    },
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageContent {
    pub message_type: Option<String>,
    /// Lark double-encodes message content as a JSON string.
    pub content: Option<String>,
}

impl InboundEvent {
    pub fn classify(payload: &Value) -> Self {
        // The handshake carries its discriminator at the top level; everything
        // else identifies itself through header.event_type.
        if payload.get("type").and_then(Value::as_str) == Some("url_verification") {
            return match payload.get("challenge").and_then(Value::as_str) {
                Some(challenge) if !challenge.is_empty() => Self::UrlVerification {
                    challenge: challenge.to_string(),
                },
                _ => Self::Unknown,
            };
        }

        let event_type = payload
            .get("header")
            .and_then(|header| header.get("event_type"))
            .and_then(Value::as_str);

        match event_type {
            Some(MESSAGE_RECEIVE_EVENT) => {
                let (chat_id, message) = decode_message(payload);
                Self::MessageReceive { chat_id, message }
            }
            Some(GROUP_MENTION_EVENT) => {
                let (chat_id, message) = decode_message(payload);
                Self::GroupMention { chat_id, message }
            }
            _ => Self::Unknown,
        }
    }
}

impl MessageContent {
    /// Pull the user-visible text out of the content envelope. Non-text
    /// messages yield the fixed placeholder without touching the envelope;
    /// an absent `text` field is an empty string, not an error.
    pub fn user_text(&self) -> Result<String> {
        if self.message_type.as_deref() != Some("text") {
            return Ok(NON_TEXT_PLACEHOLDER.to_string());
        }

        let raw = self
            .content
            .as_deref()
            .filter(|content| !content.is_empty())
            .unwrap_or("{}");
        let envelope: Value = serde_json::from_str(raw)
            .with_context(|| format!("message content envelope is not valid JSON: {raw}"))?;

        Ok(envelope
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

/// The verification token arrives in the body for most event versions, with
/// a header fallback.
pub fn supplied_token<'a>(payload: &'a Value, headers: &'a HeaderMap) -> Option<&'a str> {
    payload
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .or_else(|| headers.get(SIGNATURE_TOKEN_HEADER)?.to_str().ok())
}

fn decode_message(payload: &Value) -> (Option<String>, MessageContent) {
    let message = payload
        .get("event")
        .and_then(|event| event.get("message"));

    let chat_id = message
        .and_then(|message| message.get("chat_id"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    let message_type = message
        .and_then(|message| message.get("message_type"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    let content = message
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    (
        chat_id,
        MessageContent {
            message_type,
            content,
        },
    )
}
