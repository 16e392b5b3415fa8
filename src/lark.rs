use crate::config::AppConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_LARK_API_BASE: &str = "https://open.larksuite.com";

/// Posts one plain-text message to one chat. No retries: the caller treats a
/// failed delivery the same as any other provider failure.
#[async_trait]
pub trait ChatDelivery: Send + Sync {
    fn channel(&self) -> &'static str;
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<DeliveryReceipt>;
}

#[derive(Clone, Debug)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

pub fn build_delivery(config: &AppConfig) -> Arc<dyn ChatDelivery> {
    Arc::new(LarkConnector::new(
        config.lark_app_id.clone().unwrap_or_default(),
        config.lark_app_secret.clone().unwrap_or_default(),
        config.lark_api_base_url.clone(),
    ))
}

#[derive(Clone)]
pub struct LarkConnector {
    client: Client,
    app_id: String,
    app_secret: String,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct TenantTokenResponse {
    code: i64,
    msg: String,
    tenant_access_token: Option<String>,
}

impl LarkConnector {
    pub fn new(app_id: String, app_secret: String, api_base_url: String) -> Self {
        Self {
            client: Client::new(),
            app_id,
            app_secret,
            api_base_url: normalize_api_base_url(&api_base_url),
        }
    }

    /// A fresh token is fetched for every delivery; nothing is cached between
    /// requests.
    async fn tenant_access_token(&self) -> Result<String> {
        let url = format!(
            "{}/open-apis/auth/v3/tenant_access_token/internal",
            self.api_base_url
        );
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "app_id": self.app_id,
                "app_secret": self.app_secret,
            }))
            .send()
            .await
            .with_context(|| format!("failed to call lark tenant token endpoint: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("lark tenant token error {status}: {body}"));
        }

        let payload: TenantTokenResponse = response
            .json()
            .await
            .context("failed to decode lark tenant token response")?;
        if payload.code != 0 {
            return Err(anyhow!(
                "lark tenant token rejected (code {}): {}",
                payload.code,
                payload.msg
            ));
        }

        payload
            .tenant_access_token
            .ok_or_else(|| anyhow!("lark tenant token response is missing the token"))
    }
}

#[async_trait]
impl ChatDelivery for LarkConnector {
    fn channel(&self) -> &'static str {
        "lark"
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<DeliveryReceipt> {
        let token = self.tenant_access_token().await?;

        let url = format!(
            "{}/open-apis/im/v1/messages?receive_id_type=chat_id",
            self.api_base_url
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({
                "receive_id": chat_id,
                "msg_type": "text",
                // Lark expects the content itself to be a JSON-encoded string.
                "content": json!({"text": text}).to_string(),
            }))
            .send()
            .await
            .with_context(|| format!("failed to call lark message create: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("lark message create error {status}: {body}"));
        }

        let payload: Value = response
            .json()
            .await
            .context("failed to decode lark message create response")?;
        let code = payload.get("code").and_then(Value::as_i64).unwrap_or(-1);
        if code != 0 {
            let msg = payload
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow!("lark message create rejected (code {code}): {msg}"));
        }

        let message_id = payload
            .get("data")
            .and_then(|data| data.get("message_id"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        tracing::debug!(
            chat_id = %chat_id,
            message_id = message_id.as_deref().unwrap_or("unknown"),
            "lark message delivered"
        );

        Ok(DeliveryReceipt { message_id })
    }
}

pub fn normalize_api_base_url(value: &str) -> String {
    if value.trim().is_empty() {
        return DEFAULT_LARK_API_BASE.to_string();
    }
    value.trim().trim_end_matches('/').to_string()
}
