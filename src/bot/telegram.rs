//! Minimal Telegram Bot API client: just the handful of methods this bot
//! needs, spoken over plain HTTPS.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Every Bot API response arrives in this envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramApi {
    client: Client,
    base: String,
}

impl TelegramApi {
    pub fn new(client: Client, token: &str) -> Self {
        Self {
            client,
            base: format!("{API_BASE}/bot{token}"),
        }
    }

    async fn call<T: DeserializeOwned + Default>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{method}", self.base);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {method}"))?;
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("decoding {method} response"))?;
        if !envelope.ok {
            bail!(
                "telegram {method} failed: {}",
                envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        envelope
            .result
            .with_context(|| format!("telegram {method} returned no result"))
    }

    /// Long-polls for new updates; `timeout_secs` is held open server-side.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: serde_json::Value = self.call("setWebhook", json!({ "url": url })).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<()> {
        let _: serde_json::Value = self.call("deleteWebhook", json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_payload_decodes() {
        let raw = r#"{
            "update_id": 901,
            "message": {
                "message_id": 7,
                "chat": { "id": -100123, "type": "group" },
                "text": "Код: A123; Цена=36500"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 901);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100123);
        assert_eq!(message.text.as_deref(), Some("Код: A123; Цена=36500"));
    }

    #[test]
    fn non_text_updates_decode_with_empty_text() {
        let raw = r#"{
            "update_id": 902,
            "message": { "message_id": 8, "chat": { "id": 5 }, "photo": [] }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.message.unwrap().text, None);
    }

    #[test]
    fn error_envelope_reports_description() {
        let raw = r#"{ "ok": false, "description": "Unauthorized" }"#;
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.description.as_deref(), Some("Unauthorized"));
    }
}
