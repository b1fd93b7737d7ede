//! Update handling: command replies, the parse → upsert → confirm pipeline,
//! and the long-polling loop.

pub mod telegram;
pub mod webhook;

use anyhow::Result;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::parse::parse_message;
use crate::sheets::api::SheetsApi;
use crate::sheets::auth::SheetsAuth;
use crate::sheets::upsert::RowUpserter;
use self::telegram::{TelegramApi, Update};

/// How long Telegram holds a getUpdates call open.
const POLL_TIMEOUT_SECS: u64 = 50;
/// Pause before retrying after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

pub struct Bot {
    api: TelegramApi,
    http: Client,
    auth: SheetsAuth,
    config: Config,
}

impl Bot {
    pub fn new(api: TelegramApi, http: Client, auth: SheetsAuth, config: Config) -> Self {
        Self {
            api,
            http,
            auth,
            config,
        }
    }

    pub fn api(&self) -> &TelegramApi {
        &self.api
    }

    fn usage_hint(&self) -> String {
        format!(
            "Send a message like:\nКод: A123; Цена=36500; Город: Алматы\n\n\
             The code column is currently '{}'; change it with the CODE_HEADER variable.",
            self.config.code_header
        )
    }

    /// Handles one update to completion. Never returns an error: every
    /// failure ends up as a logged reply to the chat.
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let chat_id = message.chat.id;

        let reply = if text.starts_with('/') {
            // /start and any other command get the usage hint.
            self.usage_hint()
        } else {
            self.handle_text(text).await
        };

        if let Err(err) = self.api.send_message(chat_id, &reply).await {
            error!(chat_id, "failed to send reply: {err:#}");
        }
    }

    async fn handle_text(&self, text: &str) -> String {
        let parsed = parse_message(text);

        let Some(code) = parsed.code else {
            return format!(
                "No product code found. Try: 'Код: A123; Цена=36500; Город: Алматы'.\n\n{}",
                self.usage_hint()
            );
        };

        match self.upsert(&code, &parsed.fields).await {
            Ok(row) if parsed.fields.is_empty() => {
                format!("Ok! Row #{row} for code '{code}' created/refreshed (no fields besides the code).")
            }
            Ok(row) => {
                let names: Vec<&str> = parsed.fields.keys().map(String::as_str).collect();
                format!(
                    "Ok! Updated row #{row} for code '{code}'. Fields: {}.",
                    names.join(", ")
                )
            }
            Err(err) => {
                error!(%code, "sheet update failed: {err:#}");
                format!("Error writing to Google Sheets: {err:#}")
            }
        }
    }

    /// A fresh store client per message: the header row is re-read every
    /// time, so there is no stale header cache across messages.
    async fn upsert(&self, code: &str, fields: &BTreeMap<String, String>) -> Result<usize> {
        let store = SheetsApi::open(
            self.http.clone(),
            self.auth.clone(),
            &self.config.sheet_id,
            self.config.worksheet_gid,
        )
        .await?;
        let mut upserter = RowUpserter::new(store, &self.config.code_header).await?;
        upserter.upsert(code, fields).await
    }

    /// Sequential long-poll loop: each update is handled to completion
    /// before the next one is looked at. Transport errors are logged and
    /// retried after a short pause.
    pub async fn run_polling(&self) -> Result<()> {
        self.api
            .delete_webhook()
            .await
            .unwrap_or_else(|err| warn!("deleteWebhook failed: {err:#}"));
        info!("long-polling for updates");

        let mut offset: i64 = 0;
        loop {
            let updates = match self.api.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => updates,
                Err(err) => {
                    warn!("getUpdates failed: {err:#}");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(update).await;
            }
        }
    }
}
