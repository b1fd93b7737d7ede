use anyhow::{Context, Result};
use reqwest::Client;
use sheetbridge::bot::{telegram::TelegramApi, webhook, Bot};
use sheetbridge::config::{Config, RunMode};
use sheetbridge::sheets::auth::SheetsAuth;
use std::{sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) load config & credentials ────────────────────────────────
    let config = Config::from_env()?;
    let auth = SheetsAuth::from_service_account_json(&config.service_account_json)
        .await
        .context("bootstrapping Sheets auth")?;

    // Long-poll requests are held open by Telegram for up to 50s, so the
    // client timeout must sit above that.
    let client = Client::builder()
        .timeout(Duration::from_secs(75))
        .build()
        .context("building HTTP client")?;

    // ─── 3) run the bot ───────────────────────────────────────────────
    let api = TelegramApi::new(client.clone(), &config.bot_token);
    let mode = config.mode;
    let webhook_url = config.webhook_url.clone();
    let port = config.port;
    let bot = Arc::new(Bot::new(api, client, auth, config));

    match mode {
        RunMode::Polling => bot.run_polling().await,
        RunMode::Webhook => {
            let url = webhook_url.context("webhook mode without WEBHOOK_URL")?;
            webhook::run_webhook(bot, &url, port).await
        }
    }
}
