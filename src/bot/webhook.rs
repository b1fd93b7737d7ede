//! Webhook run mode: register the URL with Telegram, then serve inbound
//! updates over HTTP the way Cloud Run style deployments expect.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use warp::{reject::Rejection, reply::Reply, Filter};

use super::telegram::Update;
use super::Bot;

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "sheetbridge",
    })))
}

async fn receive_update(bot: Arc<Bot>, update: Update) -> Result<impl Reply, Rejection> {
    bot.handle_update(update).await;
    Ok(warp::reply::json(&serde_json::json!({ "ok": true })))
}

pub async fn run_webhook(bot: Arc<Bot>, url: &str, port: u16) -> Result<()> {
    bot.api()
        .set_webhook(url)
        .await
        .with_context(|| format!("registering webhook {url}"))?;
    info!(url, "webhook registered");

    let state = bot.clone();
    let with_bot = warp::any().map(move || state.clone());

    let health = warp::path("health").and(warp::get()).and_then(health_check);

    let updates = warp::post()
        .and(warp::path::end())
        .and(with_bot)
        .and(warp::body::json())
        .and_then(receive_update);

    let routes = health.or(updates);

    info!(port, "webhook server listening");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
