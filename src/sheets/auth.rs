//! Service-account auth for the Sheets API. The credential blob is parsed
//! strictly — never evaluated — and the token source caches the access token
//! across requests, refreshing on expiry.

use anyhow::{anyhow, Context, Result};
use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::Config;
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use std::sync::Arc;

const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Hands out `Authorization` header values for Sheets API calls.
#[derive(Clone)]
pub struct SheetsAuth {
    source: Arc<dyn TokenSource>,
}

impl SheetsAuth {
    pub async fn from_service_account_json(json: &str) -> Result<Self> {
        let credentials = CredentialsFile::new_from_str(json)
            .await
            .context("parsing service-account credentials")?;
        let config = Config::default().with_scopes(&SCOPES);
        let provider =
            DefaultTokenSourceProvider::new_with_credentials(config, Box::new(credentials))
                .await
                .context("building token source from service-account credentials")?;
        Ok(Self {
            source: provider.token_source(),
        })
    }

    /// A ready-to-use `Authorization` header value ("Bearer …").
    pub async fn header_value(&self) -> Result<String> {
        self.source
            .token()
            .await
            .map_err(|e| anyhow!("fetching access token: {e}"))
    }
}
