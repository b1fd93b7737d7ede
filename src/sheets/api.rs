//! Google Sheets v4 REST adapter for [`TableStore`].
//!
//! The worksheet is resolved once when the client is opened: the tab whose
//! gid matches the configured one, or the first tab as a fallback. All reads
//! and writes use A1 notation against that tab.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::auth::SheetsAuth;
use super::{CellWrite, TableStore};

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// 1-based column index to A1 letters: 1 → "A", 26 → "Z", 27 → "AA".
pub fn col_letter(col: usize) -> String {
    let mut n = col;
    let mut out = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).expect("A1 letters are ASCII")
}

/// (row, col) to an A1 cell reference, e.g. (2, 3) → "C2".
pub fn to_a1(row: usize, col: usize) -> String {
    format!("{}{}", col_letter(col), row)
}

/// Sheet titles go single-quoted into ranges; embedded quotes are doubled.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct SheetsApi {
    client: Client,
    auth: SheetsAuth,
    spreadsheet_id: String,
    sheet_title: String,
}

impl SheetsApi {
    /// Opens the spreadsheet and resolves which worksheet to talk to.
    pub async fn open(
        client: Client,
        auth: SheetsAuth,
        spreadsheet_id: &str,
        worksheet_gid: Option<i64>,
    ) -> Result<Self> {
        let stub = Self {
            client,
            auth,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_title: String::new(),
        };

        let url = format!("{BASE_URL}/{spreadsheet_id}?fields=sheets.properties");
        let request = stub.authorized(stub.client.get(&url)).await?;
        let meta: SpreadsheetMeta = check(request.send().await.context("GET spreadsheet metadata")?)
            .await?
            .json()
            .await
            .context("decoding spreadsheet metadata")?;

        let sheet = match worksheet_gid {
            Some(gid) => meta
                .sheets
                .iter()
                .find(|s| s.properties.sheet_id == gid)
                .with_context(|| {
                    format!("worksheet gid {gid} not found in spreadsheet {spreadsheet_id}")
                })?,
            None => meta
                .sheets
                .first()
                .with_context(|| format!("spreadsheet {spreadsheet_id} has no worksheets"))?,
        };
        debug!(sheet = %sheet.properties.title, "resolved worksheet");

        Ok(Self {
            sheet_title: sheet.properties.title.clone(),
            ..stub
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(request.header(AUTHORIZATION, self.auth.header_value().await?))
    }

    fn range(&self, suffix: &str) -> String {
        format!("{}!{}", quote_title(&self.sheet_title), suffix)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = format!("{BASE_URL}/{}/values/{range}", self.spreadsheet_id);
        let request = self.authorized(self.client.get(&url)).await?;
        let body: ValueRange = check(
            request
                .send()
                .await
                .with_context(|| format!("GET values {range}"))?,
        )
        .await?
        .json()
        .await
        .with_context(|| format!("decoding values for {range}"))?;

        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }
}

/// Surfaces the API's JSON error body instead of a bare status code.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("sheets API returned {status}: {body}");
}

#[async_trait]
impl TableStore for SheetsApi {
    async fn read_header(&self) -> Result<Vec<String>> {
        let rows = self.get_values(&self.range("1:1")).await?;
        Ok(rows
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect())
    }

    async fn read_column(&self, col: usize) -> Result<Vec<String>> {
        let letter = col_letter(col);
        let rows = self
            .get_values(&self.range(&format!("{letter}:{letter}")))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    async fn write_row(&mut self, row: usize, values: &[String]) -> Result<()> {
        let range = self.range(&format!("A{row}:{}", to_a1(row, values.len().max(1))));
        let url = format!(
            "{BASE_URL}/{}/values/{range}?valueInputOption=RAW",
            self.spreadsheet_id
        );
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        let request = self.authorized(self.client.put(&url)).await?;
        check(
            request
                .json(&body)
                .send()
                .await
                .with_context(|| format!("PUT values {range}"))?,
        )
        .await?;
        Ok(())
    }

    async fn write_cells(&mut self, writes: &[CellWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let data: Vec<serde_json::Value> = writes
            .iter()
            .map(|w| {
                json!({
                    "range": self.range(&to_a1(w.row, w.col)),
                    "values": [[w.value]],
                })
            })
            .collect();
        let url = format!(
            "{BASE_URL}/{}/values:batchUpdate",
            self.spreadsheet_id
        );
        let body = json!({ "valueInputOption": "RAW", "data": data });
        let request = self.authorized(self.client.post(&url)).await?;
        check(
            request
                .json(&body)
                .send()
                .await
                .context("POST values:batchUpdate")?,
        )
        .await?;
        Ok(())
    }

    async fn append_row(&mut self, values: &[String]) -> Result<()> {
        let range = self.range("A1");
        let url = format!(
            "{BASE_URL}/{}/values/{range}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.spreadsheet_id
        );
        let body = json!({ "values": [values] });
        let request = self.authorized(self.client.post(&url)).await?;
        check(
            request
                .json(&body)
                .send()
                .await
                .context("POST values:append")?,
        )
        .await?;
        Ok(())
    }
}
