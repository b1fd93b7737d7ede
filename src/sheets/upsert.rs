//! Find-or-create a row by product code, growing the header row when new
//! field names appear and batch-writing field values into their columns.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::{CellWrite, TableStore};

/// Owns a store client plus the header cache read at construction. The
/// surrounding bot builds a fresh one per incoming message, so headers are
/// never stale across messages.
#[derive(Debug)]
pub struct RowUpserter<S: TableStore> {
    store: S,
    code_header: String,
    headers: Vec<String>,
    /// Lowercased header name → 1-based column index.
    cols: HashMap<String, usize>,
}

impl<S: TableStore> RowUpserter<S> {
    /// Reads the header row once and verifies the code column exists. Every
    /// later operation depends on that column's position, so a missing code
    /// column fails here, naming the headers that were actually found.
    pub async fn new(store: S, code_header: &str) -> Result<Self> {
        let headers = store.read_header().await.context("reading header row")?;
        let mut cols = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            cols.insert(name.to_lowercase(), idx + 1);
        }

        let code_header = code_header.trim().to_string();
        if !cols.contains_key(&code_header.to_lowercase()) {
            bail!(
                "code column '{}' not found; current headers: {:?}",
                code_header,
                headers
            );
        }

        Ok(Self {
            store,
            code_header,
            headers,
            cols,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn col_of(&self, name: &str) -> Option<usize> {
        self.cols.get(&name.to_lowercase()).copied()
    }

    /// Appends any unknown names to the header row. A single write for the
    /// whole header, and only when something actually changed.
    async fn ensure_headers<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut changed = false;
        for key in keys {
            let lowered = key.to_lowercase();
            if !self.cols.contains_key(&lowered) {
                self.headers.push(key.to_string());
                self.cols.insert(lowered, self.headers.len());
                changed = true;
            }
        }
        if changed {
            self.store
                .write_row(1, &self.headers)
                .await
                .context("writing extended header row")?;
        }
        Ok(())
    }

    /// Updates the row carrying `code`, creating it first if no row matches.
    /// Returns the 1-based row position.
    pub async fn upsert(&mut self, code: &str, fields: &BTreeMap<String, String>) -> Result<usize> {
        let code_header = self.code_header.clone();
        let mut keys: Vec<&str> = Vec::with_capacity(fields.len() + 1);
        keys.push(code_header.as_str());
        keys.extend(fields.keys().map(String::as_str));
        self.ensure_headers(keys).await?;

        let code_col = self
            .col_of(&code_header)
            .context("code column missing after header reconciliation")?;

        // First match from the top wins; uniqueness is trusted, not enforced.
        let column = self
            .store
            .read_column(code_col)
            .await
            .context("reading code column")?;
        let target = code.trim().to_lowercase();
        let found = column
            .iter()
            .enumerate()
            .skip(1) // header cell
            .find(|(_, value)| value.trim().to_lowercase() == target)
            .map(|(idx, _)| idx + 1);

        let row = match found {
            Some(row) => {
                debug!(code, row, "matched existing row");
                row
            }
            None => {
                // Next free row comes from the code column itself, so stray
                // values in unrelated columns cannot skew the position.
                let row = column.len() + 1;
                let mut values = vec![String::new(); self.headers.len()];
                values[code_col - 1] = code.trim().to_string();
                self.store
                    .write_row(row, &values)
                    .await
                    .with_context(|| format!("creating row for code '{code}'"))?;
                info!(code, row, "created new row");
                row
            }
        };

        if !fields.is_empty() {
            let mut writes = Vec::with_capacity(fields.len());
            for (key, value) in fields {
                let col = self
                    .col_of(key)
                    .with_context(|| format!("no column for field '{key}'"))?;
                writes.push(CellWrite {
                    row,
                    col,
                    value: value.clone(),
                });
            }
            self.store
                .write_cells(&writes)
                .await
                .context("writing field values")?;
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::memory::MemoryStore;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn missing_code_column_lists_actual_headers() {
        let store = MemoryStore::from_rows(vec![vec!["Name", "Price"]]);
        let err = RowUpserter::new(store, "Код товара").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Код товара"));
        assert!(message.contains("Name"));
        assert!(message.contains("Price"));
    }

    #[tokio::test]
    async fn creates_row_and_extends_header_on_empty_table() {
        let store = MemoryStore::from_rows(vec![vec!["Code"]]);
        let mut upserter = RowUpserter::new(store, "Code").await.unwrap();

        let row = upserter
            .upsert("A123", &fields(&[("Price", "100")]))
            .await
            .unwrap();

        assert_eq!(row, 2);
        assert_eq!(upserter.headers(), &["Code", "Price"]);
        assert_eq!(upserter.store().cell(1, 2), "Price");
        assert_eq!(upserter.store().cell(2, 1), "A123");
        assert_eq!(upserter.store().cell(2, 2), "100");
    }

    #[tokio::test]
    async fn repeated_upserts_hit_the_same_row() {
        let store = MemoryStore::from_rows(vec![vec!["Code", "Price"]]);
        let mut upserter = RowUpserter::new(store, "Code").await.unwrap();

        let first = upserter
            .upsert("A123", &fields(&[("Price", "100")]))
            .await
            .unwrap();
        let second = upserter
            .upsert("A123", &fields(&[("Price", "250"), ("City", "Almaty")]))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(upserter.store().cell(2, 2), "250");
        assert_eq!(upserter.store().cell(2, 3), "Almaty");
        assert_eq!(upserter.store().populated_rows(), 2);
    }

    #[tokio::test]
    async fn header_extended_exactly_once() {
        let store = MemoryStore::from_rows(vec![vec!["Code"]]);
        let mut upserter = RowUpserter::new(store, "Code").await.unwrap();

        upserter
            .upsert("A1", &fields(&[("Price", "1")]))
            .await
            .unwrap();
        upserter
            .upsert("A2", &fields(&[("price", "2")]))
            .await
            .unwrap();

        // Case-insensitive header match: "price" reuses the "Price" column.
        assert_eq!(upserter.headers(), &["Code", "Price"]);
        assert_eq!(upserter.store().cell(3, 2), "2");
    }

    #[tokio::test]
    async fn code_match_ignores_case_and_whitespace() {
        let store = MemoryStore::from_rows(vec![
            vec!["Code", "Price"],
            vec![" a123 ", "old"],
        ]);
        let mut upserter = RowUpserter::new(store, "Code").await.unwrap();

        let row = upserter
            .upsert("A123", &fields(&[("Price", "new")]))
            .await
            .unwrap();

        assert_eq!(row, 2);
        assert_eq!(upserter.store().cell(2, 2), "new");
        assert_eq!(upserter.store().populated_rows(), 2);
    }

    #[tokio::test]
    async fn code_only_message_still_creates_the_row() {
        let store = MemoryStore::from_rows(vec![vec!["Code", "Price"]]);
        let mut upserter = RowUpserter::new(store, "Code").await.unwrap();

        let row = upserter.upsert("B7", &BTreeMap::new()).await.unwrap();

        assert_eq!(row, 2);
        assert_eq!(upserter.store().cell(2, 1), "B7");
        assert_eq!(upserter.store().cell(2, 2), "");
    }

    #[tokio::test]
    async fn distinct_codes_land_on_consecutive_rows() {
        let store = MemoryStore::from_rows(vec![vec!["Code"]]);
        let mut upserter = RowUpserter::new(store, "Code").await.unwrap();

        assert_eq!(upserter.upsert("A1", &BTreeMap::new()).await.unwrap(), 2);
        assert_eq!(upserter.upsert("A2", &BTreeMap::new()).await.unwrap(), 3);
        assert_eq!(upserter.upsert("A1", &BTreeMap::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn header_lookup_is_case_insensitive_for_the_code_column() {
        let store = MemoryStore::from_rows(vec![vec!["code"]]);
        let upserter = RowUpserter::new(store, "CODE").await;
        assert!(upserter.is_ok());
    }
}
