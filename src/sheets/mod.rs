//! The remote tabular store: the capability trait the upsert engine runs
//! against, the Google Sheets adapter, and an in-memory fake for tests.

pub mod api;
pub mod auth;
pub mod memory;
pub mod upsert;

use anyhow::Result;
use async_trait::async_trait;

/// One cell write destined for (row, col), both 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

/// What the upsert engine needs from a tabular store. Rows and columns are
/// 1-based; row 1 is the header row.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// The header row, trimmed, in column order.
    async fn read_header(&self) -> Result<Vec<String>>;

    /// Every populated value of a column from row 1 down to the last
    /// non-empty cell, header included.
    async fn read_column(&self, col: usize) -> Result<Vec<String>>;

    /// Writes `values` into row `row` starting at column 1.
    async fn write_row(&mut self, row: usize, values: &[String]) -> Result<()>;

    /// Writes a batch of discontiguous cells in one round trip.
    async fn write_cells(&mut self, writes: &[CellWrite]) -> Result<()>;

    /// Appends a row after the last populated row.
    async fn append_row(&mut self, values: &[String]) -> Result<()>;
}
