//! In-memory [`TableStore`] backed by a plain grid. Lets the upsert engine
//! run in tests without a network or credentials.

use anyhow::Result;
use async_trait::async_trait;

use super::{CellWrite, TableStore};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    grid: Vec<Vec<String>>,
}

impl MemoryStore {
    pub fn from_rows(rows: Vec<Vec<&str>>) -> Self {
        Self {
            grid: rows
                .into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }

    /// The cell at (row, col), 1-based; empty string when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.grid
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Number of rows with at least one non-blank cell.
    pub fn populated_rows(&self) -> usize {
        self.grid
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .count()
    }

    fn last_populated_row(&self) -> usize {
        self.grid
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }

    fn set(&mut self, row: usize, col: usize, value: &str) {
        if self.grid.len() < row {
            self.grid.resize(row, Vec::new());
        }
        let cells = &mut self.grid[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn read_header(&self) -> Result<Vec<String>> {
        Ok(self
            .grid
            .first()
            .map(|row| row.iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default())
    }

    async fn read_column(&self, col: usize) -> Result<Vec<String>> {
        let mut values: Vec<String> = self
            .grid
            .iter()
            .map(|row| row.get(col - 1).cloned().unwrap_or_default())
            .collect();
        while values.last().is_some_and(|v| v.trim().is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn write_row(&mut self, row: usize, values: &[String]) -> Result<()> {
        for (offset, value) in values.iter().enumerate() {
            self.set(row, offset + 1, value);
        }
        Ok(())
    }

    async fn write_cells(&mut self, writes: &[CellWrite]) -> Result<()> {
        for write in writes {
            self.set(write.row, write.col, &write.value);
        }
        Ok(())
    }

    async fn append_row(&mut self, values: &[String]) -> Result<()> {
        let row = self.last_populated_row() + 1;
        self.write_row(row, values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn column_reads_stop_at_last_populated_cell() {
        let store = MemoryStore::from_rows(vec![
            vec!["Code", "Price"],
            vec!["A1", "10"],
            vec!["", "20"],
            vec!["", ""],
        ]);
        assert_eq!(store.read_column(1).await.unwrap(), vec!["Code", "A1"]);
        assert_eq!(
            store.read_column(2).await.unwrap(),
            vec!["Price", "10", "20"]
        );
    }

    #[tokio::test]
    async fn append_lands_after_the_last_populated_row() {
        let mut store = MemoryStore::from_rows(vec![vec!["Code"], vec!["A1"]]);
        store
            .append_row(&["A2".to_string(), "5".to_string()])
            .await
            .unwrap();
        assert_eq!(store.cell(3, 1), "A2");
        assert_eq!(store.cell(3, 2), "5");
    }

    #[tokio::test]
    async fn writes_grow_the_grid_as_needed() {
        let mut store = MemoryStore::default();
        store
            .write_cells(&[CellWrite {
                row: 4,
                col: 3,
                value: "x".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(store.cell(4, 3), "x");
        assert_eq!(store.cell(1, 1), "");
    }
}
