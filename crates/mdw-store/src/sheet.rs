//! Spreadsheet seam: overwrite a fixed range with a 2D text grid.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheet endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Status returned by the spreadsheet endpoint after an overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetUpdate {
    #[serde(rename = "updatedRange")]
    pub updated_range: String,
    #[serde(rename = "updatedRows")]
    pub updated_rows: u64,
    #[serde(rename = "updatedCells")]
    pub updated_cells: u64,
}

#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Overwrite the sheet's range starting at the fixed anchor cell with
    /// `grid` (header row plus data rows), not appending.
    async fn overwrite(&self, grid: &[Vec<String>]) -> Result<SheetUpdate, SheetError>;
}

/// Google Sheets values client: one RAW `values.update` call per overwrite.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    spreadsheet_id: String,
    sheet_name: String,
    token: String,
}

impl SheetsClient {
    pub fn new(
        spreadsheet_id: &str,
        sheet_name: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, SheetError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl SheetWriter for SheetsClient {
    async fn overwrite(&self, grid: &[Vec<String>]) -> Result<SheetUpdate, SheetError> {
        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}!A1",
            self.spreadsheet_id, self.sheet_name
        );
        let resp = self
            .http
            .put(&url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.token)
            .json(&json!({ "values": grid }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let update: SheetUpdate = resp.json().await?;
        info!(
            range = %update.updated_range,
            rows = update.updated_rows,
            cells = update.updated_cells,
            "sheet range overwritten"
        );
        Ok(update)
    }
}

/// In-memory sheet endpoint; remembers the last grid it was given.
#[derive(Debug, Default)]
pub struct MemorySheet {
    last_grid: Mutex<Option<Vec<Vec<String>>>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_grid(&self) -> Option<Vec<Vec<String>>> {
        self.last_grid.lock().await.clone()
    }
}

#[async_trait]
impl SheetWriter for MemorySheet {
    async fn overwrite(&self, grid: &[Vec<String>]) -> Result<SheetUpdate, SheetError> {
        let rows = grid.len() as u64;
        let cells = grid.iter().map(|row| row.len() as u64).sum();
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        *self.last_grid.lock().await = Some(grid.to_vec());
        Ok(SheetUpdate {
            updated_range: format!("Sheet1!A1:R{}C{}", rows.max(1), width.max(1)),
            updated_rows: rows,
            updated_cells: cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sheet_counts_rows_and_cells() {
        let sheet = MemorySheet::new();
        let grid = vec![
            vec!["id".to_string(), "name".to_string()],
            vec!["18".to_string(), "Drama".to_string()],
        ];
        let update = sheet.overwrite(&grid).await.expect("overwrite");
        assert_eq!(update.updated_rows, 2);
        assert_eq!(update.updated_cells, 4);
        assert_eq!(sheet.last_grid().await.unwrap(), grid);
    }
}
