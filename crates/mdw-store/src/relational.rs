//! Relational store seam: execute SQL text with bind parameters, fetch rows
//! back as ordered mappings, commit, close.

use async_trait::async_trait;
use mdw_core::{RowSet, SqlValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Recoverable absent-resource case; the table replacer swallows this on
    /// drop instead of propagating it.
    #[error("table does not exist: {0}")]
    MissingTable(String),
    /// Connection could not be established at all. Fatal and propagated.
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("statement failed: {0}")]
    Sql(String),
    #[error("row decode failed: {0}")]
    Decode(String),
    #[error("connection already closed")]
    Closed,
}

#[async_trait]
pub trait RelationalStore: Send {
    /// Execute one statement with positional `?` bind parameters, returning
    /// the affected-row count.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError>;

    /// Execute a read query and return every row, preserving column order.
    async fn fetch_all(&mut self, sql: &str) -> Result<RowSet, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn close(&mut self) -> Result<(), StoreError>;
}
