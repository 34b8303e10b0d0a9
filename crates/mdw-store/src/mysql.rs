//! Thin sqlx client for the MySQL warehouse.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use mdw_core::{RowSet, SqlValue};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo};
use tracing::info;

use crate::relational::{RelationalStore, StoreError};

// MySQL SQLSTATE for "unknown table" on DROP.
const UNKNOWN_TABLE_SQLSTATE: &str = "42S02";

pub struct MySqlStore {
    conn: Option<MySqlConnection>,
}

impl MySqlStore {
    /// Connect with one uniform timeout; a failure here is the fatal
    /// configuration/credentials case and propagates to the caller.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let options = MySqlConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        let conn = tokio::time::timeout(timeout, options.connect())
            .await
            .map_err(|_| StoreError::Connect(format!("connect timed out after {timeout:?}")))?
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        info!("connected to warehouse database");
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }

    fn map_sqlx(err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNKNOWN_TABLE_SQLSTATE) {
                return StoreError::MissingTable(db.message().to_string());
            }
        }
        StoreError::Sql(err.to_string())
    }

    fn decode_row(row: &MySqlRow) -> Result<Vec<SqlValue>, StoreError> {
        let mut values = Vec::with_capacity(row.columns().len());
        for (idx, column) in row.columns().iter().enumerate() {
            let type_name = column.type_info().name().to_ascii_uppercase();
            let value = if type_name.contains("INT") {
                row.try_get::<Option<i64>, _>(idx)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Int))
            } else if type_name == "FLOAT" || type_name == "DOUBLE" {
                row.try_get::<Option<f64>, _>(idx)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Float))
            } else {
                row.try_get::<Option<String>, _>(idx)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Text))
            };
            values.push(value.map_err(|e| StoreError::Decode(e.to_string()))?);
        }
        Ok(values)
    }
}

#[async_trait]
impl RelationalStore for MySqlStore {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Text(s) => query.bind(s.clone()),
                SqlValue::Null => query.bind(Option::<String>::None),
            };
        }
        let result = query.execute(self.conn()?).await.map_err(Self::map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<RowSet, StoreError> {
        let rows = sqlx::query(sql)
            .fetch_all(self.conn()?)
            .await
            .map_err(Self::map_sqlx)?;

        let Some(first) = rows.first() else {
            return Ok(RowSet::empty());
        };
        let columns = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = rows
            .iter()
            .map(Self::decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RowSet { columns, rows })
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        sqlx::query("COMMIT")
            .execute(self.conn()?)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(Self::map_sqlx)?;
            info!("warehouse connection closed");
        }
        Ok(())
    }
}
