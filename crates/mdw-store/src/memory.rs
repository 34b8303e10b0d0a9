//! In-memory relational store. A test double that replays exactly the
//! statement shapes the pipeline emits (DROP TABLE, CREATE TABLE, one
//! multi-row `?`-bound INSERT, `SELECT ... FROM <table>`), recording
//! commits and close calls so failure semantics can be asserted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mdw_core::{RowSet, SqlValue};

use crate::relational::{RelationalStore, StoreError};

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemTable>,
    pub statements: Vec<String>,
    pub commits: usize,
    pub closed: bool,
    /// When set, the next INSERT fails with a statement error.
    pub fail_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_columns(&self, name: &str) -> Option<&[String]> {
        self.tables.get(name).map(|t| t.columns.as_slice())
    }

    pub fn table_rows(&self, name: &str) -> Option<&[Vec<SqlValue>]> {
        self.tables.get(name).map(|t| t.rows.as_slice())
    }

    fn word_after<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
        let start = sql.find(keyword)? + keyword.len();
        sql[start..]
            .split_whitespace()
            .next()
            .map(|w| w.trim_end_matches(';').trim_matches('('))
    }

    /// Split a column-definition list on commas outside parentheses, so
    /// types like VARCHAR(32) do not break the parse.
    fn split_defs(defs: &str) -> Vec<&str> {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        for (idx, ch) in defs.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(defs[start..idx].trim());
                    start = idx + 1;
                }
                _ => {}
            }
        }
        let tail = defs[start..].trim();
        if !tail.is_empty() {
            parts.push(tail);
        }
        parts
    }

    fn apply_drop(&mut self, sql: &str) -> Result<u64, StoreError> {
        let name = Self::word_after(sql, "DROP TABLE")
            .ok_or_else(|| StoreError::Sql(format!("unparseable drop: {sql}")))?;
        match self.tables.remove(name) {
            Some(_) => Ok(0),
            None => Err(StoreError::MissingTable(name.to_string())),
        }
    }

    fn apply_create(&mut self, sql: &str) -> Result<u64, StoreError> {
        let name = Self::word_after(sql, "CREATE TABLE")
            .ok_or_else(|| StoreError::Sql(format!("unparseable create: {sql}")))?;
        let open = sql
            .find('(')
            .ok_or_else(|| StoreError::Sql(format!("create without column list: {sql}")))?;
        let close = sql
            .rfind(')')
            .ok_or_else(|| StoreError::Sql(format!("create without column list: {sql}")))?;
        let columns = Self::split_defs(&sql[open + 1..close])
            .into_iter()
            .filter_map(|def| def.split_whitespace().next())
            .map(str::to_string)
            .collect();
        self.tables.insert(
            name.to_string(),
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(0)
    }

    fn apply_insert(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        if self.fail_inserts {
            return Err(StoreError::Sql("injected insert failure".to_string()));
        }
        let name = Self::word_after(sql, "INSERT INTO")
            .ok_or_else(|| StoreError::Sql(format!("unparseable insert: {sql}")))?;
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| StoreError::Sql(format!("insert into unknown table {name}")))?;
        let width = table.columns.len();
        if width == 0 || params.len() % width != 0 {
            return Err(StoreError::Sql(format!(
                "insert of {} params does not fill {width}-column rows",
                params.len()
            )));
        }
        let mut inserted = 0u64;
        for chunk in params.chunks(width) {
            table.rows.push(chunk.to_vec());
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        self.statements.push(sql.to_string());
        let trimmed = sql.trim_start();
        if trimmed.starts_with("DROP TABLE") {
            self.apply_drop(trimmed)
        } else if trimmed.starts_with("CREATE TABLE") {
            self.apply_create(trimmed)
        } else if trimmed.starts_with("INSERT INTO") {
            self.apply_insert(trimmed, params)
        } else {
            Err(StoreError::Sql(format!("unsupported statement: {sql}")))
        }
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<RowSet, StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        self.statements.push(sql.to_string());
        let name = Self::word_after(sql, "FROM")
            .ok_or_else(|| StoreError::Sql(format!("unsupported query: {sql}")))?;
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| StoreError::MissingTable(name.to_string()))?;
        Ok(RowSet {
            columns: table.columns.clone(),
            rows: table.rows.clone(),
        })
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        self.commits += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdw_core::CREATE_GENRES_SQL;

    #[tokio::test]
    async fn drop_of_absent_table_reports_missing_table() {
        let mut store = MemoryStore::new();
        let err = store.execute("DROP TABLE genres", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(_)));
    }

    #[tokio::test]
    async fn create_insert_select_round_trip() {
        let mut store = MemoryStore::new();
        store.execute(CREATE_GENRES_SQL, &[]).await.expect("create");
        let inserted = store
            .execute(
                "INSERT INTO genres (id, name) VALUES (?, ?), (?, ?)",
                &[
                    SqlValue::Int(18),
                    SqlValue::Text("Drama".into()),
                    SqlValue::Int(35),
                    SqlValue::Text("Comedy".into()),
                ],
            )
            .await
            .expect("insert");
        assert_eq!(inserted, 2);

        let rows = store.fetch_all("SELECT * FROM genres").await.expect("select");
        assert_eq!(rows.columns, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows[1][1], SqlValue::Text("Comedy".into()));
    }

    #[tokio::test]
    async fn varchar_lengths_do_not_break_column_parsing() {
        let mut store = MemoryStore::new();
        store
            .execute("CREATE TABLE t (a VARCHAR(16), b BIGINT)", &[])
            .await
            .expect("create");
        assert_eq!(
            store.table_columns("t").unwrap(),
            &["a".to_string(), "b".to_string()]
        );
    }
}
