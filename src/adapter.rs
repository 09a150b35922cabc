//! Thin adapter over a single synchronous SQLite connection.
//!
//! Every engine operation is a blocking round trip through this adapter.
//! It returns owned rows so callers never hold statement borrows across
//! engine calls.

use rusqlite::types::{FromSql, ToSql, Value as SqlValue};
use rusqlite::Connection;

use crate::error::Result;

/// One fetched row: column names paired with owned SQL values, in select
/// order.
pub type SqlRow = Vec<(String, SqlValue)>;

pub struct SqliteAdapter {
    conn: Connection,
}

impl SqliteAdapter {
    /// Opens a file-backed database, or an in-memory one when `path` is
    /// `None`.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)?,
            None => Connection::open_in_memory()?,
        };
        Ok(Self { conn })
    }

    pub fn exec(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Executes several statements in one go; used for table rebuilds.
    pub fn exec_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn fetch_row(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Option<SqlRow>> {
        Ok(self.fetch_rows(sql, params)?.into_iter().next())
    }

    pub fn fetch_rows(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<SqlRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let mut rows = stmt.query(params)?;
        let mut fetched = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                columns.push((name.clone(), row.get::<_, SqlValue>(i)?));
            }
            fetched.push(columns);
        }
        Ok(fetched)
    }

    /// First column of every row.
    pub fn fetch_column<T: FromSql>(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get(0)?);
        }
        Ok(values)
    }

    /// First column of the first row, `None` when the query matches nothing.
    pub fn fetch_scalar<T: FromSql>(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Option<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}
