//! Schema bookkeeping: table/column creation, widening and dropping.
//!
//! All DDL funnels through here and checks the frozen flag first. While
//! frozen, every DDL call degrades to a no-op that reports
//! [`DdlOutcome::Frozen`] instead of raising; callers that ignore the
//! outcome silently skip schema changes. That sharp edge is intentional and
//! matches locked-schema production deployments.

use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{BeanError, Result};
use crate::infer::ColumnType;
use crate::writer::{LOCK_TABLE, REGISTRY_TABLE};

/// What a DDL request actually did. `Frozen` is a status, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlOutcome {
    /// The schema was changed.
    Applied,
    /// The schema already satisfied the request.
    Unchanged,
    /// The schema is frozen; nothing happened.
    Frozen,
}

impl DdlOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, DdlOutcome::Applied)
    }
    pub fn frozen(&self) -> bool {
        matches!(self, DdlOutcome::Frozen)
    }
}

impl Engine {
    /// Tables owned by this engine (the type registry), or every table in
    /// the store when `include_foreign` is set.
    pub fn list_tables(&self, include_foreign: bool) -> Result<Vec<String>> {
        let sql = if include_foreign {
            self.writer.all_tables()
        } else {
            self.writer.registered_tables()
        };
        self.db.fetch_column(&sql, &[])
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.list_tables(true)?.iter().any(|t| t == table))
    }

    /// Declared column types of a table, id column excluded, in declaration
    /// order.
    pub fn column_types(&self, table: &str) -> Result<Vec<(String, ColumnType)>> {
        let rows = self.db.fetch_rows(&self.writer.table_info(table), &[])?;
        let mut columns = Vec::new();
        for row in rows {
            let mut name = None;
            let mut declared = None;
            for (column, value) in row {
                match (column.as_str(), value) {
                    ("name", rusqlite::types::Value::Text(n)) => name = Some(n),
                    ("type", rusqlite::types::Value::Text(t)) => declared = Some(t),
                    _ => {}
                }
            }
            if let (Some(name), Some(declared)) = (name, declared) {
                if name != "id" {
                    columns.push((name, ColumnType::from_sql_name(&declared)));
                }
            }
        }
        Ok(columns)
    }

    /// Creates the table (with its primary key column) and registers it.
    pub fn ensure_table(&mut self, table: &str) -> Result<DdlOutcome> {
        if self.is_frozen() {
            return Ok(DdlOutcome::Frozen);
        }
        if self.table_exists(table)? {
            return Ok(DdlOutcome::Unchanged);
        }
        self.db.exec(&self.writer.create_table(table), &[])?;
        self.db.exec(&self.writer.register_table(), &[&table])?;
        debug!(table, "created table");
        Ok(DdlOutcome::Applied)
    }

    /// Creates the column, or widens it when it exists with a narrower
    /// declared type. Widening never loses data: every value a narrower rung
    /// holds is valid at the wider rung.
    pub fn ensure_column(&mut self, table: &str, column: &str, kind: ColumnType) -> Result<DdlOutcome> {
        if self.is_frozen() {
            return Ok(DdlOutcome::Frozen);
        }
        let columns = self.column_types(table)?;
        match columns.iter().find(|(name, _)| name == column) {
            None => {
                self.db.exec(&self.writer.add_column(table, column, kind), &[])?;
                debug!(table, column, %kind, "added column");
                Ok(DdlOutcome::Applied)
            }
            Some((_, declared)) if declared.rank() >= kind.rank() => Ok(DdlOutcome::Unchanged),
            Some((_, declared)) => {
                info!(table, column, from = %declared, to = %kind, "widening column");
                let widened: Vec<(String, ColumnType)> = columns
                    .iter()
                    .map(|(name, t)| {
                        if name == column {
                            (name.clone(), kind)
                        } else {
                            (name.clone(), *t)
                        }
                    })
                    .collect();
                self.rebuild_table(table, &widened)?;
                Ok(DdlOutcome::Applied)
            }
        }
    }

    pub fn drop_table(&mut self, table: &str) -> Result<DdlOutcome> {
        if self.is_frozen() {
            return Ok(DdlOutcome::Frozen);
        }
        if table == REGISTRY_TABLE || table == LOCK_TABLE {
            return Err(BeanError::InvalidArgument(format!(
                "table '{table}' belongs to the engine"
            )));
        }
        if !self.table_exists(table)? {
            return Ok(DdlOutcome::Unchanged);
        }
        self.db.exec(&self.writer.drop_table(table), &[])?;
        self.db.exec(&self.writer.unregister_table(), &[&table])?;
        debug!(table, "dropped table");
        Ok(DdlOutcome::Applied)
    }

    pub fn drop_column(&mut self, table: &str, column: &str) -> Result<DdlOutcome> {
        if self.is_frozen() {
            return Ok(DdlOutcome::Frozen);
        }
        let columns = self.column_types(table)?;
        if !columns.iter().any(|(name, _)| name == column) {
            return Ok(DdlOutcome::Unchanged);
        }
        let remaining: Vec<(String, ColumnType)> = columns
            .into_iter()
            .filter(|(name, _)| name != column)
            .collect();
        self.rebuild_table(table, &remaining)?;
        debug!(table, column, "dropped column");
        Ok(DdlOutcome::Applied)
    }

    /// Redeclares a table with the given columns, copying all rows through a
    /// shadow table. SQLite has no `alter column`, so both widening and the
    /// optimizer's narrowing pass go through here.
    pub(crate) fn rebuild_table(&mut self, table: &str, columns: &[(String, ColumnType)]) -> Result<()> {
        self.db.exec_batch(&self.writer.rebuild_table(table, columns))
    }
}
