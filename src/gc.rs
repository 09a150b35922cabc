//! Maintenance passes: orphan-table reclamation and column narrowing.
//!
//! Both run only when explicitly invoked. Narrowing in particular is the
//! inverse of the widening done during writes and re-scans whole columns,
//! so it never happens as a side effect of normal operation.

use rusqlite::types::Value as SqlValue;
use tracing::info;

use crate::engine::Engine;
use crate::error::Result;
use crate::infer::{infer_str, ColumnType};
use crate::schema::DdlOutcome;

impl Engine {
    /// Drops engine tables with no corresponding active type: bean tables
    /// whose type is not listed, and junction/tree tables where either
    /// endpoint type is not listed.
    pub fn remove_unused(&mut self, active_types: &[&str]) -> Result<DdlOutcome> {
        if self.is_frozen() {
            return Ok(DdlOutcome::Frozen);
        }
        let active: Vec<String> = active_types
            .iter()
            .map(|t| self.filter.table_name(t))
            .collect();
        let is_active = |t: &str| active.iter().any(|a| a == t);
        let mut dropped = false;
        for table in self.list_tables(false)? {
            let keep = match table_endpoints(&table) {
                (a, Some(b)) => is_active(&a) && is_active(&b),
                (a, None) => is_active(&a),
            };
            if !keep {
                info!(%table, "dropping unused table");
                self.drop_table(&table)?;
                dropped = true;
            }
        }
        Ok(if dropped { DdlOutcome::Applied } else { DdlOutcome::Unchanged })
    }

    /// The maintenance pass: an optional GC round, then a narrowing round
    /// that re-infers each stored column from its actual data and tightens
    /// the declaration when every value fits a lower rung of the ladder.
    /// `table`/`column` restrict the narrowing round.
    pub fn optimize(
        &mut self,
        gc_active_types: Option<&[&str]>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<()> {
        if let Some(active) = gc_active_types {
            self.remove_unused(active)?;
        }
        if self.is_frozen() {
            return Ok(());
        }
        let targets: Vec<String> = match table {
            Some(t) => vec![self.filter.table_name(t)],
            None => self.list_tables(false)?,
        };
        for target in targets {
            if !self.table_exists(&target)? {
                continue;
            }
            // working copy; each rebuild below must see earlier narrowings
            let mut columns = self.column_types(&target)?;
            let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
            for name in &names {
                if let Some(only) = column {
                    if name != only {
                        continue;
                    }
                }
                let declared = match columns.iter().find(|(n, _)| n == name) {
                    Some((_, t)) => *t,
                    None => continue,
                };
                let Some(narrowest) = self.narrowest_fit(&target, name)? else {
                    continue;
                };
                if narrowest.rank() < declared.rank() {
                    info!(table = %target, column = %name, from = %declared, to = %narrowest, "narrowing column");
                    for slot in columns.iter_mut() {
                        if &slot.0 == name {
                            slot.1 = narrowest;
                        }
                    }
                    self.rebuild_table(&target, &columns)?;
                }
            }
        }
        Ok(())
    }

    /// Drops every registered table and truncates the registry. Refuses
    /// while frozen. Locks are reset as well, since the beans they guarded
    /// are gone.
    pub fn clean(&mut self) -> Result<DdlOutcome> {
        if self.is_frozen() {
            return Ok(DdlOutcome::Frozen);
        }
        for table in self.list_tables(false)? {
            self.drop_table(&table)?;
        }
        self.db.exec(&self.writer.truncate_registry(), &[])?;
        self.reset_all()?;
        Ok(DdlOutcome::Applied)
    }

    /// The widest rung any stored value of the column actually needs, or
    /// `None` when the column is empty or holds binary data.
    fn narrowest_fit(&self, table: &str, column: &str) -> Result<Option<ColumnType>> {
        let values: Vec<SqlValue> = self
            .db
            .fetch_column(&self.writer.column_values(table, column), &[])?;
        if values.is_empty() {
            return Ok(None);
        }
        let mut widest = ColumnType::Boolean;
        for value in values {
            let rung = match value {
                SqlValue::Null => continue,
                SqlValue::Integer(i) => infer_str(&i.to_string()),
                SqlValue::Real(f) => infer_str(&f.to_string()),
                SqlValue::Text(t) => infer_str(&t),
                SqlValue::Blob(_) => return Ok(None),
            };
            widest = ColumnType::widest(widest, rung);
        }
        Ok(Some(widest))
    }
}

/// A table's endpoint types: `(a, Some(b))` for relation tables, `(name,
/// None)` for plain bean tables.
fn table_endpoints(table: &str) -> (String, Option<String>) {
    if let Some(rest) = table.strip_prefix("pc_") {
        if let Some((parent, child)) = rest.split_once('_') {
            if !child.contains('_') {
                return (parent.to_string(), Some(child.to_string()));
            }
        }
    }
    if let Some((a, b)) = table.split_once('_') {
        if !b.contains('_') {
            return (a.to_string(), Some(b.to_string()));
        }
    }
    (table.to_string(), None)
}
