//! Reading, writing and deleting single beans.
//!
//! `set` drives the whole adaptive pipeline: validation, type inference,
//! schema creation/widening, the lock protocol, and finally the row upsert.
//! `get` hydrates a bean back using the declared column types, and `trash`
//! cascades through every relation table that references the bean.

use rusqlite::types::{ToSql, Value as SqlValue};
use tracing::debug;

use crate::adapter::SqlRow;
use crate::bean::{check_bean, Bean, Value};
use crate::engine::Engine;
use crate::error::Result;
use crate::infer::{infer, ColumnType};
use crate::writer::junction_columns;

/// What a `set` call did. `skipped` names the properties whose columns could
/// not be created because the schema is frozen; their values were not
/// written, while the row write for existing columns still went through.
#[derive(Debug)]
pub struct SetReport {
    pub id: i64,
    pub skipped: Vec<String>,
}

/// Aggregate statistic selector for [`Engine::stat_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Sum,
    Avg,
    Min,
    Max,
}

impl Stat {
    fn sql_function(&self) -> &'static str {
        match self {
            Stat::Sum => "sum",
            Stat::Avg => "avg",
            Stat::Min => "min",
            Stat::Max => "max",
        }
    }
}

impl Engine {
    /// Validates and stores a bean. A transient bean (`id == 0`) is inserted
    /// and the store-assigned id is written back onto it; a persisted bean is
    /// updated in place. Schema is inferred and widened per property first,
    /// and the lock protocol runs before any row write.
    pub fn set(&mut self, bean: &mut Bean) -> Result<SetReport> {
        check_bean(bean, &self.filter)?;
        let table = self.filter.table_name(bean.type_name());

        self.ensure_table(&table)?;
        if !self.table_exists(&table)? {
            // frozen schema and the type has no table: nothing can land
            let skipped = bean.properties().map(|(name, _)| name.to_string()).collect();
            return Ok(SetReport { id: bean.id, skipped });
        }
        for (name, value) in bean.properties() {
            let wanted = infer(value);
            // DDL may report Frozen here; the skip is picked up below by
            // comparing against the columns that actually exist.
            let _ = self.ensure_column(&table, name, wanted)?;
        }
        let existing = self.column_types(&table)?;
        let mut writable: Vec<(&str, &Value)> = Vec::new();
        let mut skipped = Vec::new();
        for (name, value) in bean.properties() {
            if existing.iter().any(|(column, _)| column == name) {
                writable.push((name, value));
            } else {
                skipped.push(name.to_string());
            }
        }

        if self.locking() {
            self.open_bean(bean, true)?;
        }

        if bean.is_transient() {
            if writable.is_empty() {
                self.db.exec(&self.writer.insert_blank_row(&table), &[])?;
            } else {
                let columns: Vec<&str> = writable.iter().map(|(name, _)| *name).collect();
                let params: Vec<&dyn ToSql> =
                    writable.iter().map(|(_, value)| *value as &dyn ToSql).collect();
                self.db.exec(&self.writer.insert_row(&table, &columns), &params)?;
            }
            bean.id = self.db.last_insert_id();
            debug!(%table, id = bean.id, "inserted bean");
        } else if !writable.is_empty() {
            let columns: Vec<&str> = writable.iter().map(|(name, _)| *name).collect();
            let mut params: Vec<&dyn ToSql> =
                writable.iter().map(|(_, value)| *value as &dyn ToSql).collect();
            params.push(&bean.id);
            self.db.exec(&self.writer.update_row(&table, &columns), &params)?;
            debug!(%table, id = bean.id, "updated bean");
        }
        Ok(SetReport { id: bean.id, skipped })
    }

    /// Fetches a bean by type and id; `None` when no row matches.
    pub fn get(&mut self, type_name: &str, id: i64) -> Result<Option<Bean>> {
        let table = self.filter.table_name(type_name);
        if !self.table_exists(&table)? {
            return Ok(None);
        }
        match self.db.fetch_row(&self.writer.select_row(&table), &[&id])? {
            None => Ok(None),
            Some(row) => Ok(Some(self.hydrate_bean(&table, row)?)),
        }
    }

    /// Deletes the bean's row and cascades through every registered junction
    /// and tree table involving its type. Trashing a bean that was never
    /// stored, or was already trashed, is a no-op.
    pub fn trash(&mut self, bean: &Bean) -> Result<()> {
        check_bean(bean, &self.filter)?;
        if bean.is_transient() {
            return Ok(());
        }
        let table = self.filter.table_name(bean.type_name());
        if self.table_exists(&table)? {
            self.db.exec(&self.writer.delete_row(&table), &[&bean.id])?;
        }
        for relation in self.list_tables(false)? {
            for column in referencing_columns(&relation, &table) {
                self.db.exec(
                    &self.writer.delete_by_column(&relation, &column),
                    &[&bean.id],
                )?;
            }
        }
        debug!(%table, id = bean.id, "trashed bean");
        Ok(())
    }

    /// Whether a (type, id) combination exists in the store.
    pub fn exists(&mut self, type_name: &str, id: i64) -> Result<bool> {
        let table = self.filter.table_name(type_name);
        if !self.table_exists(&table)? {
            return Ok(false);
        }
        let n: Option<i64> = self.db.fetch_scalar(&self.writer.bean_exists(&table), &[&id])?;
        Ok(n.unwrap_or(0) > 0)
    }

    /// Number of stored beans of a type; 0 when the table does not exist.
    pub fn count_of(&mut self, type_name: &str) -> Result<i64> {
        let table = self.filter.table_name(type_name);
        if !self.table_exists(&table)? {
            return Ok(0);
        }
        let n: Option<i64> = self.db.fetch_scalar(&self.writer.count(&table), &[])?;
        Ok(n.unwrap_or(0))
    }

    /// A simple aggregate over one property; 0.0 when the table or column is
    /// absent or holds no rows.
    pub fn stat_of(&mut self, type_name: &str, field: &str, stat: Stat) -> Result<f64> {
        let table = self.filter.table_name(type_name);
        let field = self.filter.property_name(field);
        if !self.table_exists(&table)? {
            return Ok(0.0);
        }
        if !self.column_types(&table)?.iter().any(|(name, _)| *name == field) {
            return Ok(0.0);
        }
        let n: Option<Option<f64>> = self
            .db
            .fetch_scalar(&self.writer.stat(&table, stat.sql_function(), &field), &[])?;
        Ok(n.flatten().unwrap_or(0.0))
    }

    /// Removes every bean of a type; the table itself stays.
    pub fn trash_all(&mut self, type_name: &str) -> Result<()> {
        let table = self.filter.table_name(type_name);
        if self.table_exists(&table)? {
            self.db.exec(&self.writer.delete_all(&table), &[])?;
        }
        Ok(())
    }

    /// Loads a collection of beans by id in one round trip, in id order.
    /// Unknown ids are simply absent from the result.
    pub fn load_all(&mut self, type_name: &str, ids: &[i64]) -> Result<Vec<Bean>> {
        let table = self.filter.table_name(type_name);
        if ids.is_empty() || !self.table_exists(&table)? {
            return Ok(Vec::new());
        }
        let params: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
        let rows = self
            .db
            .fetch_rows(&self.writer.select_rows_in(&table, ids.len()), &params)?;
        rows.into_iter()
            .map(|row| self.hydrate_bean(&table, row))
            .collect()
    }

    /// Rebuilds a bean from a fetched row, mapping each stored value through
    /// the column's declared rung on the type ladder.
    pub(crate) fn hydrate_bean(&self, table: &str, row: SqlRow) -> Result<Bean> {
        let declared = self.column_types(table)?;
        let mut bean = Bean::new(table);
        for (column, value) in row {
            if column == "id" {
                if let SqlValue::Integer(id) = value {
                    bean.id = id;
                }
                continue;
            }
            let kind = declared
                .iter()
                .find(|(name, _)| *name == column)
                .map(|(_, kind)| *kind)
                .unwrap_or(ColumnType::Binary);
            if let Some(value) = hydrate_value(kind, value) {
                bean.set_prop(column, value);
            }
        }
        Ok(bean)
    }
}

/// Maps a stored SQL value back to a tagged scalar according to the column's
/// declared type. `None` for SQL nulls (the property is simply absent).
fn hydrate_value(kind: ColumnType, value: SqlValue) -> Option<Value> {
    match (kind, value) {
        (_, SqlValue::Null) => None,
        (ColumnType::Boolean, SqlValue::Integer(i)) => Some(Value::Bool(i != 0)),
        (ColumnType::Integer, SqlValue::Integer(i)) => Some(Value::Int(i)),
        (ColumnType::Float, SqlValue::Real(f)) => Some(Value::Float(f)),
        (ColumnType::Float, SqlValue::Integer(i)) => Some(Value::Float(i as f64)),
        (ColumnType::Binary, SqlValue::Blob(b)) => Some(Value::Binary(b)),
        (ColumnType::Binary, SqlValue::Text(t)) => Some(Value::Binary(t.into_bytes())),
        (_, SqlValue::Text(t)) => Some(Value::Text(t)),
        (_, SqlValue::Integer(i)) => Some(Value::Text(i.to_string())),
        (_, SqlValue::Real(f)) => Some(Value::Text(f.to_string())),
        (_, SqlValue::Blob(b)) => Some(Value::Binary(b)),
    }
}

/// The id columns inside a relation table that point at beans of `table`.
/// Junction tables are `a_b` (one underscore, sorted types); tree tables are
/// `pc_parent_child`. Anything else references nothing.
fn referencing_columns(relation: &str, table: &str) -> Vec<String> {
    if let Some(rest) = relation.strip_prefix("pc_") {
        // tree tables have two type names after the prefix; "pc_x" is a
        // plain junction involving a type named "pc"
        if let Some((parent, child)) = rest.split_once('_') {
            let mut columns = Vec::new();
            if parent == table {
                columns.push("parent_id".to_string());
            }
            if child == table {
                columns.push("child_id".to_string());
            }
            return columns;
        }
    }
    if let Some((a, b)) = relation.split_once('_') {
        if b.contains('_') {
            return Vec::new();
        }
        if a == table && b == table {
            let (left, right) = junction_columns(table, table);
            return vec![left, right];
        }
        if a == table || b == table {
            return vec![format!("{table}_id")];
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_tables_are_classified_by_name() {
        assert_eq!(referencing_columns("group_user", "user"), vec!["user_id"]);
        assert_eq!(referencing_columns("group_user", "group"), vec!["group_id"]);
        assert_eq!(
            referencing_columns("user_user", "user"),
            vec!["user_id", "user2_id"]
        );
        assert_eq!(
            referencing_columns("pc_page_page", "page"),
            vec!["parent_id", "child_id"]
        );
        assert!(referencing_columns("group_user", "book").is_empty());
        assert!(referencing_columns("user", "user").is_empty());
    }

    #[test]
    fn hydration_follows_the_declared_rung() {
        assert_eq!(
            hydrate_value(ColumnType::Boolean, SqlValue::Integer(1)),
            Some(Value::Bool(true))
        );
        assert_eq!(
            hydrate_value(ColumnType::Float, SqlValue::Integer(3)),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            hydrate_value(ColumnType::Text, SqlValue::Integer(3)),
            Some(Value::Text("3".into()))
        );
        assert_eq!(hydrate_value(ColumnType::Text, SqlValue::Null), None);
    }
}
