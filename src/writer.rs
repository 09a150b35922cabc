//! The query writer seam.
//!
//! Every SQL statement the engine issues is rendered by a [`QueryWriter`],
//! so the rest of the crate never concatenates SQL itself. Identifiers are
//! sanitized by [`crate::filter::StrictFilter`] before they reach the writer;
//! values travel separately as bound parameters. [`SqliteWriter`] is the
//! bundled dialect.

use crate::infer::ColumnType;

/// Names of the engine's own meta tables. These are never registered in the
/// type registry and never dropped. The double underscore keeps them outside
/// the relation-table grammar: sanitized type names contain no underscores,
/// so no junction or tree table can ever spell `x__y`.
pub const REGISTRY_TABLE: &str = "bb__registry";
pub const LOCK_TABLE: &str = "bb__lock";

/// Scratch table used by [`QueryWriter::rebuild_table`]; same naming rule.
pub const SHADOW_TABLE: &str = "bb__shadow";

pub trait QueryWriter {
    // session
    fn begin(&self) -> String;
    fn commit(&self) -> String;
    fn rollback(&self) -> String;
    // meta tables
    fn setup_registry(&self) -> String;
    fn setup_locking(&self) -> String;
    // registry
    fn register_table(&self) -> String;
    fn unregister_table(&self) -> String;
    fn registered_tables(&self) -> String;
    fn truncate_registry(&self) -> String;
    // introspection
    fn all_tables(&self) -> String;
    fn table_info(&self, table: &str) -> String;
    // DDL
    fn create_table(&self, table: &str) -> String;
    fn add_column(&self, table: &str, column: &str, kind: ColumnType) -> String;
    /// SQLite cannot redeclare a column in place; altering a type or dropping
    /// a column rebuilds the table through a shadow copy.
    fn rebuild_table(&self, table: &str, columns: &[(String, ColumnType)]) -> String;
    fn drop_table(&self, table: &str) -> String;
    // row CRUD
    fn select_row(&self, table: &str) -> String;
    fn select_rows_in(&self, table: &str, how_many: usize) -> String;
    fn insert_row(&self, table: &str, columns: &[&str]) -> String;
    fn insert_blank_row(&self, table: &str) -> String;
    fn update_row(&self, table: &str, columns: &[&str]) -> String;
    fn delete_row(&self, table: &str) -> String;
    fn delete_all(&self, table: &str) -> String;
    fn delete_by_column(&self, table: &str, column: &str) -> String;
    // aggregates
    fn bean_exists(&self, table: &str) -> String;
    fn count(&self, table: &str) -> String;
    fn stat(&self, table: &str, function: &str, field: &str) -> String;
    fn column_values(&self, table: &str, column: &str) -> String;
    // locks
    fn select_lock(&self) -> String;
    fn upsert_lock(&self) -> String;
    fn release_locks(&self) -> String;
    fn release_all_locks(&self) -> String;
    // relations
    fn pair_exists(&self, table: &str, left: &str, right: &str) -> String;
    fn insert_pair(&self, table: &str, left: &str, right: &str) -> String;
    fn delete_pair(&self, table: &str, left: &str, right: &str) -> String;
    fn select_related(&self, target: &str, junction: &str, target_col: &str, source_col: &str) -> String;
    fn count_related(&self, junction: &str, column: &str) -> String;
    /// As `count_related`, excluding rows where `other` holds the same id;
    /// used to count the mirrored role of a self-association without
    /// counting a self-loop row twice.
    fn count_related_excluding(&self, junction: &str, column: &str, other: &str) -> String;
}

#[derive(Debug, Default)]
pub struct SqliteWriter;

impl SqliteWriter {
    pub fn new() -> Self {
        SqliteWriter
    }
}

impl QueryWriter for SqliteWriter {
    fn begin(&self) -> String {
        "begin".into()
    }
    fn commit(&self) -> String {
        "commit".into()
    }
    fn rollback(&self) -> String {
        "rollback".into()
    }
    fn setup_registry(&self) -> String {
        format!(
            "create table if not exists {REGISTRY_TABLE} (
                tbl text not null,
                constraint unique_registered_table primary key (tbl)
            )"
        )
    }
    fn setup_locking(&self) -> String {
        format!(
            "create table if not exists {LOCK_TABLE} (
                tbl text not null,
                id integer not null,
                owner_key text not null,
                locked_at integer not null,
                constraint one_lock_per_bean primary key (tbl, id)
            )"
        )
    }
    fn register_table(&self) -> String {
        format!("insert or ignore into {REGISTRY_TABLE} (tbl) values (?)")
    }
    fn unregister_table(&self) -> String {
        format!("delete from {REGISTRY_TABLE} where tbl = ?")
    }
    fn registered_tables(&self) -> String {
        format!("select tbl from {REGISTRY_TABLE} order by tbl")
    }
    fn truncate_registry(&self) -> String {
        format!("delete from {REGISTRY_TABLE}")
    }
    fn all_tables(&self) -> String {
        "select name from sqlite_master where type = 'table' order by name".into()
    }
    fn table_info(&self, table: &str) -> String {
        format!("pragma table_info({table})")
    }
    fn create_table(&self, table: &str) -> String {
        format!("create table {table} (id integer primary key autoincrement)")
    }
    fn add_column(&self, table: &str, column: &str, kind: ColumnType) -> String {
        format!("alter table {table} add column {column} {}", kind.sql_name())
    }
    fn rebuild_table(&self, table: &str, columns: &[(String, ColumnType)]) -> String {
        let declarations: Vec<String> = columns
            .iter()
            .map(|(name, kind)| format!("{name} {}", kind.sql_name()))
            .collect();
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        // a stale shadow can linger after an interrupted rebuild
        format!(
            "drop table if exists {SHADOW_TABLE};
            create table {SHADOW_TABLE} (id integer primary key autoincrement{}{});
            insert into {SHADOW_TABLE} (id{}{}) select id{}{} from {table};
            drop table {table};
            alter table {SHADOW_TABLE} rename to {table};",
            if declarations.is_empty() { "" } else { ", " },
            declarations.join(", "),
            if names.is_empty() { "" } else { ", " },
            names.join(", "),
            if names.is_empty() { "" } else { ", " },
            names.join(", "),
        )
    }
    fn drop_table(&self, table: &str) -> String {
        format!("drop table if exists {table}")
    }
    fn select_row(&self, table: &str) -> String {
        format!("select * from {table} where id = ?")
    }
    fn select_rows_in(&self, table: &str, how_many: usize) -> String {
        let slots = vec!["?"; how_many].join(", ");
        format!("select * from {table} where id in ({slots}) order by id")
    }
    fn insert_row(&self, table: &str, columns: &[&str]) -> String {
        let slots = vec!["?"; columns.len()].join(", ");
        format!(
            "insert into {table} ({}) values ({slots})",
            columns.join(", ")
        )
    }
    fn insert_blank_row(&self, table: &str) -> String {
        format!("insert into {table} default values")
    }
    fn update_row(&self, table: &str, columns: &[&str]) -> String {
        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
        format!(
            "update {table} set {} where id = ?",
            assignments.join(", ")
        )
    }
    fn delete_row(&self, table: &str) -> String {
        format!("delete from {table} where id = ?")
    }
    fn delete_all(&self, table: &str) -> String {
        format!("delete from {table}")
    }
    fn delete_by_column(&self, table: &str, column: &str) -> String {
        format!("delete from {table} where {column} = ?")
    }
    fn bean_exists(&self, table: &str) -> String {
        format!("select count(*) from {table} where id = ?")
    }
    fn count(&self, table: &str) -> String {
        format!("select count(*) from {table}")
    }
    fn stat(&self, table: &str, function: &str, field: &str) -> String {
        format!("select {function}({field}) from {table}")
    }
    fn column_values(&self, table: &str, column: &str) -> String {
        format!("select {column} from {table} where {column} is not null")
    }
    fn select_lock(&self) -> String {
        format!("select owner_key, locked_at from {LOCK_TABLE} where tbl = ? and id = ?")
    }
    fn upsert_lock(&self) -> String {
        format!(
            "insert into {LOCK_TABLE} (tbl, id, owner_key, locked_at) values (?, ?, ?, ?)
            on conflict (tbl, id) do update set
                owner_key = excluded.owner_key,
                locked_at = excluded.locked_at"
        )
    }
    fn release_locks(&self) -> String {
        format!("delete from {LOCK_TABLE} where owner_key = ?")
    }
    fn release_all_locks(&self) -> String {
        format!("delete from {LOCK_TABLE}")
    }
    fn pair_exists(&self, table: &str, left: &str, right: &str) -> String {
        format!("select count(*) from {table} where {left} = ? and {right} = ?")
    }
    fn insert_pair(&self, table: &str, left: &str, right: &str) -> String {
        format!("insert into {table} ({left}, {right}) values (?, ?)")
    }
    fn delete_pair(&self, table: &str, left: &str, right: &str) -> String {
        format!("delete from {table} where {left} = ? and {right} = ?")
    }
    fn select_related(&self, target: &str, junction: &str, target_col: &str, source_col: &str) -> String {
        format!(
            "select t.* from {target} t
            join {junction} j on j.{target_col} = t.id
            where j.{source_col} = ? order by t.id"
        )
    }
    fn count_related(&self, junction: &str, column: &str) -> String {
        format!("select count(*) from {junction} where {column} = ?")
    }
    fn count_related_excluding(&self, junction: &str, column: &str, other: &str) -> String {
        format!("select count(*) from {junction} where {column} = ? and {other} != ?")
    }
}

/// The canonical junction table name for a pair of (sanitized) type names:
/// the lexicographically sorted pair joined with `_`. Pure and commutative,
/// so `link(a, b)` and `link(b, a)` always target the same table.
pub fn junction_table(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}_{b}")
    } else {
        format!("{b}_{a}")
    }
}

/// Column names inside a junction table. A self-association keeps one table
/// with two distinguishable roles instead of a second table.
pub fn junction_columns(own: &str, other: &str) -> (String, String) {
    if own == other {
        (format!("{own}_id"), format!("{own}2_id"))
    } else {
        (format!("{own}_id"), format!("{other}_id"))
    }
}

/// The tracking table for parent/child edges between two types.
pub fn tree_table(parent: &str, child: &str) -> String {
    format!("pc_{parent}_{child}")
}
