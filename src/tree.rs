//! Parent/child bookkeeping: a single-level hierarchy tracked in dedicated
//! `pc_{parent_type}_{child_type}` tables of `(parent_id, child_id)` rows.
//!
//! A child holds at most one parent per tracking table: adding a child
//! replaces its previous edge, which keeps `parent_of` deterministic.

use crate::bean::{check_bean, Bean};
use crate::engine::Engine;
use crate::error::Result;
use crate::infer::ColumnType;
use crate::writer::tree_table;

impl Engine {
    /// Registers `child` under `parent`, persisting either bean first when
    /// transient. Any previous parent edge of the child in this tracking
    /// table is replaced.
    pub fn add_child(&mut self, parent: &mut Bean, child: &mut Bean) -> Result<()> {
        self.ready_for_assoc(parent)?;
        self.ready_for_assoc(child)?;
        let parent_type = self.filter.table_name(parent.type_name());
        let child_type = self.filter.table_name(child.type_name());
        let table = tree_table(&parent_type, &child_type);

        self.ensure_table(&table)?;
        self.ensure_column(&table, "parent_id", ColumnType::Integer)?;
        self.ensure_column(&table, "child_id", ColumnType::Integer)?;

        self.db.exec(&self.writer.delete_by_column(&table, "child_id"), &[&child.id])?;
        self.db.exec(
            &self.writer.insert_pair(&table, "parent_id", "child_id"),
            &[&parent.id, &child.id],
        )?;
        Ok(())
    }

    /// All children of the parent, across every child type, in id order per
    /// type.
    pub fn children(&mut self, parent: &Bean) -> Result<Vec<Bean>> {
        check_bean(parent, &self.filter)?;
        let parent_type = self.filter.table_name(parent.type_name());
        let mut beans = Vec::new();
        for relation in self.list_tables(false)? {
            let Some((p, child_type)) = tree_parts(&relation) else {
                continue;
            };
            if p != parent_type || !self.table_exists(&child_type)? {
                continue;
            }
            let rows = self.db.fetch_rows(
                &self.writer.select_related(&child_type, &relation, "child_id", "parent_id"),
                &[&parent.id],
            )?;
            for row in rows {
                beans.push(self.hydrate_bean(&child_type, row)?);
            }
        }
        Ok(beans)
    }

    /// The parent of the child, or `None` when no edge references it.
    pub fn parent_of(&mut self, child: &Bean) -> Result<Option<Bean>> {
        check_bean(child, &self.filter)?;
        let child_type = self.filter.table_name(child.type_name());
        for relation in self.list_tables(false)? {
            let Some((parent_type, c)) = tree_parts(&relation) else {
                continue;
            };
            if c != child_type || !self.table_exists(&parent_type)? {
                continue;
            }
            let row = self.db.fetch_row(
                &self.writer.select_related(&parent_type, &relation, "parent_id", "child_id"),
                &[&child.id],
            )?;
            if let Some(row) = row {
                return Ok(Some(self.hydrate_bean(&parent_type, row)?));
            }
        }
        Ok(None)
    }

    /// Detaches `child` from `parent`; a no-op when no such edge exists.
    pub fn remove_child(&mut self, parent: &Bean, child: &Bean) -> Result<()> {
        check_bean(parent, &self.filter)?;
        check_bean(child, &self.filter)?;
        let parent_type = self.filter.table_name(parent.type_name());
        let child_type = self.filter.table_name(child.type_name());
        let table = tree_table(&parent_type, &child_type);
        if !self.table_exists(&table)? {
            return Ok(());
        }
        self.db.exec(
            &self.writer.delete_pair(&table, "parent_id", "child_id"),
            &[&parent.id, &child.id],
        )?;
        Ok(())
    }
}

/// Splits a tracking-table name into its parent and child type names.
fn tree_parts(relation: &str) -> Option<(String, String)> {
    let rest = relation.strip_prefix("pc_")?;
    let (parent, child) = rest.split_once('_')?;
    if child.contains('_') {
        return None;
    }
    Some((parent.to_string(), child.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_table_names_parse_back() {
        assert_eq!(
            tree_parts("pc_page_page"),
            Some(("page".to_string(), "page".to_string()))
        );
        assert_eq!(
            tree_parts("pc_site_page"),
            Some(("site".to_string(), "page".to_string()))
        );
        assert_eq!(tree_parts("group_user"), None);
        assert_eq!(tree_parts("pc_x"), None);
    }
}
