//! Many-to-many associations through auto-generated junction tables.
//!
//! The junction table name is a pure function of the two type names (sorted
//! lexicographically), so linking A to B and linking B to A always land in
//! the same physical table. A pair of beans sharing a type keeps a single
//! table with two distinguishable id columns instead.

use tracing::debug;

use crate::bean::{check_bean, Bean};
use crate::engine::Engine;
use crate::error::Result;
use crate::infer::ColumnType;
use crate::writer::{junction_columns, junction_table};

impl Engine {
    /// Associates two beans, persisting either one first when transient.
    /// Linking an already linked pair is a no-op: the unordered pair is
    /// checked for existence before insert, so no duplicate edges appear.
    pub fn link(&mut self, a: &mut Bean, b: &mut Bean) -> Result<()> {
        self.ready_for_assoc(a)?;
        self.ready_for_assoc(b)?;
        let type_a = self.filter.table_name(a.type_name());
        let type_b = self.filter.table_name(b.type_name());
        let junction = junction_table(&type_a, &type_b);
        let (col_a, col_b) = junction_columns(&type_a, &type_b);

        self.ensure_table(&junction)?;
        self.ensure_column(&junction, &col_a, ColumnType::Integer)?;
        self.ensure_column(&junction, &col_b, ColumnType::Integer)?;

        if self.pair_linked(&junction, type_a == type_b, &col_a, &col_b, a.id, b.id)? {
            return Ok(());
        }
        self.db.exec(
            &self.writer.insert_pair(&junction, &col_a, &col_b),
            &[&a.id, &b.id],
        )?;
        debug!(%junction, a = %a, b = %b, "linked beans");
        Ok(())
    }

    /// Removes the association between two beans; a no-op when the pair was
    /// never linked.
    pub fn break_link(&mut self, a: &Bean, b: &Bean) -> Result<()> {
        check_bean(a, &self.filter)?;
        check_bean(b, &self.filter)?;
        let type_a = self.filter.table_name(a.type_name());
        let type_b = self.filter.table_name(b.type_name());
        let junction = junction_table(&type_a, &type_b);
        if !self.table_exists(&junction)? {
            return Ok(());
        }
        let (col_a, col_b) = junction_columns(&type_a, &type_b);
        self.db.exec(
            &self.writer.delete_pair(&junction, &col_a, &col_b),
            &[&a.id, &b.id],
        )?;
        // the pair is unordered; a self-association may sit in either role
        if type_a == type_b {
            self.db.exec(
                &self.writer.delete_pair(&junction, &col_a, &col_b),
                &[&b.id, &a.id],
            )?;
        }
        Ok(())
    }

    /// All beans of `target_type` associated with the given bean.
    pub fn related(&mut self, bean: &Bean, target_type: &str) -> Result<Vec<Bean>> {
        check_bean(bean, &self.filter)?;
        let own = self.filter.table_name(bean.type_name());
        let target = self.filter.table_name(target_type);
        let junction = junction_table(&own, &target);
        if !self.table_exists(&junction)? || !self.table_exists(&target)? {
            return Ok(Vec::new());
        }
        let (own_col, target_col) = junction_columns(&own, &target);
        let mut beans = Vec::new();
        let rows = self.db.fetch_rows(
            &self.writer.select_related(&target, &junction, &target_col, &own_col),
            &[&bean.id],
        )?;
        for row in rows {
            beans.push(self.hydrate_bean(&target, row)?);
        }
        if own == target {
            // self-association: the bean may also appear in the second role
            let rows = self.db.fetch_rows(
                &self.writer.select_related(&target, &junction, &own_col, &target_col),
                &[&bean.id],
            )?;
            for row in rows {
                let partner = self.hydrate_bean(&target, row)?;
                if !beans.iter().any(|b: &Bean| b.id == partner.id) {
                    beans.push(partner);
                }
            }
        }
        Ok(beans)
    }

    /// Breaks every association of the bean, across all junction tables
    /// involving its type.
    pub fn delete_all_assoc(&mut self, bean: &Bean) -> Result<()> {
        check_bean(bean, &self.filter)?;
        let own = self.filter.table_name(bean.type_name());
        for relation in self.list_tables(false)? {
            for column in junction_refs(&relation, &own) {
                self.db.exec(
                    &self.writer.delete_by_column(&relation, &column),
                    &[&bean.id],
                )?;
            }
        }
        Ok(())
    }

    /// As [`delete_all_assoc`](Self::delete_all_assoc), restricted to the
    /// junction table pairing the bean's type with `target_type`.
    pub fn delete_all_assoc_type(&mut self, target_type: &str, bean: &Bean) -> Result<()> {
        check_bean(bean, &self.filter)?;
        let own = self.filter.table_name(bean.type_name());
        let target = self.filter.table_name(target_type);
        let junction = junction_table(&own, &target);
        if !self.table_exists(&junction)? {
            return Ok(());
        }
        let (own_col, target_col) = junction_columns(&own, &target);
        self.db.exec(&self.writer.delete_by_column(&junction, &own_col), &[&bean.id])?;
        if own == target {
            self.db.exec(&self.writer.delete_by_column(&junction, &target_col), &[&bean.id])?;
        }
        Ok(())
    }

    /// Counts associations between the bean and the given type. Returns 0
    /// when either endpoint table (or the junction) is absent.
    pub fn num_related(&mut self, target_type: &str, bean: &Bean) -> Result<i64> {
        check_bean(bean, &self.filter)?;
        let own = self.filter.table_name(bean.type_name());
        let target = self.filter.table_name(target_type);
        let junction = junction_table(&own, &target);
        if !self.table_exists(&own)? || !self.table_exists(&target)? || !self.table_exists(&junction)? {
            return Ok(0);
        }
        let (own_col, target_col) = junction_columns(&own, &target);
        let mut total = self.count_junction(&junction, &own_col, bean.id)?;
        if own == target {
            // the mirrored role, minus self-loop rows already counted above
            let n: Option<i64> = self.db.fetch_scalar(
                &self.writer.count_related_excluding(&junction, &target_col, &own_col),
                &[&bean.id, &bean.id],
            )?;
            total += n.unwrap_or(0);
        }
        Ok(total)
    }

    // Beans must be persisted before they can appear in a relation row.
    pub(crate) fn ready_for_assoc(&mut self, bean: &mut Bean) -> Result<()> {
        check_bean(bean, &self.filter)?;
        if bean.is_transient() {
            self.set(bean)?;
        }
        Ok(())
    }

    fn pair_linked(
        &mut self,
        junction: &str,
        self_assoc: bool,
        col_a: &str,
        col_b: &str,
        id_a: i64,
        id_b: i64,
    ) -> Result<bool> {
        let forward: Option<i64> = self.db.fetch_scalar(
            &self.writer.pair_exists(junction, col_a, col_b),
            &[&id_a, &id_b],
        )?;
        if forward.unwrap_or(0) > 0 {
            return Ok(true);
        }
        // only a self-association can hold the mirrored orientation; for two
        // distinct types each id lives in its own column
        if self_assoc {
            let backward: Option<i64> = self.db.fetch_scalar(
                &self.writer.pair_exists(junction, col_a, col_b),
                &[&id_b, &id_a],
            )?;
            return Ok(backward.unwrap_or(0) > 0);
        }
        Ok(false)
    }

    fn count_junction(&mut self, junction: &str, column: &str, id: i64) -> Result<i64> {
        let n: Option<i64> = self
            .db
            .fetch_scalar(&self.writer.count_related(junction, column), &[&id])?;
        Ok(n.unwrap_or(0))
    }
}

/// The id columns of `relation` that reference beans of type `own`, junction
/// tables only (tree tables are handled by [`crate::tree`]).
fn junction_refs(relation: &str, own: &str) -> Vec<String> {
    if relation.starts_with("pc_") && relation.matches('_').count() == 2 {
        return Vec::new();
    }
    match relation.split_once('_') {
        Some((a, b)) if !b.contains('_') => {
            if a == own && b == own {
                let (left, right) = junction_columns(own, own);
                vec![left, right]
            } else if a == own || b == own {
                vec![format!("{own}_id")]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}
