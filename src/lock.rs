//! The advisory, TTL-based lock protocol.
//!
//! One lock row per (table, id), owned by a process fingerprint. The lock is
//! cooperative: it protects beans between clients that all check it, it does
//! not stop a client that ignores the protocol. A row whose timestamp is
//! older than the configured TTL is implicitly expired and not honored.

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use tracing::debug;

use crate::bean::{check_bean, Bean};
use crate::engine::Engine;
use crate::error::{BeanError, Result};

/// Outcome of opening a bean under the lock protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No live lock existed; this process now holds it.
    Acquired,
    /// This process already held the lock; its timestamp was renewed.
    Refreshed,
    /// Another process holds an unexpired lock. Only reachable with
    /// `must_lock` off; the caller proceeds without exclusivity.
    Foreign,
}

impl Engine {
    /// Opens a bean under the lock protocol. An absent or expired lock row
    /// is taken over; an own row is refreshed; an unexpired foreign row is a
    /// [`BeanError::LockConflict`] when `must_lock` is set, otherwise the
    /// call reports [`LockState::Foreign`] and proceeds advisorily.
    ///
    /// Transient beans have no row to protect and report `Acquired`.
    pub fn open_bean(&mut self, bean: &Bean, must_lock: bool) -> Result<LockState> {
        check_bean(bean, &self.filter)?;
        if bean.is_transient() {
            return Ok(LockState::Acquired);
        }
        let table = self.filter.table_name(bean.type_name());
        let now = Utc::now().timestamp();
        let current = self.db.fetch_row(&self.writer.select_lock(), &[&table, &bean.id])?;
        let state = match current.as_deref() {
            Some([(_, SqlValue::Text(owner)), (_, SqlValue::Integer(locked_at))]) => {
                let expired = now - locked_at >= self.locking_time();
                if expired {
                    LockState::Acquired
                } else if owner.as_str() == self.process_key() {
                    LockState::Refreshed
                } else if must_lock {
                    return Err(BeanError::LockConflict {
                        table,
                        id: bean.id,
                        owner: owner.clone(),
                    });
                } else {
                    debug!(%table, id = bean.id, owner, "proceeding past foreign lock");
                    return Ok(LockState::Foreign);
                }
            }
            _ => LockState::Acquired,
        };
        self.db.exec(
            &self.writer.upsert_lock(),
            &[&table, &bean.id, &self.process_key().to_owned(), &now],
        )?;
        Ok(state)
    }

    /// Deletes every lock row owned by this process. Also runs on session
    /// teardown.
    pub fn release_all_locks(&mut self) -> Result<()> {
        self.db.exec(&self.writer.release_locks(), &[&self.process_key().to_owned()])?;
        Ok(())
    }

    /// Administrative override: deletes every lock row regardless of owner.
    pub fn reset_all(&mut self) -> Result<()> {
        self.db.exec(&self.writer.release_all_locks(), &[])?;
        Ok(())
    }
}
