//! The engine session.
//!
//! An [`Engine`] is an explicit value owned by the caller (no process-wide
//! singleton): it wires the SQLite adapter, the query writer, the identifier
//! filter and the dispenser together, and carries the session flags (frozen,
//! locking, engine mode, rollback). All component operations from the other
//! modules are methods on `Engine`, grouped per module in separate `impl`
//! blocks.
//!
//! Teardown is scoped: [`Engine::close`] releases this process's locks and
//! finalizes the session transaction, and `Drop` performs the same
//! best-effort on early exit paths.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapter::SqliteAdapter;
use crate::bean::{Bean, Dispenser};
use crate::error::{BeanError, Result};
use crate::filter::StrictFilter;
use crate::writer::{QueryWriter, SqliteWriter};

// ------------- Engine mode -------------
/// Session-wide transaction semantics. `Autocommit` issues every statement
/// on its own; `Transactional` wraps the whole session from open to close in
/// one transaction, finalized by commit or rollback at teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Autocommit,
    Transactional,
}

impl FromStr for EngineMode {
    type Err = BeanError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "autocommit" => Ok(EngineMode::Autocommit),
            "transactional" => Ok(EngineMode::Transactional),
            other => Err(BeanError::UnsupportedEngine(other.to_string())),
        }
    }
}

// ------------- Configuration -------------
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Path of the database file; in-memory when absent.
    pub database: Option<String>,
    /// `"autocommit"` (default) or `"transactional"`.
    pub mode: Option<String>,
    /// Lock time-to-live in seconds; beans locked longer ago are up for
    /// grabs. Defaults to ten seconds.
    pub lock_ttl_secs: Option<i64>,
    /// Whether `set` insists on holding the lock before writing.
    pub locking: Option<bool>,
    /// Start with a locked-down schema (no DDL at all, including meta-table
    /// setup, which must then already exist).
    pub frozen: Option<bool>,
}

const DEFAULT_LOCK_TTL_SECS: i64 = 10;

// ------------- Engine -------------
pub struct Engine {
    pub(crate) db: SqliteAdapter,
    pub(crate) writer: Box<dyn QueryWriter>,
    pub(crate) filter: StrictFilter,
    dispenser: Dispenser,
    mode: EngineMode,
    frozen: bool,
    locking: bool,
    lock_ttl: i64,
    process_key: String,
    rollback: bool,
    closed: bool,
}

impl Engine {
    /// Opens a session against the configured database, creating the meta
    /// tables (type registry and lock table) unless the schema is frozen.
    pub fn open(config: EngineConfig) -> Result<Engine> {
        Self::open_with_writer(config, Box::new(SqliteWriter::new()))
    }

    /// As [`open`](Self::open), with a caller-supplied query writer.
    pub fn open_with_writer(config: EngineConfig, writer: Box<dyn QueryWriter>) -> Result<Engine> {
        let mode = match &config.mode {
            Some(m) => m.parse()?,
            None => EngineMode::Autocommit,
        };
        let lock_ttl = config.lock_ttl_secs.unwrap_or(DEFAULT_LOCK_TTL_SECS);
        if lock_ttl < 0 {
            return Err(BeanError::InvalidArgument(format!(
                "lock_ttl_secs must be >= 0, got {lock_ttl}"
            )));
        }
        let db = SqliteAdapter::open(config.database.as_deref())?;
        let mut engine = Engine {
            db,
            writer,
            filter: StrictFilter::new(),
            dispenser: Dispenser::new(),
            mode,
            frozen: config.frozen.unwrap_or(false),
            locking: config.locking.unwrap_or(true),
            lock_ttl,
            process_key: fingerprint(),
            rollback: false,
            closed: false,
        };
        if engine.mode == EngineMode::Transactional {
            engine.db.exec_batch(&engine.writer.begin())?;
        }
        if !engine.frozen {
            engine.db.exec_batch(&engine.writer.setup_registry())?;
            engine.db.exec_batch(&engine.writer.setup_locking())?;
        }
        debug!(mode = ?engine.mode, frozen = engine.frozen, key = %engine.process_key, "engine session opened");
        Ok(engine)
    }

    /// Convenience for tests and examples.
    pub fn open_in_memory() -> Result<Engine> {
        Self::open(EngineConfig::default())
    }

    // ------------- Session flags -------------
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
    pub fn mode(&self) -> EngineMode {
        self.mode
    }
    pub fn set_locking(&mut self, on: bool) {
        self.locking = on;
    }
    pub fn locking(&self) -> bool {
        self.locking
    }
    pub fn set_locking_time(&mut self, seconds: i64) -> Result<()> {
        if seconds < 0 {
            return Err(BeanError::InvalidArgument(format!(
                "locking time must be >= 0, got {seconds}"
            )));
        }
        self.lock_ttl = seconds;
        Ok(())
    }
    pub fn locking_time(&self) -> i64 {
        self.lock_ttl
    }
    pub fn process_key(&self) -> &str {
        &self.process_key
    }
    /// Flags the session so teardown aborts the transaction instead of
    /// committing it. Meaningful in transactional mode only.
    pub fn rollback(&mut self) {
        self.rollback = true;
    }

    // ------------- Dispensing -------------
    pub fn register_type(&mut self, type_name: impl Into<String>, constructor: fn(&str) -> Bean) {
        self.dispenser.register(type_name, constructor);
    }
    /// Creates a transient bean of the given type, consulting the factory
    /// registry first.
    pub fn dispense(&self, type_name: &str) -> Bean {
        self.dispenser.dispense(type_name)
    }

    // ------------- Teardown -------------
    /// Releases this process's locks and finalizes the session transaction
    /// (commit, or rollback when flagged). After `close` the engine is gone;
    /// errors during teardown are reported rather than swallowed.
    pub fn close(mut self) -> Result<()> {
        self.finalize()
    }

    fn finalize(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.release_all_locks()?;
        if self.mode == EngineMode::Transactional {
            let sql = if self.rollback {
                self.writer.rollback()
            } else {
                self.writer.commit()
            };
            self.db.exec_batch(&sql)?;
        }
        debug!(rollback = self.rollback, "engine session closed");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.finalize() {
                warn!("engine teardown failed: {e}");
            }
        }
    }
}

/// A fingerprint identifying this process as a lock owner, derived from the
/// pid and the clock at engine construction.
fn fingerprint() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seed = format!("{}:{}", std::process::id(), nanos);
    format!("{:016x}", seahash::hash(seed.as_bytes()))
}
