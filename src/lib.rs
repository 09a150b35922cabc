//! Beanbag – an adaptive object-to-relational persistence engine.
//!
//! Beanbag stores loosely typed records ("beans") in SQLite and lets the
//! schema follow the data instead of the other way around:
//! * A [`bean::Bean`] is a type name, a numeric id and an ordered property
//!   bag of tagged scalars ([`bean::Value`]).
//! * Writing a bean creates its table and columns on demand; column types
//!   are inferred from the values actually written and only ever widen along
//!   the type ladder ([`infer::ColumnType`]).
//! * Many-to-many relations live in canonically named junction tables and
//!   parent/child relations in dedicated tracking tables; both are created
//!   automatically when beans are linked.
//! * A cooperative, TTL-based lock ([`lock::LockState`]) protects beans from
//!   concurrent overwrite between processes that honor the protocol.
//! * Freezing the schema turns every DDL request into an explicit
//!   [`schema::DdlOutcome::Frozen`] no-op while plain reads and writes keep
//!   working, for production deployments with a locked-down schema.
//!
//! ## Modules
//! * [`bean`] – beans, tagged scalar values, the dispenser and validation.
//! * [`infer`] – the type ladder and inference over it.
//! * [`engine`] – the session value owning the connection and all flags.
//! * [`schema`] – table/column creation, widening and dropping.
//! * [`store`] – bean read/write/delete plus simple aggregates.
//! * [`assoc`] – many-to-many associations via junction tables.
//! * [`tree`] – parent/child relations.
//! * [`lock`] – the advisory lock protocol.
//! * [`gc`] – garbage collection and the column-narrowing optimizer.
//! * [`writer`] / [`adapter`] / [`filter`] – the SQL rendering, database
//!   access and identifier sanitization seams.
//!
//! ## Quick start
//! ```
//! use beanbag::engine::Engine;
//!
//! let mut engine = Engine::open_in_memory().unwrap();
//! let mut user = engine.dispense("user");
//! user.set_prop("name", "Ann");
//! user.set_prop("age", 30i64);
//! let report = engine.set(&mut user).unwrap();
//! let back = engine.get("user", report.id).unwrap().unwrap();
//! assert_eq!(back.prop("name"), user.prop("name"));
//! engine.close().unwrap();
//! ```
//!
//! ## Concurrency model
//! One synchronous connection per engine; no internal threads. Independent
//! processes coordinate only through the advisory lock table and, coarser,
//! the session-wide engine mode (autocommit vs. one transaction from open to
//! close, finalized by [`engine::Engine::close`]).

pub mod adapter;
pub mod assoc;
pub mod bean;
pub mod engine;
pub mod error;
pub mod filter;
pub mod gc;
pub mod infer;
pub mod lock;
pub mod schema;
pub mod store;
pub mod tree;
pub mod writer;
