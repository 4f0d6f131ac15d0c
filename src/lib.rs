//! A lightweight, embedded record store with secondary B-tree indexing,
//! written in Rust.
//!
//! `tabledb` keeps whole tables in memory: records are validated against a
//! per-table schema, identified by monotonically assigned ids, and reachable
//! either directly by id or through named secondary indexes, each of which
//! maps one column's values to records via a fixed-degree B-tree.
//!
//! Deletion is cooperative: records are only ever *soft*-deleted through
//! cursors and stay physically present until compaction. Every cursor is
//! fail-fast — when a table is mutated while other cursors are live, those
//! cursors report the interference instead of yielding inconsistent results.
//!
//! # Tables and records
//!
//! Tables live in a [`Registry`], an explicit context object constructed
//! around a snapshot provider. Create a table with a [`Schema`] describing
//! its fields, then insert records as field-to-value mappings:
//!
//! ```
//! use tabledb::{MemoryStore, Registry, Result, Schema, Values};
//! # fn try_main() -> Result<()> {
//!
//! let mut registry = Registry::new(MemoryStore::new());
//!
//! let mut schema = Schema::new();
//! schema.field("name", 64).field("city", 64);
//! let table = registry.create_table("people", schema)?;
//!
//! let id = table.insert(Values::from([
//!     ("name".to_owned(), "Ada".to_owned()),
//!     ("city".to_owned(), "London".to_owned()),
//! ]))?;
//!
//! assert_eq!(table.get(id).unwrap()["city"], "London");
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! A record may omit schema fields, but a field missing from the schema or a
//! value longer than the field allows fails the whole insert; nothing is
//! committed.
//!
//! # Secondary indexes
//!
//! An index binds one column to a B-tree and is kept up to date by every
//! subsequent insert. Creating an index backfills it from the records that
//! are already live:
//!
//! ```
//! # use tabledb::{MemoryStore, Registry, Result, Schema, Values};
//! # fn try_main() -> Result<()> {
//! # let mut registry = Registry::new(MemoryStore::new());
//! # let mut schema = Schema::new();
//! # schema.field("name", 64).field("city", 64);
//! # let table = registry.create_table("people", schema)?;
//! # table.insert(Values::from([
//! #     ("name".to_owned(), "Ada".to_owned()),
//! #     ("city".to_owned(), "London".to_owned()),
//! # ]))?;
//! table.create_index("by_city", "city")?;
//!
//! let mut cursor = table.index("city").unwrap().scan("London");
//! while cursor.has_next()? {
//!     let id = cursor.next()?;
//!     println!("{id}: {:?}", table.get(id));
//! }
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! # Cursors, soft deletes and compaction
//!
//! Cursors over the table (id order) and over an index key share one
//! protocol: `has_next`/`next` skip soft-deleted records, `remove`
//! soft-deletes the record the last `next` returned. The deleting cursor
//! stays usable; every *other* live cursor fails with
//! [`ErrorCode::ConcurrentModification`] on its next use, as does any cursor
//! outlived by a direct insert:
//!
//! ```
//! # use tabledb::{MemoryStore, Registry, Result, Schema, Values};
//! # fn try_main() -> Result<()> {
//! # let mut registry = Registry::new(MemoryStore::new());
//! # let mut schema = Schema::new();
//! # schema.field("name", 64);
//! # let table = registry.create_table("people", schema)?;
//! # let id = table.insert(Values::from([("name".to_owned(), "Ada".to_owned())]))?;
//! let mut cursor = table.cursor();
//! assert_eq!(cursor.next()?, id);
//! cursor.remove()?;
//!
//! // Soft-deleted: invisible to lookups, still stored.
//! assert!(table.get(id).is_none());
//!
//! // Compaction physically discards soft-deleted records.
//! table.compact();
//!
//! // A stale cursor fails instead of yielding inconsistent results.
//! let mut stale = table.cursor();
//! table.insert(Values::from([("name".to_owned(), "Grace".to_owned())]))?;
//! assert!(stale.next().is_err());
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! Index entries are *not* removed by soft deletes or by [`Table::compact`];
//! [`Table::rebuild_index`] rebuilds one index from the live records and is
//! the only way its stale entries are purged.
//!
//! # Persistence
//!
//! Tables and indexes are independently persistable as opaque, checksummed
//! snapshots through a [`SnapshotStore`] ([`FileStore`] stores one file per
//! snapshot; [`MemoryStore`] is handy for tests). [`Registry::close`] saves
//! every open table:
//!
//! ```
//! use tabledb::{MemoryStore, Registry, Result, Schema, Values};
//! # fn try_main() -> Result<()> {
//!
//! let mut store = MemoryStore::new();
//! {
//!     let mut registry = Registry::new(&mut store);
//!     let mut schema = Schema::new();
//!     schema.field("name", 64);
//!     let table = registry.create_table("people", schema)?;
//!     table.insert(Values::from([("name".to_owned(), "Ada".to_owned())]))?;
//!     registry.close()?;
//! }
//!
//! let mut registry = Registry::new(&mut store);
//! let table = registry.restore_table("people")?;
//! assert!(table.get(0.into()).is_some());
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! # Attention
//!
//! ❗️ tabledb is strictly single-threaded: tables, indexes and cursors are
//! nonsendable by construction. The fail-fast protocol is a cooperative
//! safety net against interleaved use from one thread, not a concurrency
//! control mechanism.

mod btree;
mod cursor;
mod error;
mod index;
mod record;
mod registry;
mod schema;
mod snapshot;
mod table;

pub use crate::{
    cursor::Cursor,
    error::{Error, ErrorCode, Result},
    index::Index,
    record::{RecordId, Values},
    registry::Registry,
    schema::Schema,
    snapshot::{FileStore, MemoryStore, SnapshotStore},
    table::Table,
};
