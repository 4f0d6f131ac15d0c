use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
    rc::Rc,
};

use thiserror::Error;
use tracing::debug;

use crate::{
    cursor::Cursor,
    index::Index,
    record::{Record, RecordId, RecordRef, Values},
    schema::Schema,
    snapshot::{IndexSnapshot, RecordSnapshot, TableSnapshot},
    Result,
};

/// The table's modification counter, shared by reference with every cursor
/// and index the table creates.
///
/// It is the one piece of state that crosses component boundaries: the table
/// bumps it on every structural mutation (insert, or a soft-delete performed
/// through a cursor), and every live cursor compares its captured value
/// against it to detect interference. Everything else stays exclusively
/// owned.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModCounter(Rc<Cell<u64>>);

impl ModCounter {
    #[inline]
    pub(crate) fn get(&self) -> u64 {
        self.0.get()
    }

    #[inline]
    pub(crate) fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Error, Debug)]
pub(crate) enum IndexConflict {
    #[error("index {name} already exists")]
    NameTaken { name: String },
    #[error("an index over column {column} already exists")]
    ColumnIndexed { column: String },
}

/// The authoritative record store: assigns record identities, validates
/// records against its schema, and keeps its secondary indexes fed.
///
/// Records are soft-deleted only (through cursors); [`compact`] is the one
/// operation that physically discards them. The table is strictly
/// single-threaded, in line with the cooperative fail-fast model.
///
/// [`compact`]: Table::compact
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Schema,
    records: BTreeMap<RecordId, RecordRef>,
    next_id: RecordId,
    /// Indexes keyed by the column they are built over; one per column.
    indexes: BTreeMap<String, Index>,
    /// Index names, unique across the table regardless of column.
    index_names: BTreeSet<String>,
    mod_count: ModCounter,
}

impl Table {
    /// Creates an empty table with the given schema.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            records: BTreeMap::new(),
            next_id: RecordId::FIRST,
            indexes: BTreeMap::new(),
            index_names: BTreeSet::new(),
            mod_count: ModCounter::default(),
        }
    }

    /// The table name, used as its snapshot key.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema the table validates records against.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates and stores a record, returning its assigned id.
    ///
    /// Every field must be declared in the schema and every value must fit
    /// the field's maximum length; otherwise the insert fails with
    /// [`ErrorCode::SchemaViolation`] and nothing is committed, the id
    /// counter included. On success the value of every indexed column
    /// present in the record is forwarded to the corresponding index.
    ///
    /// [`ErrorCode::SchemaViolation`]: crate::ErrorCode::SchemaViolation
    pub fn insert(&mut self, values: Values) -> Result<RecordId> {
        self.schema.validate(&values)?;

        let id = self.next_id;
        let record = Rc::new(Record::new(id, values));
        self.records.insert(id, Rc::clone(&record));
        self.update_indexes(&record);

        self.next_id = id.next();
        self.mod_count.bump();
        Ok(id)
    }

    fn update_indexes(&mut self, record: &RecordRef) {
        for (column, index) in &mut self.indexes {
            if let Some(value) = record.values().get(column) {
                index.insert(value, Rc::clone(record));
            }
        }
    }

    /// The value mapping of the live record with the given id.
    ///
    /// Absent and soft-deleted records both come back as `None`; neither is
    /// an error at this level.
    pub fn get(&self, id: RecordId) -> Option<&Values> {
        self.records
            .get(&id)
            .filter(|record| !record.is_delete_pending())
            .map(|record| record.values())
    }

    /// Creates a named index over a column and backfills it from every
    /// currently live record.
    ///
    /// Fails with [`ErrorCode::DuplicateName`] when the name is already
    /// registered or the column is already indexed. Live records lacking the
    /// column are skipped, not an error.
    ///
    /// [`ErrorCode::DuplicateName`]: crate::ErrorCode::DuplicateName
    pub fn create_index(&mut self, name: &str, column: &str) -> Result<&Index> {
        if self.index_names.contains(name) {
            return Err(IndexConflict::NameTaken {
                name: name.to_owned(),
            }
            .into());
        }
        if self.indexes.contains_key(column) {
            return Err(IndexConflict::ColumnIndexed {
                column: column.to_owned(),
            }
            .into());
        }

        self.index_names.insert(name.to_owned());
        let mut index = Index::new(name, column, self.mod_count.clone());
        index.rebuild(self.live_records());
        debug!(table = %self.name, index = name, column, "index created");

        Ok(self.indexes.entry(column.to_owned()).or_insert(index))
    }

    /// The index over the given column, if any.
    #[inline]
    pub fn index(&self, column: &str) -> Option<&Index> {
        self.indexes.get(column)
    }

    /// All indexes of the table, in column order.
    #[inline]
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    pub(crate) fn index_names(&self) -> &BTreeSet<String> {
        &self.index_names
    }

    /// Removes the named index from the table's bookkeeping; a no-op for an
    /// unknown name.
    ///
    /// Discarding the index's durable artifact is the registry's job, since
    /// the persistence provider lives there.
    pub fn drop_index(&mut self, name: &str) {
        if !self.index_names.remove(name) {
            return;
        }
        let column = self
            .indexes
            .iter()
            .find(|(_, index)| index.name() == name)
            .map(|(column, _)| column.clone());
        if let Some(column) = column {
            self.indexes.remove(&column);
            debug!(table = %self.name, index = name, column = %column, "index dropped");
        }
    }

    /// Rebuilds the named index from only the currently live records,
    /// purging entries left behind by soft-deleted ones; a no-op for an
    /// unknown name.
    pub fn rebuild_index(&mut self, name: &str) {
        let Some(column) = self
            .indexes
            .values()
            .find(|index| index.name() == name)
            .map(|index| index.column().to_owned())
        else {
            return;
        };

        // Take the index out so the record table can be borrowed for the
        // backfill, then re-register it.
        if let Some(mut index) = self.indexes.remove(&column) {
            index.rebuild(self.live_records());
            self.indexes.insert(column, index);
            debug!(table = %self.name, index = name, "index rebuilt");
        }
    }

    /// Compaction: physically discards every record whose soft-delete marker
    /// is set.
    ///
    /// Indexes are not touched; their stale entries are only cleared by
    /// [`rebuild_index`]. Calling this twice in a row is equivalent to
    /// calling it once.
    ///
    /// [`rebuild_index`]: Table::rebuild_index
    pub fn compact(&mut self) {
        let before = self.records.len();
        self.records
            .retain(|_, record| !record.is_delete_pending());

        let discarded = before - self.records.len();
        if discarded > 0 {
            debug!(table = %self.name, discarded, "table compacted");
        }
    }

    /// A fail-fast cursor over the live records in ascending id order.
    pub fn cursor(&self) -> Cursor {
        let records = self.records.values().cloned().collect();
        Cursor::new(records, self.mod_count.clone())
    }

    /// The current modification count, for callers that want to correlate
    /// cursor invalidation with their own bookkeeping.
    #[inline]
    pub fn mod_count(&self) -> u64 {
        self.mod_count.get()
    }

    #[inline]
    fn live_records(&self) -> impl Iterator<Item = &RecordRef> {
        self.records
            .values()
            .filter(|record| !record.is_delete_pending())
    }

    /// A textual rendering of the live records for diagnostics, not a
    /// durable format: each record's id, then one indented `field: value`
    /// line per schema field present in the record, in schema order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for record in self.live_records() {
            let _ = writeln!(out, "{}:", record.id());
            for (field, _) in self.schema.fields() {
                if let Some(value) = record.values().get(field) {
                    let _ = writeln!(out, "\t{field}: {value}");
                }
            }
        }
        out
    }
}

impl Table {
    pub(crate) fn to_snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            name: self.name.clone(),
            schema: self.schema.clone(),
            next_id: self.next_id.raw(),
            records: self
                .records
                .values()
                .map(|record| RecordSnapshot {
                    id: record.id().raw(),
                    values: record.values().clone(),
                    delete_pending: record.is_delete_pending(),
                })
                .collect(),
            indexes: self
                .indexes
                .values()
                .map(|index| IndexSnapshot {
                    name: index.name().to_owned(),
                    column: index.column().to_owned(),
                })
                .collect(),
        }
    }

    /// Rebuilds a table from its snapshot.
    ///
    /// Record sharing cannot survive a serialization boundary, so index
    /// trees are not part of the snapshot; every registered index is rebuilt
    /// by backfilling from the restored live records instead.
    pub(crate) fn from_snapshot(snapshot: TableSnapshot) -> Self {
        let mut table = Table::new(snapshot.name, snapshot.schema);
        table.next_id = RecordId::from_raw(snapshot.next_id);

        for record in snapshot.records {
            let record = Rc::new(Record::restored(
                RecordId::from_raw(record.id),
                record.values,
                record.delete_pending,
            ));
            table.records.insert(record.id(), record);
        }

        for IndexSnapshot { name, column } in snapshot.indexes {
            let mut index = Index::new(&name, &column, table.mod_count.clone());
            index.rebuild(table.live_records());
            table.index_names.insert(name);
            table.indexes.insert(column, index);
        }

        table
    }
}
