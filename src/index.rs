use std::fmt::Write;
use std::rc::Rc;

use crate::{
    btree::BTree,
    cursor::Cursor,
    record::RecordRef,
    table::ModCounter,
};

/// A named secondary index binding one table column to a B-tree.
///
/// An index never owns records: its tree holds references into the owning
/// table's record store. The only piece of table state it sees is a read
/// view of the shared modification counter, handed to the cursors it
/// creates; it cannot reach back into the table, let alone mutate it.
#[derive(Debug)]
pub struct Index {
    name: String,
    column: String,
    tree: BTree,
    mod_count: ModCounter,
}

impl Index {
    pub(crate) fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        mod_count: ModCounter,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            tree: BTree::new(),
            mod_count,
        }
    }

    /// The index name, unique per table.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column the index is built over.
    #[inline]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[inline]
    pub(crate) fn insert(&mut self, key: &str, record: RecordRef) {
        self.tree.insert(key, record);
    }

    /// A fail-fast cursor over the records matching `key` exactly.
    ///
    /// The cursor is empty when the key is absent; soft-deleted records are
    /// filtered out during iteration.
    pub fn scan(&self, key: &str) -> Cursor {
        let records = self
            .tree
            .lookup(key)
            .map(<[RecordRef]>::to_vec)
            .unwrap_or_default();
        Cursor::new(records, self.mod_count.clone())
    }

    /// Discards the tree and rebuilds it from the live records the owning
    /// table hands in.
    ///
    /// This is the only way entries for soft-deleted records ever leave the
    /// tree. Records lacking the indexed column are skipped.
    pub(crate) fn rebuild<'a>(&mut self, live: impl Iterator<Item = &'a RecordRef>) {
        self.tree = BTree::new();
        for record in live {
            if let Some(value) = record.values().get(&self.column) {
                self.tree.insert(value, Rc::clone(record));
            }
        }
    }

    /// A textual rendering of the index for diagnostics, not a durable
    /// format.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Index {} over column {}", self.name, self.column);
        let _ = writeln!(out);
        let _ = self.tree.dump(&mut out);
        out
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &BTree {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::Index;
    use crate::{
        record::{Record, RecordId, RecordRef, Values},
        table::ModCounter,
    };

    fn record(id: u64, city: &str) -> RecordRef {
        let values = Values::from([("city".to_owned(), city.to_owned())]);
        Rc::new(Record::new(RecordId::from(id), values))
    }

    fn city_index() -> Index {
        Index::new("by_city", "city", ModCounter::default())
    }

    #[test]
    fn test_scan_matches_exact_key_only() {
        let mut index = city_index();
        index.insert("lyon", record(0, "lyon"));
        index.insert("oslo", record(1, "oslo"));
        index.insert("lyon", record(2, "lyon"));

        let mut cursor = index.scan("lyon");
        assert_eq!(cursor.next().unwrap(), RecordId::from(0));
        assert_eq!(cursor.next().unwrap(), RecordId::from(2));
        assert!(!cursor.has_next().unwrap());

        let mut absent = index.scan("bern");
        assert!(!absent.has_next().unwrap());
    }

    #[test]
    fn test_scan_filters_soft_deleted() {
        let mut index = city_index();
        let victim = record(0, "lyon");
        index.insert("lyon", Rc::clone(&victim));
        index.insert("lyon", record(1, "lyon"));

        victim.mark_delete_pending();
        let mut cursor = index.scan("lyon");
        assert_eq!(cursor.next().unwrap(), RecordId::from(1));
        assert!(!cursor.has_next().unwrap());
    }

    #[test]
    fn test_rebuild_drops_stale_entries() {
        let mut index = city_index();
        let victim = record(0, "lyon");
        let keeper = record(1, "lyon");
        index.insert("lyon", Rc::clone(&victim));
        index.insert("lyon", Rc::clone(&keeper));

        victim.mark_delete_pending();
        // The stale entry survives the soft-delete...
        assert_eq!(index.tree().lookup("lyon").unwrap().len(), 2);

        // ...until the index is rebuilt from the live records.
        let live = [keeper];
        index.rebuild(live.iter());
        assert_eq!(index.tree().lookup("lyon").unwrap().len(), 1);
    }

    #[test]
    fn test_rebuild_skips_records_without_the_column() {
        let mut index = city_index();
        let plain = Rc::new(Record::new(RecordId::from(3), Values::new()));
        let live = [record(0, "lyon"), plain];

        index.rebuild(live.iter());
        assert_eq!(index.tree().lookup("lyon").unwrap().len(), 1);
    }

    #[test]
    fn test_dump_header() {
        let mut index = city_index();
        index.insert("lyon", record(4, "lyon"));

        let out = index.dump();
        assert!(out.starts_with("Index by_city over column city\n\n"));
        assert!(out.ends_with("lyon 4\n"));
    }
}
