use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use crate::{
    snapshot::{self, IndexSnapshot, SnapshotStore, TableSnapshot},
    Result, Schema, Table,
};

#[derive(Error, Debug)]
pub(crate) enum RegistryError {
    #[error("{name} already exists")]
    TableExists { name: String },
    #[error("{name} is not an open table")]
    TableNotOpen { name: String },
    #[error("{table} has no index named {name}")]
    IndexNotFound { table: String, name: String },
    #[error("{name} has no backing snapshot")]
    SnapshotMissing { name: String },
}

/// The top-level context object: owns every open table by name and the
/// persistence provider the tables and indexes are snapshotted through.
///
/// There is no process-wide state; callers construct a registry around a
/// [`SnapshotStore`] and tear it down with [`close`], which saves every open
/// table.
///
/// [`close`]: Registry::close
pub struct Registry<S> {
    tables: BTreeMap<String, Table>,
    store: S,
}

impl<S> Registry<S>
where
    S: SnapshotStore,
{
    #[inline]
    pub fn new(store: S) -> Self {
        Self {
            tables: BTreeMap::new(),
            store,
        }
    }

    /// Creates and opens a new table.
    ///
    /// Fails with [`ErrorCode::DuplicateName`] when the name is already open
    /// in memory or a snapshot of that name already exists in the backing
    /// store.
    ///
    /// [`ErrorCode::DuplicateName`]: crate::ErrorCode::DuplicateName
    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<&mut Table> {
        if self.tables.contains_key(name) || self.store.exists(name) {
            return Err(RegistryError::TableExists {
                name: name.to_owned(),
            }
            .into());
        }

        info!(table = name, "table created");
        Ok(self
            .tables
            .entry(name.to_owned())
            .or_insert_with(|| Table::new(name, schema)))
    }

    /// The open table with the given name.
    #[inline]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// The open table with the given name, mutably.
    #[inline]
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Saves an open table's snapshot under its name.
    ///
    /// A failed save surfaces the provider's error and leaves the in-memory
    /// table unchanged.
    pub fn save_table(&mut self, name: &str) -> Result<()> {
        let table = self.open_table(name)?;
        let bytes = snapshot::encode(&table.to_snapshot())?;
        self.store.save(name, &bytes)?;
        info!(table = name, "table saved");
        Ok(())
    }

    /// Restores a table from its snapshot and opens it.
    ///
    /// Fails with [`ErrorCode::DuplicateName`] when the name is already open
    /// and with [`ErrorCode::NotFound`] when the backing artifact does not
    /// exist.
    ///
    /// [`ErrorCode::DuplicateName`]: crate::ErrorCode::DuplicateName
    /// [`ErrorCode::NotFound`]: crate::ErrorCode::NotFound
    pub fn restore_table(&mut self, name: &str) -> Result<&mut Table> {
        if self.tables.contains_key(name) {
            return Err(RegistryError::TableExists {
                name: name.to_owned(),
            }
            .into());
        }
        let bytes = self
            .store
            .load(name)?
            .ok_or_else(|| RegistryError::SnapshotMissing {
                name: name.to_owned(),
            })?;
        let snapshot: TableSnapshot = snapshot::decode(&bytes)?;

        info!(table = name, "table restored");
        Ok(self
            .tables
            .entry(name.to_owned())
            .or_insert_with(|| Table::from_snapshot(snapshot)))
    }

    /// Closes a table and deletes its durable artifacts: the snapshots of
    /// the table itself and of each of its indexes.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if let Some(table) = self.tables.remove(name) {
            for index_name in table.index_names() {
                self.store.delete(index_name)?;
            }
        }
        self.store.delete(name)?;
        info!(table = name, "table dropped");
        Ok(())
    }

    /// Saves one index of an open table as its own snapshot, keyed by the
    /// index name.
    pub fn save_index(&mut self, table_name: &str, index_name: &str) -> Result<()> {
        let table = self.open_table(table_name)?;
        let index = table
            .indexes()
            .find(|index| index.name() == index_name)
            .ok_or_else(|| RegistryError::IndexNotFound {
                table: table_name.to_owned(),
                name: index_name.to_owned(),
            })?;

        let bytes = snapshot::encode(&IndexSnapshot {
            name: index.name().to_owned(),
            column: index.column().to_owned(),
        })?;
        self.store.save(index_name, &bytes)?;
        info!(table = table_name, index = index_name, "index saved");
        Ok(())
    }

    /// Restores an index snapshot and re-attaches it to its owning table by
    /// column name, re-registering it under the loaded index name.
    ///
    /// Fails when the artifact does not exist, or when that name or column
    /// is already present on the table.
    pub fn restore_index(&mut self, table_name: &str, index_name: &str) -> Result<()> {
        let bytes =
            self.store
                .load(index_name)?
                .ok_or_else(|| RegistryError::SnapshotMissing {
                    name: index_name.to_owned(),
                })?;
        let snapshot: IndexSnapshot = snapshot::decode(&bytes)?;

        let table = self.open_table_mut(table_name)?;
        table.create_index(&snapshot.name, &snapshot.column)?;
        info!(table = table_name, index = index_name, "index restored");
        Ok(())
    }

    /// Drops an index from an open table and deletes its durable artifact.
    pub fn drop_index(&mut self, table_name: &str, index_name: &str) -> Result<()> {
        if let Some(table) = self.tables.get_mut(table_name) {
            table.drop_index(index_name);
        }
        self.store.delete(index_name)?;
        info!(table = table_name, index = index_name, "index dropped");
        Ok(())
    }

    /// Saves every open table, then drops the registry.
    pub fn close(mut self) -> Result<()> {
        let names: Vec<String> = self.tables.keys().cloned().collect();
        for name in &names {
            self.save_table(name)?;
        }
        Ok(())
    }

    fn open_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| RegistryError::TableNotOpen {
                name: name.to_owned(),
            }.into())
    }

    fn open_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| RegistryError::TableNotOpen {
                name: name.to_owned(),
            }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::{
        record::Values, snapshot::MemoryStore, snapshot::SnapshotStore, ErrorCode, RecordId,
        Schema,
    };

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.field("name", 32).field("city", 32);
        schema
    }

    fn registry() -> Registry<MemoryStore> {
        Registry::new(MemoryStore::new())
    }

    fn values(pairs: &[(&str, &str)]) -> Values {
        pairs
            .iter()
            .map(|&(field, value)| (field.to_owned(), value.to_owned()))
            .collect()
    }

    #[test]
    fn test_create_table_name_conflicts() {
        let mut registry = registry();
        registry.create_table("people", schema()).unwrap();

        // Already open in memory.
        let error = registry.create_table("people", schema()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::DuplicateName);

        // Already present in the backing store, even when not open.
        let mut store = MemoryStore::new();
        store.save("people", b"occupied").unwrap();
        let mut registry = Registry::new(store);
        let error = registry.create_table("people", schema()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::DuplicateName);
    }

    #[test]
    fn test_save_and_restore_table() {
        let mut store = MemoryStore::new();
        {
            let mut registry = Registry::new(&mut store);
            let table = registry.create_table("people", schema()).unwrap();
            table.create_index("by_city", "city").unwrap();
            table
                .insert(values(&[("name", "ada"), ("city", "london")]))
                .unwrap();
            table
                .insert(values(&[("name", "grace"), ("city", "nyc")]))
                .unwrap();

            // Restoring over an open table is a duplicate.
            let error = registry.restore_table("people").unwrap_err();
            assert_eq!(error.code(), ErrorCode::DuplicateName);

            registry.close().unwrap();
        }

        let mut registry = Registry::new(&mut store);
        let table = registry.restore_table("people").unwrap();
        assert_eq!(table.get(RecordId::from(0)).unwrap()["city"], "london");

        // The restored index is re-attached and scans the restored records.
        let mut cursor = table.index("city").unwrap().scan("nyc");
        assert_eq!(cursor.next().unwrap(), RecordId::from(1));
    }

    #[test]
    fn test_drop_table_removes_artifacts() {
        let mut store = MemoryStore::new();
        let mut registry = Registry::new(&mut store);
        let table = registry.create_table("people", schema()).unwrap();
        table.create_index("by_city", "city").unwrap();
        registry.save_table("people").unwrap();
        registry.save_index("people", "by_city").unwrap();

        registry.drop_table("people").unwrap();
        assert!(registry.table("people").is_none());
        drop(registry);

        assert!(!store.exists("people"));
        assert!(!store.exists("by_city"));
    }

    #[test]
    fn test_restore_missing_table() {
        let mut registry = registry();
        let error = registry.restore_table("ghost").unwrap_err();
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_index_snapshot_cycle() {
        let mut registry = registry();
        let table = registry.create_table("people", schema()).unwrap();
        table.create_index("by_city", "city").unwrap();
        table
            .insert(values(&[("name", "ada"), ("city", "london")]))
            .unwrap();

        registry.save_index("people", "by_city").unwrap();

        // Restoring while the name is still registered fails.
        let error = registry.restore_index("people", "by_city").unwrap_err();
        assert_eq!(error.code(), ErrorCode::DuplicateName);

        // Drop in memory only, keep the artifact, then re-attach.
        registry
            .table_mut("people")
            .unwrap()
            .drop_index("by_city");
        registry.restore_index("people", "by_city").unwrap();

        let table = registry.table("people").unwrap();
        let mut cursor = table.index("city").unwrap().scan("london");
        assert_eq!(cursor.next().unwrap(), RecordId::from(0));
    }

    #[test]
    fn test_drop_index_removes_artifact() {
        let mut registry = registry();
        let table = registry.create_table("people", schema()).unwrap();
        table.create_index("by_city", "city").unwrap();
        registry.save_index("people", "by_city").unwrap();

        registry.drop_index("people", "by_city").unwrap();
        assert!(registry.table("people").unwrap().index("city").is_none());

        let error = registry.restore_index("people", "by_city").unwrap_err();
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_close_saves_every_table() {
        let mut store = MemoryStore::new();

        let mut registry = Registry::new(&mut store);
        registry.create_table("a", schema()).unwrap();
        registry.create_table("b", schema()).unwrap();
        registry
            .table_mut("a")
            .unwrap()
            .insert(values(&[("name", "ada")]))
            .unwrap();
        registry.close().unwrap();

        // A fresh registry over the same store restores both tables.
        let mut registry = Registry::new(&mut store);
        let table = registry.restore_table("a").unwrap();
        assert_eq!(table.get(RecordId::from(0)).unwrap()["name"], "ada");
        registry.restore_table("b").unwrap();
    }
}
