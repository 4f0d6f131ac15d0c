use std::{
    collections::BTreeMap,
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{record::Values, schema::Schema, Result};

/// A special sequence of bytes at the beginning of every snapshot, for
/// validation.
const MAGIC: u32 = 0xDB7AB1E5;

/// The current snapshot format version.
const VERSION: u32 = 1;

/// Envelope size: magic, version and checksum words.
const HEADER_LEN: usize = 12;

#[derive(Error, Debug)]
pub(crate) enum SnapshotError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("the snapshot payload could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("the snapshot is truncated")]
    Truncated,
    #[error("the snapshot magic number is wrong")]
    MagicMismatched,
    #[error("the snapshot format version is mismatched")]
    VersionMismatched,
    #[error("the snapshot checksum is mismatched")]
    ChecksumMismatched,
}

/// The durable form of a table: schema, records (soft-delete markers
/// included), the id counter, and the name/column of every registered index.
///
/// Index trees are deliberately absent; they are derived state and are
/// rebuilt from the live records on restore.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableSnapshot {
    pub(crate) name: String,
    pub(crate) schema: Schema,
    pub(crate) next_id: u64,
    pub(crate) records: Vec<RecordSnapshot>,
    pub(crate) indexes: Vec<IndexSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RecordSnapshot {
    pub(crate) id: u64,
    pub(crate) values: Values,
    pub(crate) delete_pending: bool,
}

/// The durable form of an index: just enough to re-attach it to its owning
/// table by column name and re-register it under its index name.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IndexSnapshot {
    pub(crate) name: String,
    pub(crate) column: String,
}

/// Serializes a snapshot payload and seals it into a checksummed envelope.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value).map_err(SnapshotError::from)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&MAGIC.to_le_bytes());
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Validates an envelope (magic, version, checksum) and decodes its payload.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(SnapshotError::Truncated.into());
    }

    let (header, payload) = bytes.split_at(HEADER_LEN);
    if read_u32(&header[0..4]) != MAGIC {
        return Err(SnapshotError::MagicMismatched.into());
    }
    if read_u32(&header[4..8]) != VERSION {
        return Err(SnapshotError::VersionMismatched.into());
    }
    if read_u32(&header[8..12]) != crc32fast::hash(payload) {
        return Err(SnapshotError::ChecksumMismatched.into());
    }

    serde_json::from_slice(payload)
        .map_err(SnapshotError::from)
        .map_err(Into::into)
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

/// The persistence provider boundary: stores opaque snapshots keyed by name.
///
/// An implementation's failures surface to the caller of the save/restore
/// operation and must never corrupt what is already stored; the in-memory
/// state of the caller is unaffected either way. Deleting an absent snapshot
/// is not an error.
pub trait SnapshotStore {
    fn save(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>>;

    fn exists(&self, name: &str) -> bool;

    fn delete(&mut self, name: &str) -> Result<()>;
}

impl<S> SnapshotStore for &mut S
where
    S: SnapshotStore + ?Sized,
{
    #[inline]
    fn save(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        (**self).save(name, bytes)
    }

    #[inline]
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(name)
    }

    #[inline]
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    #[inline]
    fn delete(&mut self, name: &str) -> Result<()> {
        (**self).delete(name)
    }
}

/// A [`SnapshotStore`] keeping one file per snapshot under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a file store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(SnapshotError::from)?;
        Ok(Self { dir })
    }

    #[inline]
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl SnapshotStore for FileStore {
    fn save(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(name), bytes).map_err(|e| SnapshotError::from(e).into())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(SnapshotError::from(error).into()),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(SnapshotError::from(error).into()),
        }
    }
}

/// A [`SnapshotStore`] keeping snapshots in memory; useful for tests and for
/// embedding without a filesystem.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.snapshots.insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshots.get(name).cloned())
    }

    fn exists(&self, name: &str) -> bool {
        self.snapshots.contains_key(name)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        self.snapshots.remove(name);
        Ok(())
    }
}
