use std::fmt::{Display, Formatter};

use crate::{cursor, registry, schema, snapshot, table};

/// A `Result` type that all API calls in tabledb will return.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible error cases that can be returned by API calls in tabledb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A record referenced a field absent from the schema, or a value
    /// exceeded the field's maximum length.
    SchemaViolation,
    /// A table or index name (or an indexed column) is already taken.
    DuplicateName,
    /// A table, index or backing snapshot that was asked for does not exist.
    NotFound,
    /// A cursor detected that the table was mutated behind its back.
    ConcurrentModification,
    /// `remove` was called on a cursor without a preceding successful `next`.
    IllegalCursorState,
    /// `next` was called on a cursor with no further live records.
    Exhausted,
    /// An error occurred during an I/O operation.
    IO,
    /// A snapshot is not in the expected format or failed its checksum.
    SnapshotInvalid,
}

#[derive(Debug)]
pub struct Error {
    code: ErrorCode,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl Display for ErrorCode {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SchemaViolation => "schema violation",
            Self::DuplicateName => "duplicate name",
            Self::NotFound => "not found",
            Self::ConcurrentModification => "concurrent modification",
            Self::IllegalCursorState => "illegal cursor state",
            Self::Exhausted => "cursor exhausted",
            Self::IO => "IO error",
            Self::SnapshotInvalid => "invalid snapshot",
        })
    }
}

impl Error {
    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl Display for Error {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.source)
    }
}

impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<schema::SchemaViolation> for Error {
    #[inline]
    fn from(value: schema::SchemaViolation) -> Self {
        Self {
            code: ErrorCode::SchemaViolation,
            source: Box::new(value),
        }
    }
}

impl From<table::IndexConflict> for Error {
    #[inline]
    fn from(value: table::IndexConflict) -> Self {
        Self {
            code: ErrorCode::DuplicateName,
            source: Box::new(value),
        }
    }
}

impl From<cursor::CursorError> for Error {
    fn from(value: cursor::CursorError) -> Self {
        let code = match value {
            cursor::CursorError::ConcurrentModification => ErrorCode::ConcurrentModification,
            cursor::CursorError::IllegalState => ErrorCode::IllegalCursorState,
            cursor::CursorError::Exhausted => ErrorCode::Exhausted,
        };
        Self {
            code,
            source: Box::new(value),
        }
    }
}

impl From<registry::RegistryError> for Error {
    fn from(value: registry::RegistryError) -> Self {
        let code = match value {
            registry::RegistryError::TableExists { .. } => ErrorCode::DuplicateName,
            registry::RegistryError::TableNotOpen { .. }
            | registry::RegistryError::IndexNotFound { .. }
            | registry::RegistryError::SnapshotMissing { .. } => ErrorCode::NotFound,
        };
        Self {
            code,
            source: Box::new(value),
        }
    }
}

impl From<snapshot::SnapshotError> for Error {
    fn from(value: snapshot::SnapshotError) -> Self {
        let code = match value {
            snapshot::SnapshotError::Io(_) => ErrorCode::IO,
            _ => ErrorCode::SnapshotInvalid,
        };
        Self {
            code,
            source: Box::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorCode};
    use crate::cursor::CursorError;

    #[test]
    fn test_code_and_display() {
        let error = Error::from(CursorError::Exhausted);
        assert_eq!(error.code(), ErrorCode::Exhausted);
        assert_eq!(
            error.to_string(),
            "cursor exhausted: no further live records"
        );

        let error = Error::from(CursorError::ConcurrentModification);
        assert_eq!(error.code(), ErrorCode::ConcurrentModification);
    }
}
