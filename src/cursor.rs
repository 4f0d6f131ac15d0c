use std::vec;

use thiserror::Error;

use crate::{
    record::{RecordId, RecordRef},
    table::ModCounter,
    Result,
};

#[derive(Error, Debug)]
pub(crate) enum CursorError {
    #[error("the table was modified while the cursor was live")]
    ConcurrentModification,
    #[error("remove must follow a successful next")]
    IllegalState,
    #[error("no further live records")]
    Exhausted,
}

/// A fail-fast iterator over records.
///
/// One cursor type serves both scans: a table cursor's source is the full
/// record table in ascending id order, an index cursor's source is the
/// record list of one B-tree key. Both compare against the owning table's
/// single shared modification counter, so a mutation through *either* kind
/// of cursor (or a direct insert into the table) invalidates every other
/// live cursor the next time it is used.
///
/// Soft-deleted records are skipped transparently. A record that turns
/// soft-deleted *after* the cursor peeked at it is a protocol violation and
/// surfaces as [`ErrorCode::ConcurrentModification`] instead of being
/// silently dropped.
///
/// [`ErrorCode::ConcurrentModification`]: crate::ErrorCode::ConcurrentModification
pub struct Cursor {
    source: vec::IntoIter<RecordRef>,
    peeked: Option<RecordRef>,
    last_returned: Option<RecordRef>,
    counter: ModCounter,
    expected: u64,
}

impl Cursor {
    pub(crate) fn new(records: Vec<RecordRef>, counter: ModCounter) -> Self {
        let expected = counter.get();
        Self {
            source: records.into_iter(),
            peeked: None,
            last_returned: None,
            counter,
            expected,
        }
    }

    /// Whether another live record is available.
    ///
    /// Advances past soft-deleted records and caches the first live one for
    /// the next [`next`] call. A cached record found to have been
    /// soft-deleted behind the cursor's back raises the invalidation error.
    ///
    /// [`next`]: Cursor::next
    pub fn has_next(&mut self) -> Result<bool> {
        if let Some(peeked) = &self.peeked {
            if peeked.is_delete_pending() {
                return Err(CursorError::ConcurrentModification.into());
            }
            return Ok(true);
        }

        self.check_interference()?;
        for record in self.source.by_ref() {
            if !record.is_delete_pending() {
                self.peeked = Some(record);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Consumes and returns the next live record's id.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<RecordId> {
        self.check_interference()?;

        if !self.has_next()? {
            return Err(CursorError::Exhausted.into());
        }
        match self.peeked.take() {
            Some(record) => {
                let id = record.id();
                self.last_returned = Some(record);
                Ok(id)
            }
            // `has_next` has just cached a live record.
            None => Err(CursorError::Exhausted.into()),
        }
    }

    /// Soft-deletes the record returned by the last [`next`] call.
    ///
    /// The cursor's own expected count and the shared table counter advance
    /// in lockstep, so this cursor stays usable while every other live
    /// cursor is invalidated on its next operation.
    ///
    /// [`next`]: Cursor::next
    pub fn remove(&mut self) -> Result<()> {
        self.check_interference()?;

        let Some(record) = &self.last_returned else {
            return Err(CursorError::IllegalState.into());
        };
        if !record.is_delete_pending() {
            record.mark_delete_pending();
            self.last_returned = None;
            self.expected += 1;
            self.counter.bump();
        }
        Ok(())
    }

    #[inline]
    fn check_interference(&self) -> Result<()> {
        if self.expected != self.counter.get() {
            Err(CursorError::ConcurrentModification.into())
        } else {
            Ok(())
        }
    }
}
