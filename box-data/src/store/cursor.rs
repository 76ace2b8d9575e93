use super::*;
use crate::{common::*, error::BoxDataError};

/// The cyclic cursor owned by the batch assembler.
///
/// It advances through a store in key order and restarts from the first
/// record after the last one, so the traversal never ends. Epochs are not
/// signalled, but the number of completed traversals is counted.
pub struct RecordCursor {
    cursor: Box<dyn Cursor>,
    num_records: usize,
    offset: u64,
    wraps: u64,
}

impl Debug for RecordCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCursor")
            .field("num_records", &self.num_records)
            .field("offset", &self.offset)
            .field("wraps", &self.wraps)
            .finish()
    }
}

impl RecordCursor {
    /// Create a cursor positioned at the first record of the store.
    pub fn new(store: &dyn RecordStore) -> Result<Self> {
        let mut cursor = store.new_cursor()?;
        cursor.seek_to_first();
        if !cursor.valid() {
            bail!(BoxDataError::EmptyStore {
                path: store.source().to_owned(),
            });
        }

        Ok(Self {
            cursor,
            num_records: store.num_records(),
            offset: 0,
            wraps: 0,
        })
    }

    /// Read the current record without advancing.
    pub fn peek(&self) -> Result<Cow<'_, [u8]>> {
        self.cursor.value()
    }

    /// The key of the current record.
    pub fn key(&self) -> &[u8] {
        self.cursor.key()
    }

    /// Move to the next record, restarting from the first one at the end
    /// of the store.
    pub fn advance(&mut self) {
        self.cursor.next();
        if !self.cursor.valid() {
            info!("restarting data prefetching from start");
            self.cursor.seek_to_first();
            self.wraps += 1;
        }
        self.offset += 1;
    }

    /// The number of advances since the cursor was created.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The number of completed traversals over the store.
    pub fn wraps(&self) -> u64 {
        self.wraps
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }
}
