//! Ordered record stores and the cyclic cursor on top of them.

mod cursor;
mod directory;
mod memory;

pub use cursor::*;
pub use directory::*;
pub use memory::*;

use crate::{
    common::*,
    config::{StoreBackend, StoreConfig},
};

/// A read-only store of records ordered by key.
pub trait RecordStore
where
    Self: Debug + Send + Sync,
{
    /// The location the store was opened from, for diagnostics.
    fn source(&self) -> &str;

    /// The number of records in the store.
    fn num_records(&self) -> usize;

    /// Create a cursor positioned at the first record.
    fn new_cursor(&self) -> Result<Box<dyn Cursor>>;
}

/// The sink side of a store.
pub trait RecordStoreWriter {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Sequential access to the records of a store.
///
/// The cursor does not wrap around by itself. Once [Cursor::next] moves
/// past the last record, [Cursor::valid] returns false until
/// [Cursor::seek_to_first] is called.
pub trait Cursor
where
    Self: Send,
{
    fn key(&self) -> &[u8];

    fn value(&self) -> Result<Cow<'_, [u8]>>;

    fn next(&mut self);

    fn valid(&self) -> bool;

    fn seek_to_first(&mut self);
}

/// Open the store described by the configuration for reading.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn RecordStore>> {
    let StoreConfig { backend, ref path } = *config;

    let store: Box<dyn RecordStore> = match backend {
        StoreBackend::Directory => Box::new(DirectoryStore::open(path)?),
        StoreBackend::Memory => Box::new(MemoryStore::load_dir(path)?),
    };
    info!(
        "opened {:?} store '{}' with {} records",
        backend,
        store.source(),
        store.num_records()
    );

    Ok(store)
}
