use super::*;
use crate::common::*;

/// Records kept in memory, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    source: String,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            source: "<memory>".into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load every record of a directory store into memory.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let store = DirectoryStore::open(dir)?;
        let mut entries = BTreeMap::new();

        let mut cursor = store.new_cursor()?;
        while cursor.valid() {
            entries.insert(cursor.key().to_vec(), cursor.value()?.into_owned());
            cursor.next();
        }

        Ok(Self {
            source: dir.display().to_string(),
            entries,
        })
    }
}

impl FromIterator<(Vec<u8>, Vec<u8>)> for MemoryStore {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        Self {
            entries: iter.into_iter().collect(),
            ..Self::new()
        }
    }
}

impl RecordStoreWriter for MemoryStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn source(&self) -> &str {
        &self.source
    }

    fn num_records(&self) -> usize {
        self.entries.len()
    }

    fn new_cursor(&self) -> Result<Box<dyn Cursor>> {
        let entries: Vec<_> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Box::new(MemoryCursor {
            entries: entries.into(),
            index: 0,
        }))
    }
}

/// A cursor over a snapshot of a [MemoryStore].
#[derive(Debug)]
pub struct MemoryCursor {
    entries: Arc<[(Vec<u8>, Vec<u8>)]>,
    index: usize,
}

impl Cursor for MemoryCursor {
    fn key(&self) -> &[u8] {
        self.entries
            .get(self.index)
            .map(|(key, _)| key.as_slice())
            .unwrap_or(&[])
    }

    fn value(&self) -> Result<Cow<'_, [u8]>> {
        let (_, value) = self
            .entries
            .get(self.index)
            .ok_or_else(|| format_err!("the cursor is past the last record"))?;
        Ok(Cow::Borrowed(value))
    }

    fn next(&mut self) {
        if self.index < self.entries.len() {
            self.index += 1;
        }
    }

    fn valid(&self) -> bool {
        self.index < self.entries.len()
    }

    fn seek_to_first(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cursor_is_ordered_by_key() {
        let store: MemoryStore = vec![
            (b"b".to_vec(), b"2".to_vec()),
            (b"a".to_vec(), b"1".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.num_records(), 3);

        let mut cursor = store.new_cursor().unwrap();
        let mut values = vec![];
        while cursor.valid() {
            values.push(cursor.value().unwrap().into_owned());
            cursor.next();
        }
        assert_eq!(values, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);

        assert!(cursor.value().is_err());
        cursor.seek_to_first();
        assert_eq!(cursor.key(), b"a");
    }
}
