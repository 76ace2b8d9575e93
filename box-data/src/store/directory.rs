use super::*;
use crate::common::*;

/// A store where every file in a directory is one record.
///
/// The key of a record is its file name. Records are ordered by key, and
/// hidden files are skipped. The file list is taken when the store is
/// opened, and record contents are read on demand.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    source: String,
    entries: Arc<[(Vec<u8>, PathBuf)]>,
}

impl DirectoryStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        ensure!(
            dir.is_dir(),
            "the record store '{}' is not a directory",
            dir.display()
        );

        let mut entries: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("failed to list '{}'", dir.display()))?
            .map(|entry| -> Result<_> {
                let entry = entry?;
                let is_file = entry.file_type()?.is_file();
                let name = entry.file_name();
                let name = name
                    .to_str()
                    .ok_or_else(|| format_err!("non-UTF-8 file name {:?}", name))?
                    .to_owned();
                Ok((is_file && !name.starts_with('.')).then(|| (name, entry.path())))
            })
            .filter_map(|result| result.transpose())
            .try_collect()?;
        entries.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

        let entries: Vec<_> = entries
            .into_iter()
            .map(|(name, path)| (name.into_bytes(), path))
            .collect();

        Ok(Self {
            source: dir.display().to_string(),
            entries: entries.into(),
        })
    }

    /// Create the directory if needed and return a writer into it.
    pub fn create(dir: impl AsRef<Path>) -> Result<DirectoryStoreWriter> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
        Ok(DirectoryStoreWriter {
            dir: dir.to_owned(),
        })
    }
}

impl RecordStore for DirectoryStore {
    fn source(&self) -> &str {
        &self.source
    }

    fn num_records(&self) -> usize {
        self.entries.len()
    }

    fn new_cursor(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(DirectoryCursor {
            entries: self.entries.clone(),
            index: 0,
        }))
    }
}

/// Writes records as files of a directory store.
#[derive(Debug)]
pub struct DirectoryStoreWriter {
    dir: PathBuf,
}

impl RecordStoreWriter for DirectoryStoreWriter {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let name = std::str::from_utf8(key)
            .map_err(|_| format_err!("the key {:?} is not valid UTF-8", key))?;
        ensure!(
            !name.is_empty()
                && !name.starts_with('.')
                && !name.contains(std::path::is_separator),
            "the key '{}' cannot be used as a file name",
            name
        );
        let path = self.dir.join(name);
        fs::write(&path, value)
            .with_context(|| format!("failed to write record '{}'", path.display()))?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct DirectoryCursor {
    entries: Arc<[(Vec<u8>, PathBuf)]>,
    index: usize,
}

impl Cursor for DirectoryCursor {
    fn key(&self) -> &[u8] {
        self.entries
            .get(self.index)
            .map(|(key, _)| key.as_slice())
            .unwrap_or(&[])
    }

    fn value(&self) -> Result<Cow<'_, [u8]>> {
        let (_, path) = self
            .entries
            .get(self.index)
            .ok_or_else(|| format_err!("the cursor is past the last record"))?;
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read record '{}'", path.display()))?;
        Ok(Cow::Owned(bytes))
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
    fn directory_store_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DirectoryStore::create(dir.path()).unwrap();
        writer.put(b"00000002", b"two").unwrap();
        writer.put(b"00000000", b"zero").unwrap();
        writer.put(b"00000001", b"one").unwrap();
        fs::write(dir.path().join(".hidden"), b"skip").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let store = DirectoryStore::open(dir.path()).unwrap();
        assert_eq!(store.num_records(), 3);

        let mut cursor = store.new_cursor().unwrap();
        let mut values = vec![];
        while cursor.valid() {
            values.push(cursor.value().unwrap().into_owned());
            cursor.next();
        }
        assert_eq!(values, vec![b"zero".to_vec(), b"one".to_vec(), b"two".to_vec()]);

        let memory = MemoryStore::load_dir(dir.path()).unwrap();
        assert_eq!(memory.num_records(), 3);
    }

    #[test]
    fn directory_writer_rejects_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DirectoryStore::create(dir.path()).unwrap();
        assert!(writer.put(b"a/b", b"x").is_err());
        assert!(writer.put(b".a", b"x").is_err());
        assert!(writer.put(b"", b"x").is_err());
    }
}
