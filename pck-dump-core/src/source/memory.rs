use std::collections::HashMap;
use std::io::Cursor;

use crate::pack::{EncryptionKey, PackEntry};

use super::{EntrySource, EntryStream};

/// Entry content held in memory, keyed by virtual path.
///
/// Content is served as-is for every entry, encrypted or not: whatever is
/// stored here is already plaintext that has passed its checksum.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl EntrySource for MemorySource {
    fn open_entry<'a>(&'a self, entry: &PackEntry, _key: &EncryptionKey) -> std::io::Result<EntryStream<'a>> {
        let data = self.files.get(entry.path()).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: not found", entry.path()),
            )
        })?;
        Ok(Box::new(Cursor::new(data.as_slice())))
    }
}
