use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::error::{DumpError, Result};
use crate::pack::{EncryptionKey, PackEntry};

use super::{EntryDecryptor, EntrySource, EntryStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerBackend {
    /// Use `memmap2` memory mapping.
    Mmap,
    /// Use regular file IO.
    File,
}

impl Default for ContainerBackend {
    fn default() -> Self {
        Self::Mmap
    }
}

#[derive(Default)]
pub struct ContainerSourceBuilder {
    backend: ContainerBackend,
    decryptor: Option<Box<dyn EntryDecryptor>>,
}

impl ContainerSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: ContainerBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn mmap(mut self, enabled: bool) -> Self {
        self.backend = if enabled {
            ContainerBackend::Mmap
        } else {
            ContainerBackend::File
        };
        self
    }

    pub fn decryptor(mut self, decryptor: impl EntryDecryptor + 'static) -> Self {
        self.decryptor = Some(Box::new(decryptor));
        self
    }

    pub fn open(self, path: impl AsRef<Path>) -> Result<ContainerSource> {
        ContainerSource::open_with(path, self.backend, self.decryptor)
    }
}

/// Entry content stored at `offset..offset + size` of a single container file.
///
/// Encrypted entries are handed to the configured [`EntryDecryptor`] with a
/// raw view running from the entry offset to the end of the container; without
/// a decryptor they fail to open.
pub struct ContainerSource {
    path: PathBuf,
    backend: ContainerBackend,
    inner: ContainerInner,
    decryptor: Option<Box<dyn EntryDecryptor>>,
}

enum ContainerInner {
    Mmap { mmap: Mmap },
    File { file: File, len: u64 },
}

impl ContainerSource {
    pub fn builder() -> ContainerSourceBuilder {
        ContainerSourceBuilder::new()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ContainerBackend::default(), None)
    }

    fn open_with(
        path: impl AsRef<Path>,
        backend: ContainerBackend,
        decryptor: Option<Box<dyn EntryDecryptor>>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let path_abs = path
            .canonicalize()
            .map_err(|e| DumpError::IO(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))?;

        let file = File::open(&path_abs)?;
        let inner = match backend {
            ContainerBackend::Mmap => {
                // SAFETY: read-only mapping; the file is held for the lifetime of the mmap.
                let mmap = unsafe { MmapOptions::new().map(&file)? };
                ContainerInner::Mmap { mmap }
            }
            ContainerBackend::File => {
                let len = file.metadata()?.len();
                ContainerInner::File { file, len }
            }
        };

        Ok(Self {
            path: path_abs,
            backend,
            inner,
            decryptor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> ContainerBackend {
        self.backend
    }

    pub fn len(&self) -> u64 {
        match &self.inner {
            ContainerInner::Mmap { mmap } => mmap.len() as u64,
            ContainerInner::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn raw_range(&self, offset: u64, end: u64) -> std::io::Result<EntryStream<'_>> {
        Ok(match &self.inner {
            ContainerInner::Mmap { mmap } => Box::new(&mmap[offset as usize..end as usize]),
            ContainerInner::File { file, .. } => {
                let mut f = file.try_clone()?;
                f.seek(SeekFrom::Start(offset))?;
                Box::new(BufReader::new(f.take(end - offset)))
            }
        })
    }
}

impl EntrySource for ContainerSource {
    fn open_entry<'a>(&'a self, entry: &PackEntry, key: &EncryptionKey) -> std::io::Result<EntryStream<'a>> {
        let container_size = self.len();
        let offset = entry.offset();

        if entry.is_encrypted() {
            let Some(decryptor) = &self.decryptor else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("{}: encrypted entry and no decryptor configured", entry.path()),
                ));
            };
            if offset > container_size {
                return Err(range_error(entry, container_size));
            }
            let raw = self.raw_range(offset, container_size)?;
            return decryptor.decrypt(entry, key, raw);
        }

        let end = offset
            .checked_add(entry.size())
            .filter(|end| *end <= container_size)
            .ok_or_else(|| range_error(entry, container_size))?;
        self.raw_range(offset, end)
    }
}

fn range_error(entry: &PackEntry, container_size: u64) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        DumpError::InvalidEntryRange {
            offset: entry.offset(),
            size: entry.size(),
            container_size,
        },
    )
}
