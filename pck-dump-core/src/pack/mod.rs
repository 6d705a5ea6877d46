mod entry;
mod flag;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::serde_util::serde_key_hex;

pub use entry::*;
pub use flag::*;

/// Extensions of containers that carry per-file MD5 checksums.
pub const CHECKSUMMED_EXTENSIONS: [&str; 2] = ["pck", "exe"];

/// Opaque global decryption key. Only handed through to an
/// [`EntryDecryptor`](crate::source::EntryDecryptor); never inspected here.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKey(#[serde(with = "serde_key_hex")] Vec<u8>);

impl EncryptionKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptionKey({} bytes)", self.0.len())
    }
}

/// Pack catalog, stores the entries of one opened pack in directory order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackCatalog {
    pub(crate) pack_path: PathBuf,
    #[serde(default)]
    pub(crate) key: EncryptionKey,
    pub(crate) entries: Vec<PackEntry>,
}

impl PackCatalog {
    pub fn new(pack_path: impl AsRef<Path>, entries: Vec<PackEntry>) -> Self {
        PackCatalog {
            pack_path: pack_path.as_ref().to_path_buf(),
            key: EncryptionKey::default(),
            entries,
        }
    }

    pub fn with_key(mut self, key: EncryptionKey) -> Self {
        self.key = key;
        self
    }

    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    /// Extension of the pack file, empty when it has none.
    pub fn extension(&self) -> &str {
        self.pack_path.extension().and_then(|ext| ext.to_str()).unwrap_or_default()
    }

    /// Whether the container format stores checksums worth verifying.
    pub fn is_checksummed(&self) -> bool {
        let ext = self.extension();
        CHECKSUMMED_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    pub fn entries(&self) -> &[PackEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [PackEntry] {
        &mut self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&PackEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// `true` once every entry has been verified and matched.
    pub fn all_verified(&self) -> bool {
        self.entries.iter().all(|entry| entry.hash_match == Some(true))
    }
}
