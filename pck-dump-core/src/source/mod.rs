//! Byte-stream access to the content of catalog entries.

mod container;
mod memory;

use std::io::Read;

use crate::pack::{EncryptionKey, PackEntry};

pub use container::*;
pub use memory::*;

/// Read stream for one entry.
pub type EntryStream<'a> = Box<dyn Read + 'a>;

/// Opens read streams for catalog entries, keyed by their virtual path.
///
/// A returned stream yields at least [`PackEntry::size`] bytes of plaintext
/// content. It may yield more, since some containers hand out a view that runs
/// into the following entries; callers read exactly `size` bytes.
///
/// # Encrypted entries
///
/// For an entry flagged [`ENCRYPTED`](crate::pack::EntryFlags::ENCRYPTED) the
/// stream is responsible for decryption, and opening **must fail** whenever the
/// decrypted content would not match the entry's stored checksum. The
/// integrity verifier relies on this and never re-hashes encrypted entries.
pub trait EntrySource {
    fn open_entry<'a>(&'a self, entry: &PackEntry, key: &EncryptionKey) -> std::io::Result<EntryStream<'a>>;
}

impl<S> EntrySource for Box<S>
where
    S: EntrySource + ?Sized,
{
    fn open_entry<'a>(&'a self, entry: &PackEntry, key: &EncryptionKey) -> std::io::Result<EntryStream<'a>> {
        (**self).open_entry(entry, key)
    }
}

impl<S> EntrySource for &S
where
    S: EntrySource + ?Sized,
{
    fn open_entry<'a>(&'a self, entry: &PackEntry, key: &EncryptionKey) -> std::io::Result<EntryStream<'a>> {
        (**self).open_entry(entry, key)
    }
}

/// Turns the raw stored bytes of an encrypted entry into plaintext.
///
/// Implementations take over the [`EntrySource`] contract: `decrypt` must
/// return an error when the decrypted content fails its checksum.
pub trait EntryDecryptor {
    fn decrypt<'a>(&self, entry: &PackEntry, key: &EncryptionKey, raw: EntryStream<'a>)
    -> std::io::Result<EntryStream<'a>>;
}
