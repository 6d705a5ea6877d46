//! Integrity pass over a loaded catalog.

use std::io::Read;

use md5::{Digest, Md5};
use tracing::{error, info};

use crate::error::{DumpError, Result};
use crate::pack::{EncryptionKey, PackCatalog, PackEntry};
use crate::source::EntrySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The container type carries no checksums; nothing was checked.
    Skipped,
    /// Every entry matched its stored checksum.
    Verified { total: usize },
}

/// Checks every entry of `catalog` against its stored MD5 and records the
/// result in [`PackEntry::hash_match`].
///
/// Plaintext entries are hashed over exactly `size` bytes of their stream.
/// Encrypted entries always pass: their source already refuses to open
/// content that fails the checksum (see [`EntrySource`]).
///
/// All entries are visited even after a failure. An entry whose stream cannot
/// be opened or read counts as a mismatch.
///
/// # Errors
///
/// [`DumpError::IntegrityFailed`] when at least one entry did not match.
pub fn verify_all<S>(catalog: &mut PackCatalog, source: &S) -> Result<VerifyOutcome>
where
    S: EntrySource + ?Sized,
{
    if !catalog.is_checksummed() {
        info!("Not a pack file, skipping MD5 check...");
        return Ok(VerifyOutcome::Skipped);
    }

    let key = catalog.key().clone();
    let entries = catalog.entries_mut();
    let total = entries.len();
    let mut failed = 0usize;

    for entry in entries.iter_mut() {
        entry.hash_match = None;
        let result = check_entry(entry, source, &key);
        entry.hash_match = Some(matches!(result, Ok(true)));

        match result {
            Ok(true) => info!("Verified {}", entry.path()),
            Ok(false) => {
                error!("Checksum failed for {}", entry.path());
                failed += 1;
            }
            Err(e) => {
                error!("Checksum failed for {}: {}", entry.path(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(DumpError::IntegrityFailed { failed, total });
    }
    Ok(VerifyOutcome::Verified { total })
}

fn check_entry<S>(entry: &PackEntry, source: &S, key: &EncryptionKey) -> std::io::Result<bool>
where
    S: EntrySource + ?Sized,
{
    if entry.is_encrypted() {
        return Ok(true);
    }

    let stream = source.open_entry(entry, key)?;
    let mut hasher = Md5::new();
    let hashed = std::io::copy(&mut stream.take(entry.size()), &mut hasher)?;
    if hashed != entry.size() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("stream ended after {} of {} bytes", hashed, entry.size()),
        ));
    }

    Ok(hasher.finalize().as_slice() == entry.md5())
}
