use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, DumpError>;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Upstream IO Error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Pack not loaded")]
    NotLoaded,
    #[error("Cannot write to destination `{path}`: {source}")]
    CantWrite { path: PathBuf, source: std::io::Error },
    #[error("Checksum failed for {failed} of {total} files")]
    IntegrityFailed { failed: usize, total: usize },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),
    #[error("Entry range out of bounds: offset={offset}, size={size}, container_size={container_size}")]
    InvalidEntryRange { offset: u64, size: u64, container_size: u64 },
}

/// Why a single entry could not be extracted. Never escalated past the
/// extraction loop; collected into [`crate::extract::ExtractReport`].
#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    #[error("FileAccess error: {0}")]
    ReadOpen(std::io::Error),
    #[error("FileWrite error: {0}")]
    WriteOpen(std::io::Error),
    #[error("unsafe destination path")]
    UnsafePath,
    #[error("copy failed after {written} bytes: {source}")]
    Copy { written: u64, source: std::io::Error },
    #[error("source ended after {written} of {expected} bytes")]
    Truncated { expected: u64, written: u64 },
}
