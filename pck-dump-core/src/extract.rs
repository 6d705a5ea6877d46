use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{DumpError, FailureReason, Result};
use crate::pack::{PackCatalog, PackEntry};
use crate::source::EntrySource;

/// Size of the intermediate buffer used to stream entries to disk.
pub const COPY_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub enum ExtractEvent {
    Start { total: usize },
    FileStart { path: String },
    FileDone { path: String, error: Option<String> },
    Finish { extracted: usize, skipped: usize, failed: usize },
}

#[derive(Debug)]
pub struct ExtractFailure {
    pub path: String,
    pub reason: FailureReason,
}

/// Outcome of one extraction call.
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub extracted: usize,
    pub skipped: usize,
    pub failures: Vec<ExtractFailure>,
}

impl ExtractReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// One `<path> (<reason>)` line per failed entry.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|failure| format!("{} ({})", failure.path, failure.reason))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct PackExtractBuilder<'a> {
    catalog: &'a PackCatalog,
    source: &'a dyn EntrySource,
    output_dir: PathBuf,
    requested: HashSet<String>,
    overwrite: bool,
    on_event: Option<Arc<dyn Fn(ExtractEvent) + Send + Sync>>,
}

impl<'a> PackExtractBuilder<'a> {
    pub fn new(catalog: &'a PackCatalog, source: &'a dyn EntrySource, output_dir: impl AsRef<Path>) -> Self {
        Self {
            catalog,
            source,
            output_dir: output_dir.as_ref().to_path_buf(),
            requested: HashSet::new(),
            overwrite: true,
            on_event: None,
        }
    }

    /// Restrict extraction to these virtual paths. Matching is exact; an
    /// empty set extracts everything.
    pub fn files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Truncate existing destination files (default). When disabled, an
    /// existing file is reported as a write failure.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn on_event<F>(mut self, on_event: F) -> Self
    where
        F: Fn(ExtractEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Extracts the selected entries.
    ///
    /// Per-entry failures never abort the loop; they are collected into the
    /// returned report.
    ///
    /// # Errors
    ///
    /// [`DumpError::CantWrite`] when the output directory cannot be created or
    /// is not writable. No entry is touched in that case.
    pub fn run(self) -> Result<ExtractReport> {
        acquire_output_dir(&self.output_dir)?;

        let mut report = ExtractReport::default();
        let mut tasks: Vec<&PackEntry> = Vec::new();
        for entry in self.catalog.entries() {
            if !self.requested.is_empty() && !self.requested.contains(entry.path()) {
                report.skipped += 1;
                continue;
            }
            tasks.push(entry);
        }

        self.emit(|| ExtractEvent::Start { total: tasks.len() });

        for entry in tasks {
            self.emit(|| ExtractEvent::FileStart {
                path: entry.path().to_string(),
            });
            let result = self.extract_one(entry);
            self.emit(|| ExtractEvent::FileDone {
                path: entry.path().to_string(),
                error: result.as_ref().err().map(|e| e.to_string()),
            });
            match result {
                Ok(out_path) => {
                    info!("Extracted {}", out_path.display());
                    report.extracted += 1;
                }
                Err(reason) => {
                    debug!("Failed to extract {}: {}", entry.path(), reason);
                    report.failures.push(ExtractFailure {
                        path: entry.path().to_string(),
                        reason,
                    });
                }
            }
        }

        if report.is_success() {
            info!("No errors detected!");
        } else {
            warn!(
                "At least one error was detected while extracting pack!\n{}",
                report.summary()
            );
        }

        self.emit(|| ExtractEvent::Finish {
            extracted: report.extracted,
            skipped: report.skipped,
            failed: report.failed(),
        });

        Ok(report)
    }

    fn emit(&self, event: impl FnOnce() -> ExtractEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event());
        }
    }

    fn extract_one(&self, entry: &PackEntry) -> std::result::Result<PathBuf, FailureReason> {
        let mut entry_reader = self
            .source
            .open_entry(entry, self.catalog.key())
            .map_err(FailureReason::ReadOpen)?;

        let out_path = entry
            .destination(&self.output_dir)
            .ok_or(FailureReason::UnsafePath)?;
        if let Some(parent) = out_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(FailureReason::WriteOpen)?;
        }

        let mut open_options = OpenOptions::new();
        if self.overwrite {
            open_options.create(true).write(true).truncate(true);
        } else {
            open_options.create_new(true).write(true);
        }
        let mut file = open_options.open(&out_path).map_err(FailureReason::WriteOpen)?;

        let copied = copy_exact(&mut entry_reader, &mut file, entry.size()).and_then(|written| {
            file.flush()
                .map_err(|source| FailureReason::Copy { written, source })
        });
        drop(file);
        if let Err(reason) = copied {
            // partial files are never left under the entry's name
            if let Err(e) = std::fs::remove_file(&out_path) {
                debug!("Failed to remove partial file {}: {}", out_path.display(), e);
            }
            return Err(reason);
        }

        Ok(out_path)
    }
}

impl PackCatalog {
    pub fn extractor<'a>(
        &'a self,
        source: &'a dyn EntrySource,
        output_dir: impl AsRef<Path>,
    ) -> PackExtractBuilder<'a> {
        PackExtractBuilder::new(self, source, output_dir)
    }
}

/// Copies exactly `size` bytes from `reader` to `writer` through a
/// [`COPY_BUFFER_SIZE`] buffer. Bytes past `size` are left unread.
pub fn copy_exact<R, W>(reader: &mut R, writer: &mut W, size: u64) -> std::result::Result<u64, FailureReason>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut remaining = size;
    let mut written = 0u64;

    while remaining > 0 {
        let want = remaining.min(COPY_BUFFER_SIZE as u64) as usize;
        let got = match reader.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(FailureReason::Truncated {
                    expected: size,
                    written,
                });
            }
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(FailureReason::Copy { written, source }),
        };
        writer
            .write_all(&buf[..got])
            .map_err(|source| FailureReason::Copy { written, source })?;
        written += got as u64;
        remaining -= got as u64;
    }

    Ok(written)
}

fn acquire_output_dir(path: &Path) -> Result<()> {
    let cant_write = |source| DumpError::CantWrite {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(path).map_err(cant_write)?;
    let metadata = std::fs::metadata(path).map_err(cant_write)?;
    if !metadata.is_dir() {
        return Err(cant_write(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }
    if metadata.permissions().readonly() {
        return Err(cant_write(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only directory",
        )));
    }
    // permission bits say nothing about ownership; try an actual write
    tempfile::NamedTempFile::new_in(path).map_err(cant_write)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::pack::EntryFlags;
    use crate::source::MemorySource;

    use super::*;

    /// Hands out at most `chunk` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.chunk).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn copy_exact_counts_transferred_bytes() {
        for size in [0, COPY_BUFFER_SIZE - 1, COPY_BUFFER_SIZE, COPY_BUFFER_SIZE + 1, 3 * COPY_BUFFER_SIZE + 7] {
            let data = pattern(size);
            let mut reader = Trickle {
                data: &data,
                chunk: 1000,
            };
            let mut out = Vec::new();
            let written = copy_exact(&mut reader, &mut out, size as u64).unwrap();
            assert_eq!(written, size as u64);
            assert_eq!(out, data);
        }
    }

    #[test]
    fn copy_exact_leaves_trailing_bytes() {
        let data = b"entrynext-entry";
        let mut reader = &data[..];
        let mut out = Vec::new();
        copy_exact(&mut reader, &mut out, 5).unwrap();
        assert_eq!(out, b"entry");
        assert_eq!(reader, b"next-entry");
    }

    #[test]
    fn copy_exact_reports_truncation() {
        let mut reader = &b"abc"[..];
        let mut out = Vec::new();
        let err = copy_exact(&mut reader, &mut out, 10).unwrap_err();
        assert!(matches!(err, FailureReason::Truncated { expected: 10, written: 3 }));
    }

    fn entry(path: &str, size: usize) -> PackEntry {
        PackEntry::new(path, 0, size as u64, [0; 16], EntryFlags::empty())
    }

    #[test]
    fn no_overwrite_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"old").unwrap();
        let source = MemorySource::new().with_file("res://a.txt", b"new".to_vec());
        let catalog = PackCatalog::new("game.pck", vec![entry("res://a.txt", 3)]);

        let report = catalog.extractor(&source, dir.path()).overwrite(false).run().unwrap();
        assert_eq!(report.failed(), 1);
        assert!(matches!(report.failures[0].reason, FailureReason::WriteOpen(_)));
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"old");
    }

    #[test]
    fn overwrite_truncates_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"much longer old content").unwrap();
        let source = MemorySource::new().with_file("res://a.txt", b"new".to_vec());
        let catalog = PackCatalog::new("game.pck", vec![entry("res://a.txt", 3)]);

        let report = catalog.extractor(&source, dir.path()).run().unwrap();
        assert!(report.is_success());
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"new");
    }

    #[test]
    fn escaping_paths_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let source = MemorySource::new().with_file("res://../evil.txt", b"x".to_vec());
        let catalog = PackCatalog::new("game.pck", vec![entry("res://../evil.txt", 1)]);

        let report = catalog.extractor(&source, &out).run().unwrap();
        assert!(matches!(report.failures[0].reason, FailureReason::UnsafePath));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn short_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("res://a.bin", b"abc".to_vec());
        let catalog = PackCatalog::new("game.pck", vec![entry("res://a.bin", 10)]);

        let report = catalog.extractor(&source, dir.path()).run().unwrap();
        assert!(matches!(
            report.failures[0].reason,
            FailureReason::Truncated { expected: 10, written: 3 }
        ));
        assert!(!dir.path().join("a.bin").exists());
    }

    #[test]
    fn events_follow_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("res://a", b"a".to_vec());
        let catalog = PackCatalog::new("game.pck", vec![entry("res://a", 1), entry("res://b", 1), entry("res://c", 1)]);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let report = catalog
            .extractor(&source, dir.path())
            .files(["res://a", "res://b"])
            .on_event(move |event| sink.lock().unwrap().push(event))
            .run()
            .unwrap();
        assert_eq!(report.skipped, 1);

        let events = events.lock().unwrap();
        assert!(matches!(events[0], ExtractEvent::Start { total: 2 }));
        assert!(matches!(&events[2], ExtractEvent::FileDone { path, error: None } if path == "res://a"));
        assert!(matches!(&events[4], ExtractEvent::FileDone { path, error: Some(_) } if path == "res://b"));
        assert!(matches!(
            events[5],
            ExtractEvent::Finish {
                extracted: 1,
                skipped: 1,
                failed: 1
            }
        ));
    }

    /// Serves "abc" and then fails for `res://broken.bin`, delegates otherwise.
    struct BrokenMidway(MemorySource);

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("boom"))
        }
    }

    impl EntrySource for BrokenMidway {
        fn open_entry<'a>(
            &'a self,
            entry: &PackEntry,
            key: &crate::pack::EncryptionKey,
        ) -> std::io::Result<crate::source::EntryStream<'a>> {
            if entry.path() == "res://broken.bin" {
                return Ok(Box::new((&b"abc"[..]).chain(Broken)));
            }
            self.0.open_entry(entry, key)
        }
    }

    #[test]
    fn read_error_mid_copy_fails_only_that_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = BrokenMidway(MemorySource::new().with_file("res://next.bin", b"next".to_vec()));
        let catalog = PackCatalog::new("game.pck", vec![entry("res://broken.bin", 10), entry("res://next.bin", 4)]);

        let report = catalog.extractor(&source, dir.path()).run().unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].path, "res://broken.bin");
        assert!(matches!(report.failures[0].reason, FailureReason::Copy { written: 3, .. }));
        assert!(!dir.path().join("broken.bin").exists());
        assert_eq!(std::fs::read(dir.path().join("next.bin")).unwrap(), b"next");
    }

    #[cfg(unix)]
    #[test]
    fn read_only_destination_is_refused() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("locked");
        std::fs::create_dir(&out).unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o555)).unwrap();
        let source = MemorySource::new().with_file("res://a.txt", b"a".to_vec());
        let catalog = PackCatalog::new("game.pck", vec![entry("res://a.txt", 1)]);

        let fired = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&fired);
        let result = catalog
            .extractor(&source, &out)
            .on_event(move |_| *counter.lock().unwrap() += 1)
            .run();

        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(DumpError::CantWrite { .. })));
        assert_eq!(*fired.lock().unwrap(), 0);
        assert!(!out.join("a.txt").exists());
    }

    #[test]
    fn summary_lists_every_failure() {
        let report = ExtractReport {
            extracted: 0,
            skipped: 0,
            failures: vec![
                ExtractFailure {
                    path: "res://a".into(),
                    reason: FailureReason::UnsafePath,
                },
                ExtractFailure {
                    path: "res://b".into(),
                    reason: FailureReason::Truncated { expected: 2, written: 1 },
                },
            ],
        };
        assert_eq!(
            report.summary(),
            "res://a (unsafe destination path)\nres://b (source ended after 1 of 2 bytes)"
        );
    }
}
