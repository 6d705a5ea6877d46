use std::path::Path;

use crate::error::{DumpError, Result};
use crate::extract::{ExtractReport, PackExtractBuilder};
use crate::pack::PackCatalog;
use crate::source::EntrySource;
use crate::verify::{self, VerifyOutcome};

/// A catalog together with the source its entries are read from.
pub struct LoadedPack {
    catalog: PackCatalog,
    source: Box<dyn EntrySource>,
}

impl LoadedPack {
    pub fn new(catalog: PackCatalog, source: impl EntrySource + 'static) -> Self {
        Self {
            catalog,
            source: Box::new(source),
        }
    }

    pub fn catalog(&self) -> &PackCatalog {
        &self.catalog
    }

    pub fn source(&self) -> &dyn EntrySource {
        &*self.source
    }
}

/// Dump session over at most one loaded pack.
///
/// Verification takes `&mut self`, so a catalog is never verified and
/// extracted at the same time.
#[derive(Default)]
pub struct PckDumper {
    pack: Option<LoadedPack>,
}

impl PckDumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pack(catalog: PackCatalog, source: impl EntrySource + 'static) -> Self {
        Self {
            pack: Some(LoadedPack::new(catalog, source)),
        }
    }

    /// Loads a pack, returning the previously loaded one if any.
    pub fn load(&mut self, catalog: PackCatalog, source: impl EntrySource + 'static) -> Option<LoadedPack> {
        self.pack.replace(LoadedPack::new(catalog, source))
    }

    pub fn unload(&mut self) -> Option<LoadedPack> {
        self.pack.take()
    }

    pub fn is_loaded(&self) -> bool {
        self.pack.is_some()
    }

    pub fn pack(&self) -> Option<&LoadedPack> {
        self.pack.as_ref()
    }

    pub fn catalog(&self) -> Option<&PackCatalog> {
        self.pack.as_ref().map(LoadedPack::catalog)
    }

    /// See [`verify::verify_all`].
    pub fn verify_all(&mut self) -> Result<VerifyOutcome> {
        let LoadedPack { catalog, source } = self.pack.as_mut().ok_or(DumpError::NotLoaded)?;
        verify::verify_all(catalog, &**source)
    }

    /// Extractor for the loaded pack, writing below `output_dir`.
    pub fn extractor(&self, output_dir: impl AsRef<Path>) -> Result<PackExtractBuilder<'_>> {
        let pack = self.pack.as_ref().ok_or(DumpError::NotLoaded)?;
        Ok(pack.catalog.extractor(&*pack.source, output_dir))
    }

    /// Extracts `requested` entries (all when empty) below `output_dir`.
    ///
    /// # Errors
    ///
    /// [`DumpError::NotLoaded`] without a loaded pack and
    /// [`DumpError::CantWrite`] when `output_dir` is unusable. Per-entry
    /// failures are only reported in the returned [`ExtractReport`].
    pub fn extract<S>(&self, output_dir: impl AsRef<Path>, requested: &[S]) -> Result<ExtractReport>
    where
        S: AsRef<str>,
    {
        self.extractor(output_dir)?
            .files(requested.iter().map(|path| path.as_ref().to_string()))
            .run()
    }
}
