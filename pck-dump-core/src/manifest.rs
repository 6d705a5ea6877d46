//! JSON catalog manifests.
//!
//! ```json
//! {
//!   "pack_path": "game.pck",
//!   "key": "00112233...",
//!   "entries": [
//!     { "path": "res://icon.png", "offset": 64, "size": 1024, "md5": "9e107d9d372bb6826bd81d3542a419d6", "flags": 0 }
//!   ]
//! }
//! ```
//!
//! A relative `pack_path` is resolved against the manifest's directory.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::pack::PackCatalog;

impl PackCatalog {
    pub fn from_manifest_reader<R>(reader: R) -> Result<Self>
    where
        R: Read,
    {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_manifest_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut catalog = Self::from_manifest_reader(BufReader::new(file))?;

        if catalog.pack_path.is_relative()
            && let Some(parent) = path.parent()
        {
            catalog.pack_path = parent.join(&catalog.pack_path);
        }

        Ok(catalog)
    }

    pub fn write_manifest<W>(&self, writer: W) -> Result<()>
    where
        W: Write,
    {
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
