use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::serde_util::serde_md5_hex;

use super::flag::EntryFlags;

/// Virtual-root prefix every entry path starts with.
pub const VIRTUAL_ROOT: &str = "res://";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackEntry {
    pub(crate) path: String,
    #[serde(default)]
    pub(crate) offset: u64,
    pub(crate) size: u64,
    #[serde(with = "serde_md5_hex")]
    pub(crate) md5: [u8; 16],
    #[serde(default)]
    pub(crate) flags: EntryFlags,
    #[serde(skip)]
    pub(crate) hash_match: Option<bool>,
}

impl PackEntry {
    pub fn new(path: impl Into<String>, offset: u64, size: u64, md5: [u8; 16], flags: EntryFlags) -> Self {
        Self {
            path: path.into(),
            offset,
            size,
            md5,
            flags,
            hash_match: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn md5(&self) -> &[u8; 16] {
        &self.md5
    }

    pub fn md5_hex(&self) -> String {
        hex::encode(self.md5)
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(EntryFlags::ENCRYPTED)
    }

    pub fn is_removed(&self) -> bool {
        self.flags.contains(EntryFlags::REMOVED)
    }

    /// Outcome of the last verification pass, `None` until this entry has been checked.
    pub fn hash_match(&self) -> Option<bool> {
        self.hash_match
    }

    /// Path with the virtual-root prefix stripped.
    pub fn relative_path(&self) -> &str {
        self.path.strip_prefix(VIRTUAL_ROOT).unwrap_or(&self.path)
    }

    /// Destination of this entry below `root`.
    ///
    /// Returns `None` when the relative path would escape `root`
    /// (parent, root or prefix components) or names no file at all.
    pub fn destination(&self, root: &Path) -> Option<PathBuf> {
        let relative = Path::new(self.relative_path());
        let mut out = root.to_path_buf();
        let mut pushed = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    out.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        pushed.then_some(out)
    }
}

impl std::fmt::Debug for PackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackEntry")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("md5", &self.md5_hex())
            .field("flags", &self.flags)
            .field("hash_match", &self.hash_match)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> PackEntry {
        PackEntry::new(path, 0, 0, [0; 16], EntryFlags::empty())
    }

    #[test]
    fn strips_virtual_root() {
        assert_eq!(entry("res://scenes/main.tscn").relative_path(), "scenes/main.tscn");
        assert_eq!(entry("icon.png").relative_path(), "icon.png");
    }

    #[test]
    fn destination_joins_under_root() {
        let dest = entry("res://a/b/c.txt").destination(Path::new("out")).unwrap();
        assert_eq!(dest, Path::new("out").join("a").join("b").join("c.txt"));
    }

    #[test]
    fn destination_refuses_escape() {
        assert!(entry("res://../evil.txt").destination(Path::new("out")).is_none());
        assert!(entry("res:///etc/passwd").destination(Path::new("out")).is_none());
        assert!(entry("res://").destination(Path::new("out")).is_none());
    }

    #[test]
    fn manifest_entry_round_trips_md5_hex() {
        let json = r#"{"path":"res://a.txt","size":3,"md5":"900150983cd24fb0d6963f7d28e17f72","flags":1}"#;
        let entry: PackEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_encrypted());
        assert_eq!(entry.offset(), 0);
        assert_eq!(entry.hash_match(), None);
        assert_eq!(entry.md5_hex(), "900150983cd24fb0d6963f7d28e17f72");
    }
}
