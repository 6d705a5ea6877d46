use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-file flags as recorded in the pack directory.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct EntryFlags: u32 {
        const ENCRYPTED = 1 << 0;
        const REMOVED = 1 << 1;
    }
}

impl Serialize for EntryFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for EntryFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        Ok(EntryFlags::from_bits_truncate(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_dropped() {
        let flags: EntryFlags = serde_json::from_str("7").unwrap();
        assert_eq!(flags, EntryFlags::ENCRYPTED | EntryFlags::REMOVED);
        assert_eq!(serde_json::to_string(&flags).unwrap(), "3");
    }
}
