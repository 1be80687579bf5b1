//! Entries in a directory listing and their fixed-width on-disk encoding.
//!
//! See spec.md §3 and §6: a `BinaryRecord` is always exactly 265 bytes —
//! an 8-byte little-endian cumulative offset, a 1-byte type tag, and a
//! 256-byte NUL-padded name. The `Header` record (type tag 0xFF) carries the
//! total archive size instead of a cumulative offset.

use std::convert::TryFrom;

use crate::error::{Error, Result};

/// Tar block size. All headers, padding, and the footer are multiples of
/// this.
pub const TAR_BLOCK_SIZE: u64 = 512;

/// Two zero blocks mark the end of a tar archive.
pub const TAR_FOOTER_SIZE: u64 = TAR_BLOCK_SIZE * 2;

const SIZE_LEN: usize = 8;
const TYPE_LEN: usize = 1;
const NAME_LEN: usize = 256;
const SIZE_POS: usize = 0;
const TYPE_POS: usize = SIZE_POS + SIZE_LEN;
const NAME_POS: usize = TYPE_POS + TYPE_LEN;
pub const RECORD_SIZE: usize = SIZE_LEN + TYPE_LEN + NAME_LEN;

/// Kind of a member in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Synthetic first record carrying archive metadata, not a tar member.
    Header,
    Directory,
    File,
    Link,
}

impl EntryKind {
    fn tag(self) -> u8 {
        match self {
            EntryKind::Header => 0xFF,
            EntryKind::Directory => 0x01,
            EntryKind::File => 0x02,
            EntryKind::Link => 0x03,
        }
    }
}

impl TryFrom<u8> for EntryKind {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0xFF => Ok(EntryKind::Header),
            0x01 => Ok(EntryKind::Directory),
            0x02 => Ok(EntryKind::File),
            0x03 => Ok(EntryKind::Link),
            _ => Err(Error::Unsupported),
        }
    }
}

/// A logical member of the archive (or the synthetic header record).
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: EntryKind,
    /// Path, as recorded at index time (or the root directory path, for
    /// `Header`).
    pub name: String,
    /// For `File`, the byte length of the file. For `Header`, the total
    /// archive size. Zero for `Directory`/`Link`.
    pub size: u64,
    /// First byte this entry occupies in the tar stream. Only meaningful
    /// once read back from an index.
    pub first_byte: u64,
    /// One past the last byte this entry occupies in the tar stream (i.e.
    /// the start of the next entry). Only meaningful once read back.
    pub last_byte: u64,
}

impl Entry {
    pub fn header(root_dir: impl Into<String>) -> Entry {
        Entry {
            kind: EntryKind::Header,
            name: root_dir.into(),
            size: 0,
            first_byte: 0,
            last_byte: 0,
        }
    }

    pub fn directory(name: impl Into<String>) -> Entry {
        Entry {
            kind: EntryKind::Directory,
            name: name.into(),
            size: 0,
            first_byte: 0,
            last_byte: 0,
        }
    }

    pub fn file(name: impl Into<String>, size: u64) -> Entry {
        Entry {
            kind: EntryKind::File,
            name: name.into(),
            size,
            first_byte: 0,
            last_byte: 0,
        }
    }

    pub fn link(name: impl Into<String>) -> Entry {
        Entry {
            kind: EntryKind::Link,
            name: name.into(),
            size: 0,
            first_byte: 0,
            last_byte: 0,
        }
    }

    /// Number of bytes this entry occupies in the synthesized tar archive:
    /// just the header for directories and links, header + content rounded
    /// up to a block boundary for files.
    pub fn tar_size(&self) -> u64 {
        match self.kind {
            EntryKind::Directory | EntryKind::Link => TAR_BLOCK_SIZE,
            EntryKind::File => TAR_BLOCK_SIZE + round_up_block(self.size),
            EntryKind::Header => 0,
        }
    }

    /// Encode this entry as a `BinaryRecord`, given the cumulative offset
    /// preceding it. Returns the new cumulative offset (this entry's
    /// `last_byte`) alongside the record. For the `Header` entry, `offset`
    /// is used directly as the stored size (total archive size) rather than
    /// accumulated.
    pub fn to_record(&self, offset: u64) -> Result<(u64, BinaryRecord)> {
        let stored = match self.kind {
            EntryKind::Header => offset,
            _ => offset
                .checked_add(self.tar_size())
                .expect("archive size overflowed u64"),
        };
        let record = BinaryRecord::encode(self.kind, stored, &self.name)?;
        Ok((stored, record))
    }
}

/// Round `size` up to the next multiple of 512, leaving exact multiples
/// (including zero) unchanged.
pub fn round_up_block(size: u64) -> u64 {
    let rem = size % TAR_BLOCK_SIZE;
    if rem == 0 {
        size
    } else {
        size + (TAR_BLOCK_SIZE - rem)
    }
}

/// Fixed 265-byte on-disk form of an `Entry`.
#[derive(Debug, Clone)]
pub struct BinaryRecord(pub [u8; RECORD_SIZE]);

impl BinaryRecord {
    pub fn encode(kind: EntryKind, stored_size: u64, name: &str) -> Result<BinaryRecord> {
        let name_bytes = name.as_bytes();
        if name_bytes.len() > NAME_LEN {
            return Err(Error::Tar(format!(
                "name {:?} exceeds {} bytes",
                name, NAME_LEN
            )));
        }
        let mut buf = [0u8; RECORD_SIZE];
        buf[SIZE_POS..SIZE_POS + SIZE_LEN].copy_from_slice(&stored_size.to_le_bytes());
        buf[TYPE_POS] = kind.tag();
        buf[NAME_POS..NAME_POS + name_bytes.len()].copy_from_slice(name_bytes);
        Ok(BinaryRecord(buf))
    }

    pub fn stored_size(&self) -> u64 {
        let mut bytes = [0u8; SIZE_LEN];
        bytes.copy_from_slice(&self.0[SIZE_POS..SIZE_POS + SIZE_LEN]);
        u64::from_le_bytes(bytes)
    }

    pub fn kind(&self) -> Result<EntryKind> {
        EntryKind::try_from(self.0[TYPE_POS])
    }

    pub fn name(&self) -> Result<String> {
        let raw = &self.0[NAME_POS..NAME_POS + NAME_LEN];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8(raw[..end].to_vec()).map_err(|e| Error::Tar(e.to_string()))
    }

    /// Interpret this record as a non-header entry, given the cumulative
    /// offset preceding it (this entry's `first_byte`).
    pub fn into_entry(self, base_offset: u64) -> Result<Entry> {
        let stored = self.stored_size();
        Ok(Entry {
            kind: self.kind()?,
            name: self.name()?,
            size: stored - base_offset,
            first_byte: base_offset,
            last_byte: stored,
        })
    }

    /// Interpret this record as the index header: size is the total archive
    /// size (or 0 if unknown), name is the root directory path.
    pub fn into_header(self) -> Result<(u64, String)> {
        Ok((self.stored_size(), self.name()?))
    }
}
