//! Streaming a synthesized tar archive back out of a built index.
//!
//! An `IndexReader` opens an index file, learns the archive's total size
//! from its header record, and can then be pointed at an arbitrary byte
//! offset (or an offset relative to a named entry) before streaming the
//! rest of the archive out. Locating the starting entry is a binary search
//! over the index's fixed-width records rather than a scan of the
//! filesystem, so seeking is cheap even for large trees; entries that fall
//! entirely before the requested position are never even opened.
//!
//! The reader is single-use: once seeking, the caller has committed to a
//! single stream of output, mirroring an HTTP range response that can't be
//! restarted mid-flight.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::entry::{BinaryRecord, RECORD_SIZE, TAR_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::pathfix::PathMod;
use crate::tar_writer::{
    postfix_file_size, write_directory_entry, write_file_entry, write_footer,
    write_link_entry, write_postfix_file, RegionCursor,
};

/// A synthetic regular file inserted after the real entries and before the
/// footer, such as a build identifier or version stamp.
#[derive(Debug, Clone)]
pub struct PostfixFile {
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Fresh,
    Sought,
    Written,
    Done,
}

/// Where a resolved byte position falls in the archive.
#[derive(Debug, Clone, Copy)]
enum Location {
    /// Inside (or before) the entry whose record lives at index `index`
    /// among the entry records (0-based, not counting the header record).
    Entry { index: usize, local_skip: u64 },
    Postfix { local_skip: u64 },
    Footer { local_skip: u64 },
    /// Exactly at the end of the archive: nothing left to write.
    End,
}

pub struct IndexReader {
    index_path: PathBuf,
    root_dir: String,
    path_mod: PathMod,
    total_size: u64,
    postfix: Option<PostfixFile>,
    state: ReaderState,
    /// Absolute archive offset resolved by the last seek, used for the
    /// content-length callback. Zero (and meaningless) while `Fresh`.
    seek_pos: u64,
    location: Location,
}

impl IndexReader {
    /// Open an index built by [`crate::index::build_index_file`]. The
    /// directory the index was built from is read from the index's header
    /// record, so entries' filesystem paths (which were recorded absolute)
    /// resolve without the caller repeating the path.
    pub fn open(index_path: impl Into<PathBuf>, postfix: Option<PostfixFile>) -> Result<Self> {
        let index_path = index_path.into();
        let mut file = File::open(&index_path)?;
        let (mut total_size, root_dir) = match read_header_record(&mut file)? {
            Some(header) => header.into_header()?,
            None => {
                log::warn!(
                    "index {:?} is missing or has a malformed header record; size() will report 0",
                    index_path
                );
                (0u64, String::new())
            }
        };
        if let Some(p) = &postfix {
            if total_size > 0 {
                total_size += postfix_file_size(p.content.len() as u64);
            }
        }
        let path_mod = PathMod::new(root_dir.clone(), "./");
        Ok(IndexReader {
            index_path,
            root_dir,
            path_mod,
            total_size,
            postfix,
            state: ReaderState::Fresh,
            seek_pos: 0,
            location: Location::Entry {
                index: 0,
                local_skip: 0,
            },
        })
    }

    /// Total size of the archive this index describes, postfix and footer
    /// included.
    pub fn size(&self) -> u64 {
        self.total_size
    }

    /// Root directory the index was built from.
    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    /// Seek to an absolute byte offset in the synthesized archive. May be
    /// called at most once per reader.
    pub fn seek_byte(&mut self, pos: u64) -> Result<()> {
        if self.state != ReaderState::Fresh {
            return Err(Error::NoSeek);
        }
        self.location = self.locate(pos)?;
        self.seek_pos = pos;
        self.state = ReaderState::Sought;
        Ok(())
    }

    /// Seek to a byte offset relative to the start of a named entry's tar
    /// region (header included). May be called at most once per reader.
    pub fn seek_file(&mut self, filename: &str, pos: u64) -> Result<()> {
        if self.state != ReaderState::Fresh {
            return Err(Error::NoSeek);
        }
        let found = self.find_entry_record(filename)?;
        let (index, first_byte) = found.ok_or(Error::MissingFile)?;
        let absolute = first_byte
            .checked_add(pos)
            .ok_or(Error::SkipBoundary)?;
        if absolute > self.total_size {
            return Err(Error::SkipBoundary);
        }
        self.location = Location::Entry {
            index,
            local_skip: pos,
        };
        self.seek_pos = absolute;
        self.state = ReaderState::Sought;
        Ok(())
    }

    /// Seek (by filename if given, else by absolute position) and stream
    /// the rest of the archive, up to an absolute end offset (`0` means to
    /// the end of the archive). Matches the coordinate space of whichever
    /// seek was used: positions are relative to the named file when
    /// `filename` is given, absolute otherwise. `on_content_length`, if
    /// given, is told how many bytes will be written before any are.
    pub fn seek_and_write(
        &mut self,
        filename: Option<&str>,
        pos: u64,
        end: u64,
        out: &mut impl Write,
        on_content_length: Option<&mut dyn FnMut(u64)>,
    ) -> Result<()> {
        match filename {
            Some(name) => self.seek_file(name, pos)?,
            None => self.seek_byte(pos)?,
        }
        let remaining = if end == 0 {
            None
        } else {
            Some(end.saturating_sub(pos))
        };
        if let Some(cb) = on_content_length {
            let len = if self.seek_pos == 0 {
                self.total_size
            } else {
                TAR_BLOCK_SIZE + self.total_size - self.seek_pos
            };
            cb(len);
        }
        self.write_tar(out, remaining)
    }

    /// Stream the archive (or, after a seek, the remainder of it) to `out`,
    /// writing no more than `budget` bytes (`None` for unlimited).
    pub fn write_tar(&mut self, out: &mut impl Write, budget: Option<u64>) -> Result<()> {
        if self.state == ReaderState::Written || self.state == ReaderState::Done {
            return Err(Error::NoSeek);
        }
        self.state = ReaderState::Written;

        match self.location {
            Location::End => {}
            Location::Entry { index, local_skip } => {
                let mut cursor = RegionCursor::new(out, local_skip, budget);
                self.stream_entries_from(index, &mut cursor)?;
                if !cursor.is_exhausted() {
                    self.stream_postfix(&mut cursor)?;
                }
                if !cursor.is_exhausted() {
                    write_footer(&mut cursor)?;
                }
            }
            Location::Postfix { local_skip } => {
                let mut cursor = RegionCursor::new(out, local_skip, budget);
                self.stream_postfix(&mut cursor)?;
                if !cursor.is_exhausted() {
                    write_footer(&mut cursor)?;
                }
            }
            Location::Footer { local_skip } => {
                let mut cursor = RegionCursor::new(out, local_skip, budget);
                write_footer(&mut cursor)?;
            }
        }

        self.state = ReaderState::Done;
        Ok(())
    }

    fn stream_postfix(&self, cursor: &mut RegionCursor<impl Write>) -> Result<()> {
        if let Some(p) = &self.postfix {
            write_postfix_file(cursor, &p.name, &p.content)?;
        }
        Ok(())
    }

    fn stream_entries_from(
        &self,
        start_index: usize,
        cursor: &mut RegionCursor<impl Write>,
    ) -> Result<()> {
        let mut file = File::open(&self.index_path)?;
        let mut prev_offset = if start_index == 0 {
            0
        } else {
            self.read_stored_offset(&mut file, start_index - 1)?
        };
        file.seek(SeekFrom::Start(
            (RECORD_SIZE * (start_index + 1)) as u64,
        ))?;
        loop {
            if cursor.is_exhausted() {
                return Ok(());
            }
            let record = match read_record(&mut file) {
                Ok(r) => r,
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let entry = record.into_entry(prev_offset)?;
            prev_offset = entry.last_byte;
            match entry.kind {
                crate::entry::EntryKind::Directory => {
                    write_directory_entry(cursor, &entry, &self.path_mod)?
                }
                crate::entry::EntryKind::Link => {
                    write_link_entry(cursor, &entry, &self.path_mod)?
                }
                crate::entry::EntryKind::File => {
                    write_file_entry(cursor, &entry, &self.path_mod)?
                }
                crate::entry::EntryKind::Header => return Err(Error::Unsupported),
            }
        }
        Ok(())
    }

    fn read_stored_offset(&self, file: &mut File, entry_index: usize) -> Result<u64> {
        file.seek(SeekFrom::Start(
            (RECORD_SIZE * (entry_index + 1)) as u64,
        ))?;
        Ok(read_record(file)?.stored_size())
    }

    fn entry_count(&self, file: &mut File) -> Result<usize> {
        let len = file.metadata()?.len();
        if len < RECORD_SIZE as u64 || (len - RECORD_SIZE as u64) % RECORD_SIZE as u64 != 0 {
            return Err(Error::MissingHeader);
        }
        Ok(((len - RECORD_SIZE as u64) / RECORD_SIZE as u64) as usize)
    }

    /// Binary search the index's entry records for the one spanning `pos`.
    fn locate(&self, pos: u64) -> Result<Location> {
        if pos > self.total_size {
            return Err(Error::SkipBoundary);
        }
        if pos == self.total_size {
            return Ok(Location::End);
        }

        let mut file = File::open(&self.index_path)?;
        let n = self.entry_count(&mut file)?;

        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let stored = self.read_stored_offset(&mut file, mid)?;
            if stored > pos {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        if lo < n {
            let first_byte = if lo == 0 {
                0
            } else {
                self.read_stored_offset(&mut file, lo - 1)?
            };
            return Ok(Location::Entry {
                index: lo,
                local_skip: pos - first_byte,
            });
        }

        let entries_end = if n == 0 {
            0
        } else {
            self.read_stored_offset(&mut file, n - 1)?
        };
        let postfix_len = self
            .postfix
            .as_ref()
            .map(|p| postfix_file_size(p.content.len() as u64))
            .unwrap_or(0);
        let footer_start = entries_end + postfix_len;
        if pos < footer_start {
            Ok(Location::Postfix {
                local_skip: pos - entries_end,
            })
        } else {
            Ok(Location::Footer {
                local_skip: pos - footer_start,
            })
        }
    }

    /// Linear scan for the entry record matching `filename` (compared
    /// after the same path rewrite `PathMod` applies when writing
    /// headers). Returns its entry-record index and its `first_byte`.
    fn find_entry_record(&self, filename: &str) -> Result<Option<(usize, u64)>> {
        let mut file = File::open(&self.index_path)?;
        file.seek(SeekFrom::Start(RECORD_SIZE as u64))?;
        let mut prev_offset = 0u64;
        let mut index = 0usize;
        loop {
            let record = match read_record(&mut file) {
                Ok(r) => r,
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None)
                }
                Err(e) => return Err(e),
            };
            let entry = record.into_entry(prev_offset)?;
            let fixed = self.path_mod.fix_path(&entry.name);
            if fixed == filename || entry.name == filename {
                return Ok(Some((index, entry.first_byte)));
            }
            prev_offset = entry.last_byte;
            index += 1;
        }
    }
}

fn read_record(file: &mut File) -> Result<BinaryRecord> {
    let mut buf = [0u8; RECORD_SIZE];
    file.read_exact(&mut buf)?;
    Ok(BinaryRecord(buf))
}

/// Read and validate the index's leading header record. Returns `Ok(None)`
/// (rather than an error) when the record is absent (file too short) or
/// malformed (wrong type tag) — per spec.md §4.3/§7, a missing header is
/// recoverable and leaves the reader functional with `size() == 0`, rather
/// than failing `open` outright.
fn read_header_record(file: &mut File) -> Result<Option<BinaryRecord>> {
    match read_record(file) {
        Ok(record) => match record.kind() {
            Ok(crate::entry::EntryKind::Header) => Ok(Some(record)),
            _ => Ok(None),
        },
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}
