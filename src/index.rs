//! Building an on-disk index from a directory tree.
//!
//! An index is a flat sequence of fixed-width `BinaryRecord`s: a header
//! record first, carrying the indexed directory's path and (once known)
//! the total size of the tar archive it describes, followed by one record
//! per entry in listing order. Each record's stored size field is the
//! cumulative byte offset in the synthesized tar stream at which that
//! entry ends, so a reader can binary-search or scan the index without
//! ever touching the underlying files.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::entry::{BinaryRecord, Entry, EntryKind, TAR_FOOTER_SIZE};
use crate::error::Result;
use crate::lister::DirLister;
use crate::pathfix::PathMod;
use crate::tar_writer::validate_ustar_name;

/// Write an index for `dir` to `out`, returning the total tar archive size
/// implied by what was indexed (not including any postfix file, which is
/// layered on at read time).
///
/// Writes a placeholder header record first so the record stream has a
/// stable length regardless of whether `out` can seek; callers that can
/// seek (see [`build_index_file`]) should rewrite that header with the
/// correct size once `write_index` returns.
pub fn write_index<W: Write>(dir: &Path, out: &mut W) -> Result<u64> {
    let root_name = dir.to_string_lossy().into_owned();
    let placeholder = BinaryRecord::encode(EntryKind::Header, 0, &root_name)?;
    out.write_all(&placeholder.0)?;

    let path_mod = PathMod::new(root_name.clone(), "./");
    let mut offset = 0u64;
    for entry in DirLister::spawn(dir) {
        let entry = entry?;
        validate_ustar_name(&path_mod.fix_path(&entry.name))?;
        let (new_offset, record) = entry.to_record(offset)?;
        out.write_all(&record.0)?;
        offset = new_offset;
    }
    Ok(offset + TAR_FOOTER_SIZE)
}

/// Build an index for `dir` and write it to `index_path`, fixing up the
/// header record with the final archive size once the full listing has
/// been written.
pub fn build_index_file(dir: &Path, index_path: &Path) -> Result<u64> {
    let mut file = File::create(index_path)?;
    let total_size = write_index(dir, &mut file)?;

    let root_name = dir.to_string_lossy().into_owned();
    let header = BinaryRecord::encode(EntryKind::Header, total_size, &root_name)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header.0)?;
    Ok(total_size)
}

/// Convenience wrapper producing an [`Entry`] for the synthetic header
/// record, for code that wants to round-trip through `to_record` uniformly
/// rather than special-casing the header.
pub fn header_entry(dir: &Path) -> Entry {
    Entry::header(dir.to_string_lossy().into_owned())
}
