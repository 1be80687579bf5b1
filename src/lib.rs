//! Indexed tar streaming: synthesize a byte-exact tar archive for a
//! directory tree from a precomputed index, without ever materializing the
//! whole archive in memory or on disk.
//!
//! A build step ([`index::build_index_file`]) walks a directory
//! ([`lister`]) and writes a flat sequence of fixed-width records
//! ([`entry::BinaryRecord`]) describing where each entry would land in the
//! synthesized tar stream. A read step ([`reader::IndexReader`]) uses that
//! index to jump straight to an arbitrary byte offset (or to a named
//! entry) and stream the remainder of the archive, re-reading each real
//! file from disk as it goes and rewriting its path ([`pathfix`]) onto the
//! archive root.
//!
//! ```no_run
//! use tarindex::index::build_index_file;
//! use tarindex::reader::IndexReader;
//! use std::path::Path;
//!
//! build_index_file(Path::new("/srv/data"), Path::new("/srv/data.index"))?;
//! let mut reader = IndexReader::open("/srv/data.index", None)?;
//! let mut out = std::io::stdout();
//! reader.write_tar(&mut out, None)?;
//! # Ok::<(), tarindex::Error>(())
//! ```

pub mod entry;
pub mod error;
pub mod index;
pub mod lister;
pub mod pathfix;
pub mod reader;
pub mod tar_writer;

pub use error::{Error, Result};
