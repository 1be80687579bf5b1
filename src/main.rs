//! Indexed tar streaming tools.
//!
//! Builds a binary index for a directory tree, then streams a byte-exact
//! tar archive of that tree straight from the index, without ever walking
//! the filesystem again to find out where an entry starts.
//!
//! # Building an index
//! ```bash
//! $ tarindex build /srv/data /srv/data.index
//! wrote /srv/data.index, archive size = 19589632 bytes
//! ```
//!
//! # Streaming the archive
//! Write the whole archive to a file or stdout:
//! ```bash
//! $ tarindex cat /srv/data.index out.tar
//! $ tarindex cat /srv/data.index | tar tv
//! ```
//!
//! Resume at an arbitrary byte offset, e.g. to satisfy an HTTP Range
//! request upstream of this tool:
//! ```bash
//! $ tarindex cat /srv/data.index -p 1048576 -e 2097152 chunk.tar
//! ```
//!
//! Resume relative to a specific file already known to the client, e.g.
//! after a prior download was interrupted partway through it:
//! ```bash
//! $ tarindex cat /srv/data.index -f ./sub/big.bin -p 4096
//! ```
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tarindex::index::build_index_file;
use tarindex::reader::IndexReader;

#[doc(hidden)]
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[doc(hidden)]
#[derive(Subcommand)]
enum Commands {
    /// Build an index for a directory tree.
    Build {
        /// Directory to index.
        #[clap(value_parser, name = "dir", required = true)]
        dir: PathBuf,

        /// Path to write the index to.
        #[clap(value_parser, name = "index-file", required = true)]
        index_file: PathBuf,
    },

    /// Stream a synthesized tar archive from a previously built index.
    Cat {
        /// Path of the index file produced by `build`.
        #[clap(value_parser, name = "index-file", required = true)]
        index_file: PathBuf,

        /// Resume relative to this entry's path instead of an absolute
        /// byte offset.
        #[clap(short = 'f', long, name = "filename")]
        filename: Option<String>,

        /// Starting byte offset (or offset within `filename`, if given).
        #[clap(short = 'p', long, name = "pos", default_value_t = 0)]
        pos: u64,

        /// Absolute end offset in the archive; 0 means to the end.
        #[clap(short = 'e', long, name = "end", default_value_t = 0)]
        end: u64,

        /// Output path; defaults to stdout.
        #[clap(value_parser, name = "output")]
        output: Option<PathBuf>,
    },
}

#[doc(hidden)]
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Build { dir, index_file } => build(dir, index_file),
        Commands::Cat {
            index_file,
            filename,
            pos,
            end,
            output,
        } => cat(index_file, filename.as_deref(), *pos, *end, output.as_deref()),
    }
}

fn build(dir: &std::path::Path, index_file: &std::path::Path) -> Result<()> {
    let size = build_index_file(dir, index_file)
        .with_context(|| format!("building index for {:?}", dir))?;
    println!(
        "wrote {}, archive size = {} bytes",
        index_file.display(),
        size
    );
    Ok(())
}

fn cat(
    index_file: &std::path::Path,
    filename: Option<&str>,
    pos: u64,
    end: u64,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let mut reader =
        IndexReader::open(index_file, None).with_context(|| format!("opening {:?}", index_file))?;

    let mut sink: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {:?}", path))?),
        None => Box::new(io::stdout()),
    };

    reader
        .seek_and_write(filename, pos, end, &mut sink, None)
        .context("streaming tar archive")
}
