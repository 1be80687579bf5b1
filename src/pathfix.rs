//! Rewriting recorded paths onto the root of the synthesized archive.
//!
//! Entries are indexed with the path they were walked from (e.g.
//! `/srv/data/sub/file.txt`), but a tar archive should root its members at
//! `./`. `PathMod` carries the base directory the index was built from and
//! rewrites every recorded name relative to it, the way a real archiver
//! would if invoked from inside that directory.

/// Rewrites paths recorded under `base_dir` to be relative to `mod_dir`
/// (normally `"./"`).
#[derive(Debug, Clone)]
pub struct PathMod {
    pub base_dir: String,
    pub mod_dir: String,
}

impl PathMod {
    pub fn new(base_dir: impl Into<String>, mod_dir: impl Into<String>) -> PathMod {
        PathMod {
            base_dir: base_dir.into(),
            mod_dir: mod_dir.into(),
        }
    }

    /// Rewrite `orig` under this mapping.
    ///
    /// Three cases, checked in order:
    /// 1. `orig` starts with `base_dir + "/"`: replace that prefix with
    ///    `mod_dir`.
    /// 2. `orig` equals `base_dir`, or `base_dir` with a trailing slash:
    ///    collapses to `mod_dir` exactly (the root entry itself).
    /// 3. Otherwise: join `orig` onto `mod_dir`.
    pub fn fix_path(&self, orig: &str) -> String {
        let prefix = format!("{}/", self.base_dir);
        if let Some(rest) = orig.strip_prefix(&prefix) {
            return join(&self.mod_dir, rest);
        }
        let trimmed_base = self.base_dir.trim_end_matches('/');
        if orig == self.base_dir || orig.trim_end_matches('/') == trimmed_base {
            return self.mod_dir.clone();
        }
        join(&self.mod_dir, orig)
    }
}

fn join(mod_dir: &str, rest: &str) -> String {
    if mod_dir.ends_with('/') {
        format!("{}{}", mod_dir, rest)
    } else {
        format!("{}/{}", mod_dir, rest)
    }
}
