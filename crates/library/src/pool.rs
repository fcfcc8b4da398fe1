//! Pool directory handle.

use crate::error::{ErrorKind, Result};
use std::fs::{self, File, FileType};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Suffix of detached signature sidecars, which are never package candidates.
const SIGNATURE_SUFFIX: &str = ".sig";

/// How symbolic links inside a pool are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SymlinkPolicy {
    /// Ignore links entirely.
    #[default]
    Skip,
    /// Include links that resolve to a regular file.
    Follow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    /// A link, and whether it resolved to a regular file at snapshot time.
    Symlink { resolves_to_file: bool },
    Other,
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    kind: EntryKind,
}

/// A directory of package archives.
///
/// The directory listing is taken once, when the pool is opened, and sorted
/// by name. Every enumeration afterwards replays that same snapshot, so a
/// counting pass and a loading pass always agree on what they saw.
#[derive(Debug, Clone)]
pub struct Pool {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl Pool {
    /// Snapshot the directory at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be listed, or an entry's type cannot be
    /// determined.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), entries))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let listing = fs::read_dir(&path).map_err(|e| ErrorKind::io(e, &path))?;
        let mut entries = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|e| ErrorKind::io(e, &path))?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(name = ?entry.file_name(), "skipping entry with a non UTF-8 name");
                continue;
            };
            // Falls back to lstat when the directory entry carries no type.
            let file_type = entry.file_type().map_err(|e| ErrorKind::io(e, &entry.path()))?;
            let kind = Self::classify(&path, &name, file_type);
            entries.push(Entry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::Span::current().record("entries", entries.len());
        Ok(Self { path, entries })
    }

    fn classify(path: &Path, name: &str, file_type: FileType) -> EntryKind {
        if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            // Dangling or unreadable links simply do not resolve.
            let resolves_to_file = fs::metadata(path.join(name)).is_ok_and(|m| m.is_file());
            EntryKind::Symlink { resolves_to_file }
        } else {
            EntryKind::Other
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every entry that may be a package archive, in name order.
    ///
    /// That is every regular file (and, with [`SymlinkPolicy::Follow`], every
    /// link to one), except signature sidecars.
    pub fn candidates(&self, symlinks: SymlinkPolicy) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(move |entry| match entry.kind {
                EntryKind::File => true,
                EntryKind::Symlink { resolves_to_file } => symlinks == SymlinkPolicy::Follow && resolves_to_file,
                EntryKind::Other => false,
            })
            .map(|entry| entry.name.as_str())
            .filter(|name| !name.ends_with(SIGNATURE_SUFFIX))
    }

    /// Open the pool entry called `name` for reading.
    pub fn open_file(&self, name: &str) -> Result<File> {
        let path = self.path.join(name);
        File::open(&path).map_err(|e| ErrorKind::io(e, &path).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn populate() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pkg.tar.zst"), b"b").unwrap();
        fs::write(dir.path().join("a.pkg.tar.zst"), b"a").unwrap();
        fs::write(dir.path().join("a.pkg.tar.zst.sig"), b"sig").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink("a.pkg.tar.zst", dir.path().join("link.pkg.tar.zst")).unwrap();
            std::os::unix::fs::symlink("missing", dir.path().join("dangling.pkg.tar.zst")).unwrap();
        }
        dir
    }

    #[rstest]
    #[case(SymlinkPolicy::Skip, &["a.pkg.tar.zst", "b.pkg.tar.zst"])]
    #[cfg_attr(unix, case(SymlinkPolicy::Follow, &["a.pkg.tar.zst", "b.pkg.tar.zst", "link.pkg.tar.zst"]))]
    fn lists_candidates(#[case] policy: SymlinkPolicy, #[case] expected: &[&str]) {
        let dir = populate();
        let pool = Pool::open(dir.path()).unwrap();
        assert_eq!(pool.candidates(policy).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn snapshot_is_stable() {
        let dir = populate();
        let pool = Pool::open(dir.path()).unwrap();
        let first: Vec<_> = pool.candidates(SymlinkPolicy::Skip).map(String::from).collect();
        fs::write(dir.path().join("c.pkg.tar.zst"), b"c").unwrap();
        let second: Vec<_> = pool.candidates(SymlinkPolicy::Skip).map(String::from).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::open(dir.path()).unwrap();
        assert_eq!(pool.candidates(SymlinkPolicy::Follow).count(), 0);
    }

    #[test]
    fn missing_pool_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Pool::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn open_file_reads_entries() {
        let dir = populate();
        let pool = Pool::open(dir.path()).unwrap();
        assert!(pool.open_file("a.pkg.tar.zst").is_ok());
        assert!(matches!(&*pool.open_file("gone").unwrap_err(), ErrorKind::NotFound(_)));
    }
}
