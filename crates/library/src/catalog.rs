//! Loading existing repository databases.
//!
//! A repository database (`core.db`, `core.files`, ...) is a compressed tar
//! archive with one directory per package, named `<name>-<version>`, holding
//! `desc`, `depends` and (for `.files` databases) `files` entries.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use memchr::memrchr;
use pacstage_cache::PackageCache;
use pacstage_compress::Compression;
use pacstage_extract::{Field, PackageRecord, parse_desc};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use time::OffsetDateTime;
use tracing::instrument;

/// Location of an entry inside the database archive.
#[derive(Debug, PartialEq, Eq)]
struct EntryPath<'a> {
    name: &'a str,
    version: &'a str,
    kind: &'a str,
}

impl<'a> EntryPath<'a> {
    /// Split `name-pkgver-pkgrel/kind`. The version is everything after the
    /// second-to-last dash of the directory name, since package names may
    /// contain dashes of their own.
    fn parse(path: &'a str) -> Option<Self> {
        let (directory, kind) = path.split_once('/').unwrap_or((path, ""));
        let release_dash = memrchr(b'-', directory.as_bytes())?;
        let version_dash = memrchr(b'-', &directory.as_bytes()[..release_dash])?;
        Some(Self {
            name: &directory[..version_dash],
            version: &directory[version_dash + 1..],
            kind,
        })
    }

    /// Whether this entry may create the package it describes. `files`
    /// entries only ever add to packages already seen.
    fn creates_package(&self) -> Option<bool> {
        match self.kind {
            "desc" | "depends" => Some(true),
            "files" => Some(false),
            _ => None,
        }
    }
}

/// Read the repository database at `path` into a cache.
///
/// Records are seeded with the name and version from their directory, so an
/// entry that disagrees with its own directory is rejected. Each record's
/// [`file_mtime`](PackageRecord::file_mtime) is the database's modification
/// time.
///
/// # Errors
///
/// Fails if the database cannot be opened, is not a readable archive, has an
/// entry whose path does not name a package, or has an entry that does not
/// parse.
#[instrument(skip_all, fields(path = %path.display(), packages))]
pub fn load_database(path: &Path) -> Result<PackageCache> {
    let raise = || ErrorKind::Database(path.display().to_string());
    let file = File::open(path).map_err(|e| ErrorKind::io(e, path))?;
    let metadata = file.metadata().map_err(|e| ErrorKind::io(e, path))?;
    let modified: OffsetDateTime = metadata.modified().map_err(|e| ErrorKind::io(e, path))?.into();
    let mtime = OffsetDateTime::from_unix_timestamp(modified.unix_timestamp()).or_raise(raise)?;

    let (_, reader) = Compression::sniff(BufReader::new(file)).or_raise(raise)?;
    let mut archive = tar::Archive::new(reader);
    let mut cache = PackageCache::new();
    for entry in archive.entries().or_raise(raise)? {
        let mut entry = entry.or_raise(raise)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let location = EntryPath::parse(&entry_path).ok_or_raise(|| ErrorKind::Database(entry_path.clone()))?;
        let Some(creates) = location.creates_package() else {
            continue;
        };
        let slot = match cache.lookup(location.name) {
            Some(slot) => slot,
            None if creates => {
                cache.insert_or_replace(seed(&location, mtime).or_raise(raise)?);
                cache.lookup(location.name).ok_or_raise(raise)?
            },
            None => continue,
        };
        let record = cache.get_mut(slot).ok_or_raise(raise)?;
        parse_desc(record, BufReader::new(&mut entry)).or_raise(|| ErrorKind::Database(entry_path.clone()))?;
    }
    tracing::Span::current().record("packages", cache.len());
    Ok(cache)
}

fn seed(location: &EntryPath<'_>, mtime: OffsetDateTime) -> pacstage_extract::error::Result<PackageRecord> {
    let mut record = PackageRecord::default();
    record.set(Field::Name, location.name.as_bytes())?;
    record.set(Field::Version, location.version.as_bytes())?;
    record.file_mtime = Some(mtime);
    Ok(record)
}
