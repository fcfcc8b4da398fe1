//! Package archive loading.

use crate::error::{ErrorKind, Result};
use crate::models::PackageRecord;
use crate::pkginfo::parse_pkginfo;
use exn::{OptionExt, ResultExt};
use pacstage_compress::Compression;
use std::fs::{File, Metadata};
use std::io::{BufReader, Read};
use time::OffsetDateTime;
use tracing::instrument;

const MANIFEST: &[u8] = b".PKGINFO";

/// Knobs for [`load_package`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadOptions {
    /// Walk the whole archive and collect every non-dotfile entry path into
    /// [`PackageRecord::files`], instead of stopping at the manifest.
    pub files: bool,
}

/// Load the metadata of the package archive opened as `file`.
///
/// The compression filter is detected from content, never from `filename`.
/// Only a regular-file entry named exactly `.PKGINFO` is treated as the
/// manifest; everything else in the archive is skipped (or, with
/// [`LoadOptions::files`], recorded). On success the record carries the
/// archive's on-disk size and modification time.
///
/// # Errors
///
/// Failing to stat the already opened `file` is [`ErrorKind::Io`]. An
/// unreadable or corrupt archive is [`ErrorKind::Archive`], an archive
/// without a manifest is [`ErrorKind::MissingManifest`], and a manifest that
/// never names the package or its version is [`ErrorKind::MissingField`];
/// all three are recoverable. Manifest content errors are fatal, see
/// [`parse_pkginfo`].
#[instrument(skip(file), fields(format, entries))]
pub fn load_package(file: File, filename: &str, options: LoadOptions) -> Result<PackageRecord> {
    let metadata = file.metadata().or_raise(|| ErrorKind::Io)?;
    let mut record = PackageRecord::new(filename);

    let (format, reader) = Compression::sniff(BufReader::new(file)).or_raise(|| ErrorKind::Archive)?;
    tracing::Span::current().record("format", format.as_str());
    let entries = read_entries(reader, &mut record, options)?;
    tracing::Span::current().record("entries", entries);

    if !record.is_identified() {
        let missing = if record.name.is_none() { "pkgname" } else { "pkgver" };
        exn::bail!(ErrorKind::MissingField(missing));
    }
    record.compressed_size = metadata.len();
    record.file_mtime = Some(modified(&metadata)?);
    record.rehash();
    Ok(record)
}

/// Walk the tar container, returning how many entries were visited.
fn read_entries(reader: impl Read, record: &mut PackageRecord, options: LoadOptions) -> Result<usize> {
    let mut archive = tar::Archive::new(reader);
    let mut found = false;
    let mut visited = 0usize;
    for entry in archive.entries().or_raise(|| ErrorKind::Archive)? {
        let mut entry = entry.or_raise(|| ErrorKind::Archive)?;
        visited += 1;
        let (is_manifest, listed) = {
            let path = entry.path_bytes();
            let is_manifest = entry.header().entry_type().is_file() && &*path == MANIFEST;
            let listed = (options.files && !path.starts_with(b".")).then(|| String::from_utf8_lossy(&path).into_owned());
            (is_manifest, listed)
        };
        if is_manifest && !found {
            parse_pkginfo(record, BufReader::new(&mut entry))?;
            found = true;
            if !options.files {
                break;
            }
        }
        record.files.extend(listed);
    }
    found.then_some(visited).ok_or_raise(|| ErrorKind::MissingManifest)
}

/// Modification time of a file, truncated to whole seconds.
pub(crate) fn modified(metadata: &Metadata) -> Result<OffsetDateTime> {
    let modified: OffsetDateTime = metadata.modified().or_raise(|| ErrorKind::Io)?.into();
    OffsetDateTime::from_unix_timestamp(modified.unix_timestamp()).or_raise(|| ErrorKind::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::PackageBuilder;
    use rstest::rstest;
    use std::ops::Deref;

    fn open(dir: &tempfile::TempDir, name: &str) -> File {
        File::open(dir.path().join(name)).unwrap()
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Gzip)]
    #[case(Compression::Bzip2)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn loads_any_filter(#[case] format: Compression) {
        let dir = tempfile::tempdir().unwrap();
        let filename = PackageBuilder::new("zlib", "1:1.3.1-2")
            .arch("x86_64")
            .depend("glibc")
            .compression(format)
            .write_to(dir.path())
            .unwrap();

        let record = load_package(open(&dir, &filename), &filename, LoadOptions::default()).unwrap();
        assert_eq!(record.name(), "zlib");
        assert_eq!(record.version(), "1:1.3.1-2");
        assert_eq!(record.filename.as_deref(), Some(filename.as_str()));
        assert_eq!(record.architecture.as_deref(), Some("x86_64"));
        assert_eq!(record.depends, ["glibc"]);
        assert_eq!(record.name_hash, crc32fast::hash(b"zlib"));

        let metadata = std::fs::metadata(dir.path().join(&filename)).unwrap();
        assert_eq!(record.compressed_size, metadata.len());
        assert_eq!(record.file_mtime, Some(modified(&metadata).unwrap()));
        assert_eq!(record.file_mtime.map(|t| t.nanosecond()), Some(0));
    }

    #[test]
    fn collects_files_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let filename = PackageBuilder::new("zlib", "1.3.1-2")
            .file("usr/lib/libz.so.1", b"\x7fELF")
            .file("usr/include/zlib.h", b"/* zlib */")
            .write_to(dir.path())
            .unwrap();

        let record = load_package(open(&dir, &filename), &filename, LoadOptions::default()).unwrap();
        assert!(record.files.is_empty());

        let record = load_package(open(&dir, &filename), &filename, LoadOptions { files: true }).unwrap();
        assert_eq!(record.files, ["usr/lib/libz.so.1", "usr/include/zlib.h"]);
    }

    #[test]
    fn manifest_must_be_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let filename = PackageBuilder::new("zlib", "1.3.1-2")
            .manifest_as_directory()
            .write_to(dir.path())
            .unwrap();
        let err = load_package(open(&dir, &filename), &filename, LoadOptions::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingManifest);
    }

    #[test]
    fn garbage_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.pkg.tar.zst"), b"this is not a package archive").unwrap();
        let err = load_package(open(&dir, "junk.pkg.tar.zst"), "junk.pkg.tar.zst", LoadOptions::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::Archive);
        assert!(err.is_recoverable());
    }

    #[test]
    fn archive_errors_keep_their_cause() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("short.pkg.tar"), b"this is not a package archive").unwrap();
        let err = load_package(open(&dir, "short.pkg.tar"), "short.pkg.tar", LoadOptions::default()).unwrap_err();
        // The debug report lists the tar failure beneath the archive error.
        let report = format!("{err:?}");
        assert!(report.starts_with(&err.to_string()), "{report}");
        assert!(report.lines().count() > 1, "{report}");
    }

    #[test]
    fn corrupt_compressed_stream_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let mut junk = vec![0x1F, 0x8B];
        junk.extend_from_slice(b"definitely not deflate data, padded out to a few dozen bytes");
        std::fs::write(dir.path().join("bad.pkg.tar.gz"), &junk).unwrap();
        let err = load_package(open(&dir, "bad.pkg.tar.gz"), "bad.pkg.tar.gz", LoadOptions::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::Archive);
    }

    #[test]
    fn empty_file_has_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.pkg.tar"), b"").unwrap();
        let err = load_package(open(&dir, "empty.pkg.tar"), "empty.pkg.tar", LoadOptions::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingManifest);
    }

    #[test]
    fn manifest_without_version_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let filename = PackageBuilder::from_manifest("broken.pkg.tar", "pkgname = broken\n")
            .write_to(dir.path())
            .unwrap();
        let err = load_package(open(&dir, &filename), &filename, LoadOptions::default()).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MissingField("pkgver")));
        assert!(err.is_recoverable());
    }

    #[test]
    fn conflicting_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let filename =
            PackageBuilder::from_manifest("twice.pkg.tar", "pkgname = foo\npkgname = bar\npkgver = 1.0-1\n")
                .write_to(dir.path())
                .unwrap();
        let err = load_package(open(&dir, &filename), &filename, LoadOptions::default()).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::IdentityMismatch { .. }));
        assert!(!err.is_recoverable());
    }
}
