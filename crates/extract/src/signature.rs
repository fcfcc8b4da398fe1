//! Detached signature sidecars.

use crate::archive::modified;
use crate::error::{ErrorKind, Result};
use crate::models::PackageRecord;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::Path;
use tracing::instrument;

/// Attach `<filename>.sig` from `dir` to `record`, if there is one.
///
/// The signature is stored base64 encoded. When the sidecar is newer than the
/// archive, its modification time becomes the record's
/// [`file_mtime`](PackageRecord::file_mtime) so that re-signing a package
/// counts as a change.
///
/// Returns whether a signature was attached. A missing sidecar is not an
/// error.
///
/// # Errors
///
/// Any failure to open, stat or read a sidecar that does exist is a fatal
/// [`ErrorKind::Signature`].
#[instrument(skip(record), fields(filename = record.filename.as_deref()))]
pub fn attach_signature(record: &mut PackageRecord, dir: &Path) -> Result<bool> {
    let filename = record.filename.as_deref().ok_or_raise(|| ErrorKind::MissingField("filename"))?;
    let signame = format!("{filename}.sig");
    let raise = || ErrorKind::Signature(signame.clone());

    let mut file = match File::open(dir.join(&signame)) {
        Ok(file) => file,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).or_raise(raise),
    };
    let metadata = file.metadata().or_raise(raise)?;
    let mut signature = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut signature).or_raise(raise)?;

    record.signature = Some(BASE64_STANDARD.encode(&signature));
    let mtime = modified(&metadata).or_raise(raise)?;
    if record.file_mtime.is_none_or(|current| mtime > current) {
        tracing::debug!(%mtime, "signature is newer than package");
        record.file_mtime = Some(mtime);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::set_mtime;
    use time::OffsetDateTime;

    fn record_at(filename: &str, mtime: i64) -> PackageRecord {
        let mut record = PackageRecord::new(filename);
        record.file_mtime = Some(OffsetDateTime::from_unix_timestamp(mtime).unwrap());
        record
    }

    #[test]
    fn missing_signature_leaves_record_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = record_at("foo-1.0-1-any.pkg.tar.zst", 1_000);
        let before = record.clone();
        assert!(!attach_signature(&mut record, dir.path()).unwrap());
        assert_eq!(record, before);
        assert_eq!(record.signature, None);
    }

    #[test]
    fn newer_signature_raises_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let sig = dir.path().join("foo-1.0-1-any.pkg.tar.zst.sig");
        std::fs::write(&sig, b"\x89\x01\x33signature").unwrap();
        set_mtime(&sig, 2_000).unwrap();

        let mut record = record_at("foo-1.0-1-any.pkg.tar.zst", 1_000);
        assert!(attach_signature(&mut record, dir.path()).unwrap());
        assert_eq!(record.signature.as_deref(), Some(BASE64_STANDARD.encode(b"\x89\x01\x33signature").as_str()));
        assert_eq!(record.file_mtime.map(|t| t.unix_timestamp()), Some(2_000));
    }

    #[test]
    fn older_signature_keeps_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let sig = dir.path().join("foo.pkg.tar.sig");
        std::fs::write(&sig, b"sig").unwrap();
        set_mtime(&sig, 500).unwrap();

        let mut record = record_at("foo.pkg.tar", 1_000);
        assert!(attach_signature(&mut record, dir.path()).unwrap());
        assert_eq!(record.signature.as_deref(), Some("c2ln"));
        assert_eq!(record.file_mtime.map(|t| t.unix_timestamp()), Some(1_000));
    }

    #[test]
    fn unreadable_signature_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory opens fine but cannot be read.
        std::fs::create_dir(dir.path().join("foo.pkg.tar.sig")).unwrap();
        let mut record = record_at("foo.pkg.tar", 1_000);
        let err = attach_signature(&mut record, dir.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::Signature("foo.pkg.tar.sig".into()));
        assert!(!err.is_recoverable());
    }
}
