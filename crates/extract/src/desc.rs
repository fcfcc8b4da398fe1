//! Repository database `desc` entry parsing.
//!
//! A `desc` (or `depends`, or `files`) entry is a series of sections, each a
//! `%KEY%` header followed by one value per line and terminated by a blank
//! line:
//!
//! ```text
//! %NAME%
//! zlib
//!
//! %DEPENDS%
//! glibc
//! ```

use crate::error::{ErrorKind, Result};
use crate::fields::Field;
use crate::models::PackageRecord;
use exn::ResultExt;
use std::io::BufRead;
use tracing::instrument;

enum Section {
    /// Between sections.
    Idle,
    /// Inside a section whose values are assigned to a field.
    Field(Field),
    /// Inside a recognized section that has no field to land in.
    Ignored,
}

/// Feed every section of a database entry into `record`.
///
/// # Errors
///
/// Reading the stream fails with [`ErrorKind::Archive`]. A value line outside
/// of any section is an [`ErrorKind::ParseError`]. Unknown headers and
/// rejected values are reported by [`PackageRecord::set`], including a
/// `%NAME%`/`%VERSION%` that disagrees with what the record already holds.
#[instrument(level = "debug", skip_all, fields(name = record.name()))]
pub fn parse_desc(record: &mut PackageRecord, reader: impl BufRead) -> Result<()> {
    let mut section = Section::Idle;
    for line in reader.split(b'\n') {
        let line = line.or_raise(|| ErrorKind::Archive)?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        if line.is_empty() {
            section = Section::Idle;
            continue;
        }
        if let Some(key) = header(line) {
            section = match Field::from_desc_key(key)? {
                Some(field) => Section::Field(field),
                None => Section::Ignored,
            };
            continue;
        }
        match section {
            Section::Field(field) => record.set(field, line)?,
            Section::Ignored => {},
            Section::Idle => exn::bail!(ErrorKind::ParseError {
                field: "desc",
                value: String::from_utf8_lossy(line).into_owned(),
            }),
        }
    }
    Ok(())
}

fn header(line: &[u8]) -> Option<&[u8]> {
    line.strip_prefix(b"%")?.strip_suffix(b"%").filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Deref;

    const DESC: &str = "\
%FILENAME%
zlib-1:1.3.1-2-x86_64.pkg.tar.zst

%NAME%
zlib

%VERSION%
1:1.3.1-2

%CSIZE%
94080

%MD5SUM%
d41d8cd98f00b204e9800998ecf8427e

%LICENSE%
Zlib

%BUILDDATE%
1705000000

";

    #[test]
    fn parses_sections() {
        let mut record = PackageRecord::default();
        parse_desc(&mut record, DESC.as_bytes()).unwrap();
        assert_eq!(record.filename.as_deref(), Some("zlib-1:1.3.1-2-x86_64.pkg.tar.zst"));
        assert_eq!(record.name(), "zlib");
        assert_eq!(record.version(), "1:1.3.1-2");
        assert_eq!(record.compressed_size, 94080);
        assert_eq!(record.licenses, ["Zlib"]);
        assert_eq!(record.build_time.map(|t| t.unix_timestamp()), Some(1_705_000_000));
    }

    #[test]
    fn multi_value_sections_append() {
        let mut record = PackageRecord::default();
        parse_desc(&mut record, b"%DEPENDS%\nglibc\nzlib\n\n%PROVIDES%\nlibz.so=1-64\n".as_slice()).unwrap();
        assert_eq!(record.depends, ["glibc", "zlib"]);
        assert_eq!(record.provides, ["libz.so=1-64"]);
    }

    #[test]
    fn mismatched_name_is_fatal() {
        let mut record = PackageRecord::default();
        record.set(Field::Name, b"zlib").unwrap();
        let err = parse_desc(&mut record, b"%NAME%\nbzip2\n\n".as_slice()).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::IdentityMismatch { field: "name", .. }));
    }

    #[test]
    fn value_outside_section_is_fatal() {
        let mut record = PackageRecord::default();
        let err = parse_desc(&mut record, b"zlib\n".as_slice()).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::ParseError { field: "desc", .. }));
    }

    #[test]
    fn unknown_header_is_fatal() {
        let mut record = PackageRecord::default();
        let err = parse_desc(&mut record, b"%COLOUR%\nblue\n".as_slice()).unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownKey("COLOUR".into()));
    }
}
