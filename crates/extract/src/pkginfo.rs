//! `.PKGINFO` manifest parsing.
//!
//! The manifest is a flat list of `key = value` lines. Keys repeat for list
//! fields (`depend = foo` once per dependency), blank lines and `#` comments
//! are ignored.

use crate::error::{ErrorKind, Result};
use crate::fields::Field;
use crate::models::PackageRecord;
use exn::ResultExt;
use memchr::memchr;
use std::io::BufRead;
use tracing::instrument;

/// Feed every `key = value` line of a manifest into `record`.
///
/// # Errors
///
/// Reading the stream fails with [`ErrorKind::Archive`], since a manifest that
/// cannot be read to the end means the surrounding archive is corrupt. A line
/// without `=` is an [`ErrorKind::ParseError`]; unknown keys and rejected
/// values are reported by [`PackageRecord::set`].
#[instrument(level = "debug", skip_all, fields(lines))]
pub fn parse_pkginfo(record: &mut PackageRecord, reader: impl BufRead) -> Result<()> {
    let mut count = 0usize;
    for line in reader.split(b'\n') {
        let line = line.or_raise(|| ErrorKind::Archive)?;
        let line = line.trim_ascii();
        if line.is_empty() || line.starts_with(b"#") {
            continue;
        }
        let Some(eq) = memchr(b'=', line) else {
            exn::bail!(ErrorKind::ParseError {
                field: "pkginfo",
                value: String::from_utf8_lossy(line).into_owned(),
            });
        };
        let (key, value) = (line[..eq].trim_ascii_end(), line[eq + 1..].trim_ascii_start());
        if let Some(field) = Field::from_pkginfo_key(key)? {
            record.set(field, value)?;
        }
        count += 1;
    }
    tracing::Span::current().record("lines", count);
    Ok(())
}
