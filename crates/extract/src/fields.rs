//! Metadata field dispatch.
//!
//! Both `.PKGINFO` manifests and database `desc` entries boil down to a
//! sequence of `(key, value)` pairs. Each key maps to a [`Field`], and each
//! field to one of a handful of storage slots that decide what assigning a
//! value means: overwrite, append, parse a number, or verify identity.

use crate::error::{ErrorKind, Result};
use crate::models::PackageRecord;
use exn::ResultExt;
use std::borrow::Cow;
use time::OffsetDateTime;

/// An assignable attribute of a [`PackageRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Filename,
    Name,
    Base,
    Version,
    Description,
    Url,
    Packager,
    Architecture,
    Sha256,
    Signature,
    CompressedSize,
    InstalledSize,
    BuildTime,
    Groups,
    Licenses,
    Replaces,
    Depends,
    Conflicts,
    Provides,
    OptDepends,
    MakeDepends,
    CheckDepends,
    Files,
}

/// Where a field's value lands, and how.
enum Slot<'a> {
    /// Last write wins.
    Text(&'a mut Option<String>),
    /// First write wins; later writes must agree.
    Identity(&'a mut Option<String>),
    /// Appended in encounter order, duplicates kept.
    List(&'a mut Vec<String>),
    /// Non-negative decimal byte count.
    Size(&'a mut u64),
    /// Non-negative decimal Unix timestamp that fits an `i32`.
    Time(&'a mut Option<OffsetDateTime>),
}

impl Field {
    /// Short name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Filename => "filename",
            Field::Name => "name",
            Field::Base => "base",
            Field::Version => "version",
            Field::Description => "description",
            Field::Url => "url",
            Field::Packager => "packager",
            Field::Architecture => "architecture",
            Field::Sha256 => "sha256",
            Field::Signature => "signature",
            Field::CompressedSize => "compressed_size",
            Field::InstalledSize => "installed_size",
            Field::BuildTime => "build_time",
            Field::Groups => "groups",
            Field::Licenses => "licenses",
            Field::Replaces => "replaces",
            Field::Depends => "depends",
            Field::Conflicts => "conflicts",
            Field::Provides => "provides",
            Field::OptDepends => "optdepends",
            Field::MakeDepends => "makedepends",
            Field::CheckDepends => "checkdepends",
            Field::Files => "files",
        }
    }

    /// Look up a `.PKGINFO` key.
    ///
    /// Returns `Ok(None)` for keys makepkg writes that a record has no place
    /// for, and an [`ErrorKind::UnknownKey`] for anything else unrecognized.
    pub fn from_pkginfo_key(key: &[u8]) -> Result<Option<Field>> {
        Ok(Some(match key {
            b"pkgname" => Field::Name,
            b"pkgbase" => Field::Base,
            b"pkgver" => Field::Version,
            b"pkgdesc" => Field::Description,
            b"url" => Field::Url,
            b"builddate" => Field::BuildTime,
            b"packager" => Field::Packager,
            b"size" => Field::InstalledSize,
            b"arch" => Field::Architecture,
            b"license" => Field::Licenses,
            b"group" => Field::Groups,
            b"replaces" => Field::Replaces,
            b"depend" => Field::Depends,
            b"conflict" => Field::Conflicts,
            b"provides" => Field::Provides,
            b"optdepend" => Field::OptDepends,
            b"makedepend" => Field::MakeDepends,
            b"checkdepend" => Field::CheckDepends,
            b"backup" | b"makepkgopt" | b"xdata" => return Ok(None),
            _ => exn::bail!(ErrorKind::UnknownKey(String::from_utf8_lossy(key).into_owned())),
        }))
    }

    /// Look up a database `desc` section header, without its `%` delimiters.
    ///
    /// Same contract as [`from_pkginfo_key`](Self::from_pkginfo_key).
    pub fn from_desc_key(key: &[u8]) -> Result<Option<Field>> {
        Ok(Some(match key {
            b"FILENAME" => Field::Filename,
            b"NAME" => Field::Name,
            b"BASE" => Field::Base,
            b"VERSION" => Field::Version,
            b"DESC" => Field::Description,
            b"GROUPS" => Field::Groups,
            b"CSIZE" => Field::CompressedSize,
            b"ISIZE" => Field::InstalledSize,
            b"SHA256SUM" => Field::Sha256,
            b"PGPSIG" => Field::Signature,
            b"URL" => Field::Url,
            b"LICENSE" => Field::Licenses,
            b"ARCH" => Field::Architecture,
            b"BUILDDATE" => Field::BuildTime,
            b"PACKAGER" => Field::Packager,
            b"REPLACES" => Field::Replaces,
            b"DEPENDS" => Field::Depends,
            b"CONFLICTS" => Field::Conflicts,
            b"PROVIDES" => Field::Provides,
            b"OPTDEPENDS" => Field::OptDepends,
            b"MAKEDEPENDS" => Field::MakeDepends,
            b"CHECKDEPENDS" => Field::CheckDepends,
            b"FILES" => Field::Files,
            b"MD5SUM" => return Ok(None),
            _ => exn::bail!(ErrorKind::UnknownKey(String::from_utf8_lossy(key).into_owned())),
        }))
    }
}

impl PackageRecord {
    fn slot(&mut self, field: Field) -> Slot<'_> {
        match field {
            Field::Filename => Slot::Text(&mut self.filename),
            Field::Name => Slot::Identity(&mut self.name),
            Field::Base => Slot::Text(&mut self.base),
            Field::Version => Slot::Identity(&mut self.version),
            Field::Description => Slot::Text(&mut self.description),
            Field::Url => Slot::Text(&mut self.url),
            Field::Packager => Slot::Text(&mut self.packager),
            Field::Architecture => Slot::Text(&mut self.architecture),
            Field::Sha256 => Slot::Text(&mut self.sha256),
            Field::Signature => Slot::Text(&mut self.signature),
            Field::CompressedSize => Slot::Size(&mut self.compressed_size),
            Field::InstalledSize => Slot::Size(&mut self.installed_size),
            Field::BuildTime => Slot::Time(&mut self.build_time),
            Field::Groups => Slot::List(&mut self.groups),
            Field::Licenses => Slot::List(&mut self.licenses),
            Field::Replaces => Slot::List(&mut self.replaces),
            Field::Depends => Slot::List(&mut self.depends),
            Field::Conflicts => Slot::List(&mut self.conflicts),
            Field::Provides => Slot::List(&mut self.provides),
            Field::OptDepends => Slot::List(&mut self.optdepends),
            Field::MakeDepends => Slot::List(&mut self.makedepends),
            Field::CheckDepends => Slot::List(&mut self.checkdepends),
            Field::Files => Slot::List(&mut self.files),
        }
    }

    /// Assign a raw value to `field`.
    ///
    /// Values are raw bytes; invalid UTF-8 is replaced with U+FFFD, except in
    /// `name` and `version`, which must be valid UTF-8.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::IdentityMismatch`] when `name` or `version` is already
    ///   set to something else.
    /// - [`ErrorKind::ParseError`] when a size or timestamp is not a plain
    ///   decimal number in range, or `name` or `version` is not valid UTF-8.
    pub fn set(&mut self, field: Field, value: &[u8]) -> Result<()> {
        match self.slot(field) {
            Slot::Text(slot) => *slot = Some(text(value).into_owned()),
            Slot::Identity(slot) => {
                let Ok(value) = std::str::from_utf8(value) else {
                    exn::bail!(ErrorKind::ParseError {
                        field: field.as_str(),
                        value: text(value).into_owned(),
                    });
                };
                match slot.as_deref() {
                    None => *slot = Some(value.to_string()),
                    Some(existing) if existing == value => {},
                    Some(existing) => exn::bail!(ErrorKind::IdentityMismatch {
                        field: field.as_str(),
                        existing: existing.to_string(),
                        found: value.to_string(),
                    }),
                }
            },
            Slot::List(list) => list.push(text(value).into_owned()),
            Slot::Size(size) => *size = parse_decimal(field, value)?,
            Slot::Time(time) => {
                let raise = || ErrorKind::ParseError {
                    field: field.as_str(),
                    value: text(value).into_owned(),
                };
                let seconds = parse_decimal(field, value)?;
                if seconds > i32::MAX as u64 {
                    exn::bail!(raise());
                }
                *time = Some(OffsetDateTime::from_unix_timestamp(seconds as i64).or_raise(raise)?);
            },
        }
        if field == Field::Name {
            self.rehash();
        }
        Ok(())
    }
}

fn text(value: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(value)
}

/// Whole-string base-10 parse. Signs, whitespace and empty input are all
/// rejected, which [`str::parse`] alone would not do for a leading `+`.
fn parse_decimal(field: Field, value: &[u8]) -> Result<u64> {
    let raise = || ErrorKind::ParseError {
        field: field.as_str(),
        value: text(value).into_owned(),
    };
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        exn::bail!(raise());
    }
    // Digits only, so this is valid UTF-8; overflow is the only failure left.
    text(value).parse::<u64>().or_raise(raise)
}
