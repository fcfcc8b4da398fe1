//! Package metadata extraction.
//!
//! Everything needed to turn a package archive (`*.pkg.tar*`) or a repository
//! database entry into a [`PackageRecord`]:
//!
//! - [`load_package`] opens the archive, finds its `.PKGINFO` manifest and
//!   parses it ([`parse_pkginfo`]).
//! - [`attach_signature`] folds in an optional `<archive>.sig` sidecar.
//! - [`parse_desc`] reads the `%KEY%` sections of a database entry.
//! - [`vercmp`] orders version strings the way package managers do.
//!
//! All assignments go through [`PackageRecord::set`], keyed by [`Field`].

mod archive;
mod compare;
mod desc;
pub mod error;
mod fields;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod models;
mod pkginfo;
mod signature;

pub use crate::archive::{LoadOptions, load_package};
pub use crate::compare::vercmp;
pub use crate::desc::parse_desc;
pub use crate::fields::Field;
pub use crate::models::PackageRecord;
pub use crate::pkginfo::parse_pkginfo;
pub use crate::signature::attach_signature;
