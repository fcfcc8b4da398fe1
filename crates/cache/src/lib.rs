//! In-memory package cache.
//!
//! A [`PackageCache`] holds at most one [`PackageRecord`] per package name.
//! Offering a record for a name that is already present keeps whichever of
//! the two has the higher version, so after a scan every name maps to the
//! newest build seen. The cache only lives for the duration of one scan; the
//! archives on disk are the source of truth.

mod store;

pub use crate::store::{Absorbed, PackageCache, Slot};
pub use pacstage_extract::PackageRecord;
