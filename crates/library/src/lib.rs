//! Pool scanning for package repositories.
//!
//! A [`Pool`] is a directory of package archives. [`scan()`] loads every
//! candidate archive in it, applies the target and architecture
//! [filters](filter), and collects the newest build of each package into a
//! [`PackageCache`](pacstage_cache::PackageCache). [`load_database`] reads an
//! existing repository database into the same kind of cache.

pub mod catalog;
pub mod error;
pub mod filter;
mod pool;
pub mod scan;

pub use crate::catalog::load_database;
pub use crate::filter::{Target, read_targets};
pub use crate::pool::{Pool, SymlinkPolicy};
pub use crate::scan::{ScanOptions, ScanSummary, scan, scan_with_summary};
