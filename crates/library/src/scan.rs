//! Pool scanning.

use crate::error::{ErrorKind, Result};
use crate::filter::{Target, matches_arch, matches_targets};
use crate::pool::{Pool, SymlinkPolicy};
use exn::ResultExt;
use pacstage_cache::{Absorbed, PackageCache};
use pacstage_extract::{LoadOptions, PackageRecord, attach_signature, load_package};
use tracing::instrument;

/// What to scan for.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Only keep packages selected by at least one target. Empty keeps all.
    pub targets: Vec<Target>,
    /// Only keep packages installable on this architecture.
    pub arch: Option<String>,
    pub symlinks: SymlinkPolicy,
    pub load: LoadOptions,
}

/// Tally of what happened to each candidate during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub candidates: usize,
    /// Unreadable archives, or archives without a usable manifest.
    pub skipped: usize,
    /// Loaded, but excluded by the target or architecture filter.
    pub filtered: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub rejected: usize,
}

/// Build a cache of the newest package of each name found in `pool`.
///
/// Archives that cannot be read or carry no usable manifest are logged and
/// skipped. Filters are applied before a record reaches the cache, so a
/// filtered-out package can never displace one that passes.
///
/// # Errors
///
/// Any failure that is not confined to a single unreadable archive stops
/// the scan: an archive that cannot be opened, a manifest that contradicts
/// itself or holds an unparseable value, or an unreadable signature.
pub fn scan(pool: &Pool, options: &ScanOptions) -> Result<PackageCache> {
    scan_with_summary(pool, options).map(|(cache, _)| cache)
}

/// [`scan`], also returning the per-candidate tally.
#[instrument(skip_all, fields(pool = %pool.path().display(), candidates))]
pub fn scan_with_summary(pool: &Pool, options: &ScanOptions) -> Result<(PackageCache, ScanSummary)> {
    let mut summary = ScanSummary {
        candidates: pool.candidates(options.symlinks).count(),
        ..Default::default()
    };
    tracing::Span::current().record("candidates", summary.candidates);
    let mut cache = PackageCache::with_capacity(summary.candidates);

    for filename in pool.candidates(options.symlinks) {
        let Some(record) = load(pool, filename, options.load)? else {
            summary.skipped += 1;
            continue;
        };
        if !matches_targets(&options.targets, &record) {
            tracing::trace!(filename, "not a requested target");
            summary.filtered += 1;
            continue;
        }
        if let Some(arch) = options.arch.as_deref()
            && !matches_arch(&record, arch)
        {
            tracing::trace!(filename, arch = record.architecture.as_deref(), "architecture mismatch");
            summary.filtered += 1;
            continue;
        }
        match cache.insert_or_replace(record) {
            Absorbed::Inserted => summary.inserted += 1,
            Absorbed::Replaced { .. } => summary.replaced += 1,
            Absorbed::Rejected { .. } => summary.rejected += 1,
        }
    }

    tracing::info!(
        packages = cache.len(),
        skipped = summary.skipped,
        filtered = summary.filtered,
        superseded = summary.replaced + summary.rejected,
        "scan complete"
    );
    Ok((cache, summary))
}

/// Load one candidate, or `None` if it should be skipped.
fn load(pool: &Pool, filename: &str, options: LoadOptions) -> Result<Option<PackageRecord>> {
    let raise = || ErrorKind::Package(filename.to_string());
    let file = pool.open_file(filename)?;
    let mut record = match load_package(file, filename, options) {
        Ok(record) => record,
        Err(err) if err.is_recoverable() => {
            tracing::warn!(filename, error = ?err, "skipping package");
            return Ok(None);
        },
        Err(err) => return Err(err).or_raise(raise),
    };
    attach_signature(&mut record, pool.path()).or_raise(raise)?;
    Ok(Some(record))
}
