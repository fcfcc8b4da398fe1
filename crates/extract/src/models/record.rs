use time::OffsetDateTime;

/// Metadata of a single package archive.
///
/// A record starts out empty and is filled field by field through
/// [`set`](Self::set), which enforces that the identity
/// fields (`name` and `version`) are never contradicted once assigned. For
/// that reason they are only readable from outside the crate; everything
/// else is plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackageRecord {
    /// Name of the archive on disk
    pub filename: Option<String>,
    pub(crate) name: Option<String>,
    /// Name of the split-package base, if different from `name`
    pub base: Option<String>,
    pub(crate) version: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub packager: Option<String>,
    /// Target architecture (`x86_64`, `any`, ...)
    pub architecture: Option<String>,
    /// Hex digest, only ever set from a database `desc` entry
    pub sha256: Option<String>,
    /// Detached signature, base64 encoded
    pub signature: Option<String>,
    /// Size of the archive file
    pub compressed_size: u64,
    /// Size of the package once installed
    pub installed_size: u64,
    pub build_time: Option<OffsetDateTime>,
    /// Newest of the archive's and its signature's modification times
    pub file_mtime: Option<OffsetDateTime>,
    /// CRC32 of `name`, a cheap pre-check before comparing names
    pub name_hash: u32,
    pub groups: Vec<String>,
    pub licenses: Vec<String>,
    pub replaces: Vec<String>,
    pub depends: Vec<String>,
    pub conflicts: Vec<String>,
    pub provides: Vec<String>,
    pub optdepends: Vec<String>,
    pub makedepends: Vec<String>,
    pub checkdepends: Vec<String>,
    pub files: Vec<String>,
}

impl PackageRecord {
    /// An empty record for the archive stored under `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Package name, or an empty string while still unassigned.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Full `[epoch:]version[-release]` string, or an empty string while
    /// still unassigned.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or_default()
    }

    /// Whether both identity fields have been assigned.
    pub fn is_identified(&self) -> bool {
        self.name.is_some() && self.version.is_some()
    }

    /// Recompute [`name_hash`](Self::name_hash) from the current name.
    pub(crate) fn rehash(&mut self) {
        self.name_hash = crc32fast::hash(self.name().as_bytes());
    }

    /// Whether `name` is this record's name, checking the hash first.
    pub fn has_name(&self, name: &str) -> bool {
        self.name_hash == crc32fast::hash(name.as_bytes()) && self.name() == name
    }
}
