use pacstage_extract::{PackageRecord, vercmp};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::instrument;

/// Position of a record inside a [`PackageCache`].
///
/// Only meaningful for the cache that handed it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(usize);

/// What [`PackageCache::insert_or_replace`] did with the offered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absorbed {
    /// First record seen for this name.
    Inserted,
    /// The offered record was at least as new, and took the slot over.
    Replaced {
        /// Version of the record that was dropped.
        previous: String,
    },
    /// The record already cached is newer; the offered one was dropped.
    Rejected {
        /// Version of the record that stays.
        kept: String,
    },
}

/// Name-keyed package store that keeps the highest version of each name.
///
/// Iteration order is the order in which names were first inserted; a
/// replacement takes over its predecessor's position.
#[derive(Debug, Clone, Default)]
pub struct PackageCache {
    records: Vec<PackageRecord>,
    index: HashMap<String, usize>,
}

impl PackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for `capacity` packages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Locate the slot holding `name`.
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.index.get(name).map(|&position| Slot(position))
    }

    pub fn find(&self, name: &str) -> Option<&PackageRecord> {
        self.lookup(name).and_then(|slot| self.get(slot))
    }

    pub fn get(&self, slot: Slot) -> Option<&PackageRecord> {
        self.records.get(slot.0)
    }

    /// Mutable access to a cached record.
    ///
    /// Identity fields stay protected by [`PackageRecord::set`], so the name
    /// a record is indexed under cannot drift.
    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut PackageRecord> {
        self.records.get_mut(slot.0)
    }

    /// Put `record` into `slot`, returning the record it supersedes.
    ///
    /// # Errors
    ///
    /// Hands `record` back untouched if `slot` is not occupied in this cache,
    /// or if it holds a package of a different name.
    pub fn replace(&mut self, slot: Slot, record: PackageRecord) -> Result<PackageRecord, PackageRecord> {
        match self.records.get_mut(slot.0) {
            Some(current) if record.has_name(current.name()) => Ok(std::mem::replace(current, record)),
            _ => Err(record),
        }
    }

    /// Absorb `record`, keeping whichever version of its name is highest.
    ///
    /// On a version tie the offered record wins, so with several archives of
    /// the same version the last one processed is kept.
    #[instrument(level = "debug", skip_all, fields(name = record.name(), version = record.version()))]
    pub fn insert_or_replace(&mut self, record: PackageRecord) -> Absorbed {
        let Some(slot) = self.lookup(record.name()) else {
            self.index.insert(record.name().to_string(), self.records.len());
            self.records.push(record);
            return Absorbed::Inserted;
        };
        let current = &self.records[slot.0];
        match vercmp(record.version(), current.version()) {
            Ordering::Less => {
                tracing::debug!(kept = current.version(), "cached version is newer, dropping offered record");
                Absorbed::Rejected {
                    kept: current.version().to_string(),
                }
            },
            Ordering::Equal | Ordering::Greater => {
                let previous = std::mem::replace(&mut self.records[slot.0], record);
                tracing::debug!(previous = previous.version(), "replaced cached record");
                Absorbed::Replaced {
                    previous: previous.version().to_string(),
                }
            },
        }
    }

    /// Records in first-insertion order of their names.
    pub fn iter(&self) -> std::slice::Iter<'_, PackageRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a PackageCache {
    type Item = &'a PackageRecord;
    type IntoIter = std::slice::Iter<'a, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for PackageCache {
    type Item = PackageRecord;
    type IntoIter = std::vec::IntoIter<PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
