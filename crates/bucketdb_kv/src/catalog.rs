//! Bucket flags and the bucket catalog.

use std::collections::BTreeMap;
use std::fmt;

/// Longest accepted bucket name in bytes.
pub const MAX_BUCKET_NAME_LEN: usize = 255;

/// Per-bucket flags fixed when the bucket is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BucketFlags {
    /// One key may hold several values, kept sorted.
    pub dup_sort: bool,
    /// Kept for reading old data only; bulk copy skips it.
    pub deprecated: bool,
}

impl BucketFlags {
    /// A plain bucket: one value per key.
    pub const PLAIN: Self = Self {
        dup_sort: false,
        deprecated: false,
    };

    /// A duplicate-sort bucket.
    pub const DUP_SORT: Self = Self {
        dup_sort: true,
        deprecated: false,
    };

    /// Returns these flags with the deprecated marker set.
    #[must_use]
    pub const fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Returns these flags with the deprecated marker cleared.
    #[must_use]
    pub const fn live(mut self) -> Self {
        self.deprecated = false;
        self
    }

    pub(crate) const fn to_byte(self) -> u8 {
        (self.dup_sort as u8) | ((self.deprecated as u8) << 1)
    }

    pub(crate) const fn from_byte(b: u8) -> Option<Self> {
        if b & !0b11 != 0 {
            return None;
        }
        Some(Self {
            dup_sort: b & 0b01 != 0,
            deprecated: b & 0b10 != 0,
        })
    }
}

/// A bucket's catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Bucket flags.
    pub flags: BucketFlags,
}

impl BucketInfo {
    /// Returns whether the bucket stores sorted duplicates.
    #[must_use]
    pub fn is_dup_sort(&self) -> bool {
        self.flags.dup_sort
    }

    /// Returns whether the bucket is deprecated.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.flags.deprecated
    }
}

impl fmt::Display for BucketInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.flags.dup_sort {
            write!(f, " [dupsort]")?;
        }
        if self.flags.deprecated {
            write!(f, " [deprecated]")?;
        }
        Ok(())
    }
}

/// All buckets of a database, enumerated in ascending name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketCatalog {
    buckets: BTreeMap<String, BucketInfo>,
}

impl BucketCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, info: BucketInfo) {
        self.buckets.insert(info.name.clone(), info);
    }

    /// Looks a bucket up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BucketInfo> {
        self.buckets.get(name)
    }

    /// Returns whether the bucket exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &BucketInfo> {
        self.buckets.values()
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl FromIterator<BucketInfo> for BucketCatalog {
    fn from_iter<I: IntoIterator<Item = BucketInfo>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for info in iter {
            catalog.insert(info);
        }
        catalog
    }
}

/// Validates a bucket name for the commit log and the text dump header.
pub(crate) fn validate_bucket_name(name: &str) -> crate::KvResult<()> {
    if name.is_empty() {
        return Err(crate::KvError::invalid_bucket_name("name is empty"));
    }
    if name.len() > MAX_BUCKET_NAME_LEN {
        return Err(crate::KvError::invalid_bucket_name(format!(
            "name is {} bytes, limit is {MAX_BUCKET_NAME_LEN}",
            name.len()
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(crate::KvError::invalid_bucket_name(format!(
            "name {name:?} contains a control character"
        )));
    }
    Ok(())
}
