//! In-memory bucket contents and append rules.

use crate::catalog::{validate_bucket_name, BucketCatalog, BucketFlags, BucketInfo};
use crate::error::{KvError, KvResult};
use crate::log::LogOp;
use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Records of one bucket: key to its ascending values. Plain buckets hold
/// exactly one value per key; no key maps to an empty list.
pub(crate) type Records = BTreeMap<Bytes, Vec<Bytes>>;

#[derive(Debug, Clone)]
pub(crate) struct BucketData {
    pub(crate) info: BucketInfo,
    pub(crate) records: Arc<Records>,
    pub(crate) sequence: u64,
}

impl BucketData {
    fn new(info: BucketInfo) -> Self {
        Self {
            info,
            records: Arc::new(Records::new()),
            sequence: 0,
        }
    }

    fn out_of_order(&self, key: &Bytes) -> KvError {
        KvError::OutOfOrder {
            bucket: self.info.name.clone(),
            key: key.to_vec(),
        }
    }

    /// Appends a new key strictly after the last one.
    pub(crate) fn append(&mut self, key: Bytes, value: Bytes) -> KvResult<()> {
        if let Some((last, _)) = self.records.last_key_value() {
            if key <= *last {
                return Err(self.out_of_order(&key));
            }
        }
        Arc::make_mut(&mut self.records).insert(key, vec![value]);
        Ok(())
    }

    /// Appends a (key, value) pair strictly after the last pair.
    pub(crate) fn append_dup(&mut self, key: Bytes, value: Bytes) -> KvResult<()> {
        if !self.info.flags.dup_sort {
            return Err(KvError::NotDupSort {
                bucket: self.info.name.clone(),
            });
        }

        let extends_last_key = match self.records.last_key_value() {
            None => false,
            Some((last_key, values)) => match key.cmp(last_key) {
                Ordering::Less => return Err(self.out_of_order(&key)),
                Ordering::Greater => false,
                Ordering::Equal => {
                    if values.last().is_some_and(|last| value <= *last) {
                        return Err(self.out_of_order(&key));
                    }
                    true
                }
            },
        };

        let records = Arc::make_mut(&mut self.records);
        match records.get_mut(&key) {
            Some(values) if extends_last_key => values.push(value),
            _ => {
                records.insert(key, vec![value]);
            }
        }
        Ok(())
    }
}

/// The full contents of a database at one commit.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    buckets: BTreeMap<String, BucketData>,
}

impl Snapshot {
    pub(crate) fn catalog(&self) -> BucketCatalog {
        self.buckets.values().map(|b| b.info.clone()).collect()
    }

    pub(crate) fn bucket(&self, name: &str) -> KvResult<&BucketData> {
        self.buckets
            .get(name)
            .ok_or_else(|| KvError::bucket_not_found(name))
    }

    pub(crate) fn bucket_mut(&mut self, name: &str) -> KvResult<&mut BucketData> {
        self.buckets
            .get_mut(name)
            .ok_or_else(|| KvError::bucket_not_found(name))
    }

    pub(crate) fn info(&self, name: &str) -> Option<BucketInfo> {
        self.buckets.get(name).map(|b| b.info.clone())
    }

    /// Creates a bucket. Returns the entry and whether it was newly created.
    pub(crate) fn create_bucket(
        &mut self,
        name: &str,
        flags: BucketFlags,
    ) -> KvResult<(BucketInfo, bool)> {
        validate_bucket_name(name)?;
        if let Some(existing) = self.buckets.get(name) {
            if existing.info.flags != flags {
                return Err(KvError::BucketExists {
                    name: name.to_string(),
                });
            }
            return Ok((existing.info.clone(), false));
        }

        let info = BucketInfo {
            name: name.to_string(),
            flags,
        };
        self.buckets
            .insert(name.to_string(), BucketData::new(info.clone()));
        Ok((info, true))
    }

    /// Applies a replayed log op.
    pub(crate) fn apply(&mut self, op: LogOp) -> KvResult<()> {
        match op {
            LogOp::CreateBucket { name, flags } => {
                self.create_bucket(&name, flags)?;
            }
            LogOp::Append { bucket, key, value } => {
                let data = self.bucket_mut(&bucket)?;
                if data.info.flags.dup_sort {
                    data.append_dup(key, value)?;
                } else {
                    data.append(key, value)?;
                }
            }
            LogOp::SetSequence { bucket, value } => {
                self.bucket_mut(&bucket)?.sequence = value;
            }
        }
        Ok(())
    }
}
