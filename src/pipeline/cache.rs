//! Content-addressed cache for pipeline results.
//!
//! The pipeline itself is a pure function of the two input buffers, so the
//! result can be keyed by the exact byte content. The cache belongs to the
//! boundary layer; the core never sees it.

use log::debug;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use score_consolidation::ReducedRecord;

use crate::pipeline::PipelineResult;

struct CacheEntry {
    inserted: Instant,
    records: Vec<ReducedRecord>,
}

pub struct ResultCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl ResultCache {
    pub fn with_ttl(ttl: Duration) -> ResultCache {
        ResultCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn key(master: &[u8], contract: Option<&[u8]>) -> String {
        let mut key = sha256::digest(master);
        key.push(':');
        if let Some(bytes) = contract {
            key.push_str(&sha256::digest(bytes));
        }
        key
    }

    /// Returns the cached result for byte-identical inputs, or runs `compute`
    /// and stores its result. Errors are never cached.
    pub fn get_or_compute<F>(
        &mut self,
        master: &[u8],
        contract: Option<&[u8]>,
        compute: F,
    ) -> PipelineResult<Vec<ReducedRecord>>
    where
        F: FnOnce(&[u8], Option<&[u8]>) -> PipelineResult<Vec<ReducedRecord>>,
    {
        self.evict_expired();
        let key = Self::key(master, contract);
        if let Some(entry) = self.entries.get(&key) {
            debug!("get_or_compute: cache hit for {}", key);
            return Ok(entry.records.clone());
        }
        debug!("get_or_compute: cache miss for {}", key);
        let records = compute(master, contract)?;
        self.entries.insert(
            key,
            CacheEntry {
                inserted: Instant::now(),
                records: records.clone(),
            },
        );
        Ok(records)
    }

    fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.inserted.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_short_circuit() {
        let mut cache = ResultCache::with_ttl(Duration::from_secs(60));
        let mut calls = 0;

        let r1 = cache
            .get_or_compute(b"master", Some(b"contract"), |_, _| {
                calls += 1;
                Ok(vec![])
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(r1, vec![]);

        let r2 = cache
            .get_or_compute(b"master", Some(b"contract"), |_, _| {
                calls += 1;
                Ok(vec![])
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(r2, vec![]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_inputs_are_distinct_entries() {
        let mut cache = ResultCache::with_ttl(Duration::from_secs(60));
        cache
            .get_or_compute(b"master", None, |_, _| Ok(vec![]))
            .unwrap();
        cache
            .get_or_compute(b"master", Some(b"contract"), |_, _| Ok(vec![]))
            .unwrap();
        cache
            .get_or_compute(b"other", None, |_, _| Ok(vec![]))
            .unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn expired_entries_are_recomputed() {
        let mut cache = ResultCache::with_ttl(Duration::from_secs(0));
        let mut calls = 0;
        cache
            .get_or_compute(b"master", None, |_, _| {
                calls += 1;
                Ok(vec![])
            })
            .unwrap();
        cache
            .get_or_compute(b"master", None, |_, _| {
                calls += 1;
                Ok(vec![])
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = ResultCache::with_ttl(Duration::from_secs(60));
        let res = cache.get_or_compute(b"master", None, |_, _| {
            crate::pipeline::MissingSheetSnafu { sheet: "RSU" }.fail()
        });
        assert!(res.is_err());
        assert!(cache.is_empty());
    }
}
