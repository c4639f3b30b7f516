use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Per-unit tally of composite keys (`url,date`) as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialCountMap {
    counts: FxHashMap<Vec<u8>, u64>,
}

impl PartialCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key`.
    #[inline]
    pub fn record(&mut self, key: &[u8]) {
        self.add(key, 1);
    }

    #[inline]
    pub fn add(&mut self, key: &[u8], count: u64) {
        match self.counts.get_mut(key) {
            Some(existing) => *existing += count,
            None => {
                self.counts.insert(key.to_vec(), count);
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Fold `other` into `self`.
    pub fn absorb(&mut self, other: PartialCountMap) {
        if self.counts.len() < other.counts.len() {
            let mine = std::mem::replace(&mut self.counts, other.counts);
            for (key, count) in mine {
                *self.counts.entry(key).or_insert(0) += count;
            }
        } else {
            for (key, count) in other.counts {
                *self.counts.entry(key).or_insert(0) += count;
            }
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of records tallied.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.counts.iter().map(|(k, v)| (k.as_slice(), *v))
    }
}

impl IntoIterator for PartialCountMap {
    type Item = (Vec<u8>, u64);
    type IntoIter = std::collections::hash_map::IntoIter<Vec<u8>, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

/// URL -> (date -> count). Both levels iterate in ascending order, so
/// serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AggregateCountMap {
    urls: BTreeMap<String, BTreeMap<String, u64>>,
}

impl AggregateCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, url: &str, date: &str, count: u64) {
        let dates = match self.urls.get_mut(url) {
            Some(dates) => dates,
            None => self.urls.entry(url.to_owned()).or_default(),
        };
        match dates.get_mut(date) {
            Some(existing) => *existing += count,
            None => {
                dates.insert(date.to_owned(), count);
            }
        }
    }

    pub fn get(&self, url: &str, date: &str) -> Option<u64> {
        self.urls.get(url)?.get(date).copied()
    }

    pub fn dates(&self, url: &str) -> Option<&BTreeMap<String, u64>> {
        self.urls.get(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.urls.values().flat_map(|dates| dates.values()).sum()
    }
}
