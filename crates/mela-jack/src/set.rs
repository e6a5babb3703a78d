//! Keyed collections of jackknife bins with their means.

use std::collections::BTreeMap;

use mela_core::errors::MelaError;

use crate::bins::Bins;
use crate::jackknife::{estimate, JackknifeMean};
use crate::value::Sample;

/// Bins and jackknife means for every key of one analysis stage.
///
/// The mean of a key is computed once, when its bins are inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct JackknifeSet<K: Ord, T> {
    bins: BTreeMap<K, Bins<T>>,
    mean: BTreeMap<K, JackknifeMean<T>>,
}

impl<K: Ord, T> Default for JackknifeSet<K, T> {
    fn default() -> Self {
        Self {
            bins: BTreeMap::new(),
            mean: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, T: Sample> JackknifeSet<K, T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bins` under `key` together with their jackknife mean.
    pub fn insert(&mut self, key: K, bins: Bins<T>) -> Result<(), MelaError> {
        let mean = estimate(&bins, bins.nbins(), bins.width())?;
        self.mean.insert(key.clone(), mean);
        self.bins.insert(key, bins);
        Ok(())
    }

    /// Bins stored under `key`.
    pub fn bins(&self, key: &K) -> Option<&Bins<T>> {
        self.bins.get(key)
    }

    /// Jackknife mean stored under `key`.
    pub fn mean(&self, key: &K) -> Option<&JackknifeMean<T>> {
        self.mean.get(key)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.bins.keys()
    }

    /// `(key, bins, mean)` triples in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Bins<T>, &JackknifeMean<T>)> {
        self.bins
            .iter()
            .filter_map(|(k, b)| self.mean.get(k).map(|m| (k, b, m)))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when no key is stored.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// True when `key` is stored.
    pub fn contains(&self, key: &K) -> bool {
        self.bins.contains_key(key)
    }

    /// Applies `f` to every bin array, recomputing the means.
    pub fn map_bins<U: Sample>(
        &self,
        f: impl Fn(&Bins<T>) -> Bins<U>,
    ) -> Result<JackknifeSet<K, U>, MelaError> {
        let mut out = JackknifeSet::new();
        for (key, bins) in &self.bins {
            out.insert(key.clone(), f(bins))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_computes_mean() {
        let mut set = JackknifeSet::new();
        set.insert("a", Bins::from_scalars(vec![1.0, 3.0])).unwrap();
        let (mean, _) = set.mean(&"a").unwrap().scalar().unwrap();
        assert_eq!(mean, 2.0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn map_bins_recomputes_means() {
        let mut set = JackknifeSet::new();
        set.insert(1u32, Bins::from_scalars(vec![1.0, 3.0])).unwrap();
        let doubled = set.map_bins(|b| b.map(|v| 2.0 * v)).unwrap();
        assert_eq!(doubled.mean(&1).unwrap().mean, vec![4.0]);
    }
}
