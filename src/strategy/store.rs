//! The queryable store of trained average strategies.
//!
//! Training flushes `(key, actions, strategy, weight)` entries here at every
//! checkpoint; serving reads them back by exact key or, for
//! [`AbstractionKey`] stores, by nearest key within a distance bound. Stores
//! persist as versioned JSON and merge with other shards.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::abstraction::{AbstractionKey, DistanceWeights};
use crate::cfr::game::{GameAction, InfoKey};
use crate::error::{EngineError, Result};
use crate::strategy::Strategy;

/// Strategy file format version written by [`StrategyStore::save`].
pub const STRATEGY_FILE_VERSION: u32 = 1;

/// One stored strategy: the action list it covers, the distribution, and
/// the strategy-sum mass behind it.
#[derive(Debug, Clone)]
pub struct StrategyEntry<A> {
    /// Actions the distribution is indexed by.
    pub actions: Vec<A>,
    /// Average strategy over `actions`.
    pub strategy: Strategy,
    /// Accumulated strategy mass; the averaging weight for shard merges.
    pub weight: f64,
}

/// Map from information-set keys to trained average strategies.
///
/// Written by trainer checkpoints, read-only during play. Point lookups are
/// hash-map reads; the approximate search is provided for abstraction-keyed
/// stores only.
#[derive(Debug, Clone)]
pub struct StrategyStore<K: InfoKey, A: GameAction> {
    entries: FxHashMap<K, StrategyEntry<A>>,
}

impl<K: InfoKey, A: GameAction> Default for StrategyStore<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: InfoKey, A: GameAction> StrategyStore<K, A> {
    /// Create an empty store.
    pub fn new() -> Self {
        StrategyStore {
            entries: FxHashMap::default(),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been flushed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the entry for `key`.
    pub fn put(&mut self, key: K, actions: Vec<A>, strategy: Strategy, weight: f64) -> Result<()> {
        strategy.validate()?;
        if actions.len() != strategy.len() {
            return Err(EngineError::configuration(format!(
                "entry for {} has {} actions but {} probabilities",
                key,
                actions.len(),
                strategy.len()
            )));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(EngineError::configuration(format!(
                "entry for {} has invalid weight {}",
                key, weight
            )));
        }
        self.entries.insert(
            key,
            StrategyEntry {
                actions,
                strategy,
                weight,
            },
        );
        Ok(())
    }

    /// The entry stored under exactly `key`.
    pub fn get_exact(&self, key: &K) -> Option<&StrategyEntry<A>> {
        self.entries.get(key)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &StrategyEntry<A>)> {
        self.entries.iter()
    }

    /// Fold another shard into this store.
    ///
    /// Entries sharing a key and action list combine into a weight-averaged
    /// distribution with summed weight. Entries whose action lists disagree
    /// are resolved in favor of the heavier one. Returns `(combined,
    /// conflicts)` counts.
    pub fn merge(&mut self, other: StrategyStore<K, A>) -> (usize, usize) {
        let mut combined = 0;
        let mut conflicts = 0;

        for (key, incoming) in other.entries {
            match self.entries.get_mut(&key) {
                None => {
                    self.entries.insert(key, incoming);
                    combined += 1;
                }
                Some(existing) if existing.actions == incoming.actions => {
                    let total = existing.weight + incoming.weight;
                    if total > 0.0 {
                        let averaged: Vec<f64> = existing
                            .strategy
                            .probs()
                            .iter()
                            .zip(incoming.strategy.probs())
                            .map(|(&a, &b)| {
                                (existing.weight * a + incoming.weight * b) / total
                            })
                            .collect();
                        // Renormalize away accumulated rounding.
                        if let Ok(strategy) = Strategy::from_weights(&averaged) {
                            existing.strategy = strategy;
                            existing.weight = total;
                        }
                    }
                    combined += 1;
                }
                Some(existing) => {
                    conflicts += 1;
                    if incoming.weight > existing.weight {
                        *existing = incoming;
                    }
                }
            }
        }
        (combined, conflicts)
    }
}

impl<A: GameAction> StrategyStore<AbstractionKey, A> {
    /// Nearest stored entry within `max_distance` of `key`, with its
    /// distance. Exact hits return at distance zero.
    ///
    /// The scan is restricted to streets reachable under the street weight;
    /// with default weights a cross-street match costs more than the usual
    /// bound, so off-street entries are skipped without measuring. Distance
    /// ties resolve by key order so repeated lookups agree.
    pub fn get_approximate(
        &self,
        key: &AbstractionKey,
        max_distance: f64,
        weights: &DistanceWeights,
    ) -> Option<(&StrategyEntry<A>, f64)> {
        let mut best: Option<(&AbstractionKey, &StrategyEntry<A>, f64)> = None;
        for (candidate, entry) in &self.entries {
            if candidate.street != key.street && weights.street > max_distance {
                continue;
            }
            let distance = key.distance(candidate, weights);
            if distance > max_distance {
                continue;
            }
            let better = match &best {
                None => true,
                Some((held, _, held_distance)) => {
                    distance < *held_distance
                        || (distance == *held_distance && candidate < held)
                }
            };
            if better {
                best = Some((candidate, entry, distance));
            }
        }
        best.map(|(_, entry, distance)| (entry, distance))
    }
}

impl<K, A> StrategyStore<K, A>
where
    K: InfoKey + Serialize + DeserializeOwned,
    A: GameAction + Serialize + DeserializeOwned,
{
    /// Write the store as versioned JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = StrategyFile {
            version: STRATEGY_FILE_VERSION,
            entries: self
                .entries
                .iter()
                .map(|(key, entry)| StrategyRecord {
                    key: key.clone(),
                    actions: entry.actions.clone(),
                    probs: entry.strategy.probs().to_vec(),
                    weight: entry.weight,
                })
                .collect(),
        };
        let out = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(out), &file)?;
        info!(
            "saved {} strategies to {}",
            file.entries.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read a store from a strategy file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let input = File::open(path.as_ref())?;
        let file: StrategyFile<K, A> = serde_json::from_reader(BufReader::new(input))?;
        let store = Self::from_file(file)?;
        info!(
            "loaded {} strategies from {}",
            store.len(),
            path.as_ref().display()
        );
        Ok(store)
    }

    /// Build a store from a parsed file, validating the version and every
    /// record. Older versions stay readable; newer ones are rejected.
    pub fn from_file(file: StrategyFile<K, A>) -> Result<Self> {
        if file.version > STRATEGY_FILE_VERSION {
            return Err(EngineError::encoding(format!(
                "strategy file version {} is newer than supported version {}",
                file.version, STRATEGY_FILE_VERSION
            )));
        }
        let mut store = Self::new();
        for record in file.entries {
            let strategy = Strategy::new(record.probs)?;
            store.put(record.key, record.actions, strategy, record.weight)?;
        }
        Ok(store)
    }
}

/// On-disk envelope for a strategy store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyFile<K, A> {
    /// Format version; loaders reject versions newer than they know.
    pub version: u32,
    /// One record per information set.
    pub entries: Vec<StrategyRecord<K, A>>,
}

/// One stored strategy in export form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecord<K, A> {
    /// Information-set key.
    pub key: K,
    /// Action list the probabilities are indexed by.
    pub actions: Vec<A>,
    /// Average strategy probabilities.
    pub probs: Vec<f64>,
    /// Accumulated strategy mass.
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstraction::{BoardTexture, HistoryAbbrev, PositionBucket, SprTier};
    use crate::cards::Street;

    fn key(street: Street, strength: u8) -> AbstractionKey {
        AbstractionKey {
            street,
            strength,
            texture: if street == Street::Preflop {
                BoardTexture::Preflop
            } else {
                BoardTexture::Dry
            },
            position: PositionBucket::Late,
            spr: SprTier::Medium,
            history: HistoryAbbrev::empty(),
        }
    }

    fn entry_probs<A: GameAction>(entry: &StrategyEntry<A>) -> &[f64] {
        entry.strategy.probs()
    }

    #[test]
    fn test_put_and_get_exact() {
        let mut store: StrategyStore<u8, u8> = StrategyStore::new();
        let strategy = Strategy::new(vec![0.25, 0.75]).unwrap();
        store.put(4, vec![0, 1], strategy, 2.0).unwrap();

        assert_eq!(store.len(), 1);
        let entry = store.get_exact(&4).unwrap();
        assert_eq!(entry.actions, vec![0, 1]);
        assert_eq!(entry.weight, 2.0);
        assert!(store.get_exact(&5).is_none());
    }

    #[test]
    fn test_put_validates() {
        let mut store: StrategyStore<u8, u8> = StrategyStore::new();
        let strategy = Strategy::new(vec![0.5, 0.5]).unwrap();

        // Action list and distribution must agree in length.
        let err = store.put(1, vec![0, 1, 2], strategy.clone(), 1.0).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        assert!(store.put(1, vec![0, 1], strategy, -1.0).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_approximate_prefers_nearest() {
        let mut store: StrategyStore<AbstractionKey, u8> = StrategyStore::new();
        let near = Strategy::new(vec![0.9, 0.1]).unwrap();
        let far = Strategy::new(vec![0.1, 0.9]).unwrap();
        store.put(key(Street::Flop, 4), vec![0, 1], near, 1.0).unwrap();
        store.put(key(Street::Flop, 7), vec![0, 1], far, 1.0).unwrap();

        let probe = key(Street::Flop, 3);
        let weights = DistanceWeights::default();

        // Strength gap 1 beats strength gap 4.
        let (entry, distance) = store.get_approximate(&probe, 4.0, &weights).unwrap();
        assert_eq!(entry_probs(entry), &[0.9, 0.1]);
        assert_eq!(distance, 1.0);

        // An exact hit comes back at distance zero.
        let (_, distance) = store
            .get_approximate(&key(Street::Flop, 4), 4.0, &weights)
            .unwrap();
        assert_eq!(distance, 0.0);

        // Nothing within a tiny bound.
        assert!(store.get_approximate(&probe, 0.5, &weights).is_none());
    }

    #[test]
    fn test_approximate_skips_other_streets_by_default() {
        let mut store: StrategyStore<AbstractionKey, u8> = StrategyStore::new();
        let only = Strategy::new(vec![1.0]).unwrap();
        store.put(key(Street::Turn, 3), vec![0], only, 1.0).unwrap();

        let probe = key(Street::Flop, 3);
        let weights = DistanceWeights::default();

        // Default street weight 8 puts cross-street entries out of a
        // distance-4 search entirely.
        assert!(store.get_approximate(&probe, 4.0, &weights).is_none());
        // A caller who raises the bound far enough can still cross.
        assert!(store.get_approximate(&probe, 10.0, &weights).is_some());
    }

    #[test]
    fn test_merge_weight_averages() {
        let mut a: StrategyStore<u8, u8> = StrategyStore::new();
        let mut b: StrategyStore<u8, u8> = StrategyStore::new();
        a.put(1, vec![0, 1], Strategy::new(vec![1.0, 0.0]).unwrap(), 1.0)
            .unwrap();
        b.put(1, vec![0, 1], Strategy::new(vec![0.0, 1.0]).unwrap(), 3.0)
            .unwrap();
        b.put(2, vec![0, 1], Strategy::new(vec![0.5, 0.5]).unwrap(), 1.0)
            .unwrap();

        let (combined, conflicts) = a.merge(b);
        assert_eq!((combined, conflicts), (2, 0));
        assert_eq!(a.len(), 2);

        let entry = a.get_exact(&1).unwrap();
        assert_eq!(entry.weight, 4.0);
        assert!((entry.strategy.prob(0) - 0.25).abs() < 1e-12);
        assert!((entry.strategy.prob(1) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_merge_conflicting_actions_heavier_wins() {
        let mut a: StrategyStore<u8, u8> = StrategyStore::new();
        let mut b: StrategyStore<u8, u8> = StrategyStore::new();
        a.put(1, vec![0, 1], Strategy::uniform(2).unwrap(), 1.0).unwrap();
        b.put(1, vec![5, 6, 7], Strategy::uniform(3).unwrap(), 9.0).unwrap();

        let (combined, conflicts) = a.merge(b);
        assert_eq!((combined, conflicts), (0, 1));
        assert_eq!(a.get_exact(&1).unwrap().actions, vec![5, 6, 7]);

        // Lighter incoming shard loses the same conflict.
        let mut c: StrategyStore<u8, u8> = StrategyStore::new();
        c.put(1, vec![0, 1], Strategy::uniform(2).unwrap(), 0.5).unwrap();
        let (_, conflicts) = a.merge(c);
        assert_eq!(conflicts, 1);
        assert_eq!(a.get_exact(&1).unwrap().actions, vec![5, 6, 7]);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join("gto-engine-strategy-store-test.json");
        let mut store: StrategyStore<AbstractionKey, u8> = StrategyStore::new();
        store
            .put(
                key(Street::River, 6),
                vec![0, 1, 2],
                Strategy::new(vec![0.2, 0.3, 0.5]).unwrap(),
                12.5,
            )
            .unwrap();
        store.save(&path).unwrap();

        let loaded: StrategyStore<AbstractionKey, u8> = StrategyStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let entry = loaded.get_exact(&key(Street::River, 6)).unwrap();
        assert_eq!(entry_probs(entry), &[0.2, 0.3, 0.5]);
        assert_eq!(entry.weight, 12.5);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_future_versions_and_bad_probs() {
        let future: StrategyFile<u8, u8> = StrategyFile {
            version: STRATEGY_FILE_VERSION + 1,
            entries: Vec::new(),
        };
        let err = StrategyStore::from_file(future).unwrap_err();
        assert!(matches!(err, EngineError::Encoding(_)));

        let lopsided: StrategyFile<u8, u8> = StrategyFile {
            version: STRATEGY_FILE_VERSION,
            entries: vec![StrategyRecord {
                key: 1,
                actions: vec![0, 1],
                probs: vec![0.9, 0.4],
                weight: 1.0,
            }],
        };
        assert!(StrategyStore::from_file(lopsided).is_err());
    }
}
