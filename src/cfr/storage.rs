//! Storage for CFR regret and strategy accumulators.
//!
//! One [`InfoNode`] per information set carries the action list and the two
//! accumulator vectors. The store wraps the node map in an `RwLock` so
//! traversals can read strategies concurrently while updates take the write
//! lock; parallel workers accumulate into private stores and merge.

use std::sync::RwLock;

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cfr::game::{GameAction, InfoKey};
use crate::error::{EngineError, Result};
use crate::strategy::Strategy;

/// Accumulators for one information set.
///
/// Both vectors are indexed by the node's action list and only ever grow by
/// accumulation; regret matching and averaging normalize at read time.
#[derive(Debug, Clone)]
pub struct InfoNode<A> {
    actions: Vec<A>,
    regret_sum: Vec<f64>,
    strategy_sum: Vec<f64>,
}

impl<A: GameAction> InfoNode<A> {
    fn new(actions: Vec<A>) -> Self {
        let n = actions.len();
        InfoNode {
            actions,
            regret_sum: vec![0.0; n],
            strategy_sum: vec![0.0; n],
        }
    }

    /// The action list this node accumulates over.
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// Cumulative counterfactual regrets per action.
    pub fn regret_sum(&self) -> &[f64] {
        &self.regret_sum
    }

    /// Cumulative reach-weighted strategy mass per action.
    pub fn strategy_sum(&self) -> &[f64] {
        &self.strategy_sum
    }

    /// Current strategy by regret matching over positive regrets.
    pub fn current_strategy(&self) -> Result<Strategy> {
        Strategy::from_weights(&self.regret_sum)
    }

    /// Average strategy, the quantity that converges toward equilibrium.
    pub fn average_strategy(&self) -> Result<Strategy> {
        Strategy::from_weights(&self.strategy_sum)
    }

    /// Total accumulated strategy mass; the flush weight of this node.
    pub fn weight(&self) -> f64 {
        self.strategy_sum.iter().sum()
    }
}

/// Thread-safe map from information-set keys to accumulator nodes.
#[derive(Debug)]
pub struct RegretStore<K: InfoKey, A: GameAction> {
    nodes: RwLock<FxHashMap<K, InfoNode<A>>>,
}

impl<K: InfoKey, A: GameAction> Default for RegretStore<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: InfoKey, A: GameAction> RegretStore<K, A> {
    /// Create an empty store.
    pub fn new() -> Self {
        RegretStore {
            nodes: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create a store pre-sized for roughly `capacity` information sets.
    pub fn with_capacity(capacity: usize) -> Self {
        RegretStore {
            nodes: RwLock::new(FxHashMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            )),
        }
    }

    /// Number of information sets stored.
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    /// True when no information set has been visited.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `key` has a node.
    pub fn contains(&self, key: &K) -> bool {
        self.nodes.read().unwrap().contains_key(key)
    }

    /// Snapshot one node, for inspection.
    pub fn node(&self, key: &K) -> Option<InfoNode<A>> {
        self.nodes.read().unwrap().get(key).cloned()
    }

    /// Current strategy for `key` by regret matching. Unvisited keys play
    /// uniform over `num_actions`. A visited key whose stored action count
    /// differs from `num_actions` is an abstraction collision; the caller
    /// treats it as transient and skips the traversal.
    pub fn strategy(&self, key: &K, num_actions: usize) -> Result<Strategy> {
        let nodes = self.nodes.read().unwrap();
        match nodes.get(key) {
            Some(node) => {
                if node.actions.len() != num_actions {
                    return Err(EngineError::unabstractable(format!(
                        "info set {} stores {} actions but the state offers {}",
                        key,
                        node.actions.len(),
                        num_actions
                    )));
                }
                node.current_strategy()
            }
            None => Strategy::uniform(num_actions),
        }
    }

    /// Accumulate one visit: regrets weighted by the opponents' reach,
    /// strategy mass weighted by the actor's own reach.
    ///
    /// `utilities[i]` is the counterfactual value of taking `actions[i]`; the
    /// node value is the expectation under `strategy`, and each action's
    /// regret is its utility above that expectation.
    pub fn update(
        &self,
        key: &K,
        actions: &[A],
        utilities: &[f64],
        strategy: &Strategy,
        opponent_reach: f64,
        own_reach: f64,
    ) -> Result<()> {
        if utilities.len() != actions.len() || strategy.len() != actions.len() {
            return Err(EngineError::configuration(format!(
                "update for {} got {} utilities and {} probabilities for {} actions",
                key,
                utilities.len(),
                strategy.len(),
                actions.len()
            )));
        }

        let mut nodes = self.nodes.write().unwrap();
        let node = nodes
            .entry(key.clone())
            .or_insert_with(|| InfoNode::new(actions.to_vec()));
        if node.actions.as_slice() != actions {
            return Err(EngineError::unabstractable(format!(
                "info set {} maps states with differing action sets",
                key
            )));
        }

        let node_value: f64 = strategy
            .probs()
            .iter()
            .zip(utilities)
            .map(|(&p, &u)| p * u)
            .sum();
        for i in 0..actions.len() {
            node.regret_sum[i] += opponent_reach * (utilities[i] - node_value);
            node.strategy_sum[i] += own_reach * strategy.prob(i);
        }
        Ok(())
    }

    /// Average strategy for `key`, if visited.
    pub fn average_strategy(&self, key: &K) -> Option<Result<Strategy>> {
        let nodes = self.nodes.read().unwrap();
        nodes.get(key).map(|node| node.average_strategy())
    }

    /// Every visited information set with positive strategy mass, paired
    /// with its action list, average strategy, and flush weight.
    pub fn average_strategies(&self) -> Result<Vec<(K, Vec<A>, Strategy, f64)>> {
        let nodes = self.nodes.read().unwrap();
        let mut out = Vec::with_capacity(nodes.len());
        for (key, node) in nodes.iter() {
            let weight = node.weight();
            if weight <= 0.0 {
                continue;
            }
            out.push((
                key.clone(),
                node.actions.clone(),
                node.average_strategy()?,
                weight,
            ));
        }
        Ok(out)
    }

    /// Fold a worker-local store into this one, adding accumulators
    /// elementwise. Keys whose action lists disagree are dropped with a
    /// warning. Returns `(merged, dropped)` node counts.
    pub fn merge(&self, other: RegretStore<K, A>) -> (usize, usize) {
        let incoming = other.nodes.into_inner().unwrap();
        let mut nodes = self.nodes.write().unwrap();
        let mut merged = 0;
        let mut dropped = 0;

        for (key, delta) in incoming {
            match nodes.get_mut(&key) {
                Some(node) => {
                    if node.actions != delta.actions {
                        warn!("dropping merge delta for {}: action sets differ", key);
                        dropped += 1;
                        continue;
                    }
                    for i in 0..node.regret_sum.len() {
                        node.regret_sum[i] += delta.regret_sum[i];
                        node.strategy_sum[i] += delta.strategy_sum[i];
                    }
                    merged += 1;
                }
                None => {
                    nodes.insert(key, delta);
                    merged += 1;
                }
            }
        }
        (merged, dropped)
    }

    /// Serializable snapshot of every node.
    pub fn export(&self) -> StoreExport<K, A> {
        let nodes = self.nodes.read().unwrap();
        let records = nodes
            .iter()
            .map(|(key, node)| StoreRecord {
                key: key.clone(),
                actions: node.actions.clone(),
                regret_sum: node.regret_sum.clone(),
                strategy_sum: node.strategy_sum.clone(),
            })
            .collect();
        StoreExport { records }
    }

    /// Replace this store's contents from an export, validating vector
    /// lengths per record.
    pub fn import(&self, data: StoreExport<K, A>) -> Result<()> {
        let mut incoming = FxHashMap::default();
        for record in data.records {
            let n = record.actions.len();
            if record.regret_sum.len() != n || record.strategy_sum.len() != n {
                return Err(EngineError::configuration(format!(
                    "store record {} has mismatched accumulator lengths",
                    record.key
                )));
            }
            incoming.insert(
                record.key,
                InfoNode {
                    actions: record.actions,
                    regret_sum: record.regret_sum,
                    strategy_sum: record.strategy_sum,
                },
            );
        }
        *self.nodes.write().unwrap() = incoming;
        Ok(())
    }
}

impl<K: InfoKey, A: GameAction> Clone for RegretStore<K, A> {
    fn clone(&self) -> Self {
        RegretStore {
            nodes: RwLock::new(self.nodes.read().unwrap().clone()),
        }
    }
}

/// Serializable store snapshot, the payload of trainer checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreExport<K, A> {
    /// One record per information set.
    pub records: Vec<StoreRecord<K, A>>,
}

/// One information set's accumulators in export form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord<K, A> {
    /// Information-set key.
    pub key: K,
    /// Action list the accumulators are indexed by.
    pub actions: Vec<A>,
    /// Cumulative regrets.
    pub regret_sum: Vec<f64>,
    /// Cumulative strategy mass.
    pub strategy_sum: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RegretStore<u8, u8> {
        RegretStore::new()
    }

    #[test]
    fn test_unvisited_key_plays_uniform() {
        let s = store();
        let strat = s.strategy(&0, 3).unwrap();
        assert_eq!(strat.probs(), &[1.0 / 3.0; 3]);
        assert!(s.is_empty());
    }

    #[test]
    fn test_update_accumulates_regret_matching() {
        let s = store();
        let actions = [0u8, 1u8];
        let uniform = Strategy::uniform(2).unwrap();

        // Action 0 worth 1.0, action 1 worth -1.0 under uniform play:
        // node value 0, regrets +1 / -1.
        s.update(&7, &actions, &[1.0, -1.0], &uniform, 1.0, 1.0).unwrap();

        let node = s.node(&7).unwrap();
        assert_eq!(node.regret_sum(), &[1.0, -1.0]);
        assert_eq!(node.strategy_sum(), &[0.5, 0.5]);

        // Regret matching now plays action 0 exclusively.
        let strat = s.strategy(&7, 2).unwrap();
        assert_eq!(strat.probs(), &[1.0, 0.0]);
    }

    #[test]
    fn test_reach_weights_scale_accumulation() {
        let s = store();
        let actions = [0u8, 1u8];
        let uniform = Strategy::uniform(2).unwrap();

        s.update(&1, &actions, &[2.0, 0.0], &uniform, 0.5, 0.25).unwrap();

        let node = s.node(&1).unwrap();
        // Node value 1.0; regrets (1, -1) scaled by opponent reach 0.5.
        assert_eq!(node.regret_sum(), &[0.5, -0.5]);
        // Strategy mass scaled by own reach 0.25.
        assert_eq!(node.strategy_sum(), &[0.125, 0.125]);
    }

    #[test]
    fn test_action_set_collision_is_an_error() {
        let s = store();
        let uniform2 = Strategy::uniform(2).unwrap();
        s.update(&3, &[0, 1], &[0.0, 0.0], &uniform2, 1.0, 1.0).unwrap();

        // Same key, different action count.
        assert!(s.strategy(&3, 4).is_err());
        let uniform3 = Strategy::uniform(3).unwrap();
        let err = s
            .update(&3, &[0, 1, 2], &[0.0, 0.0, 0.0], &uniform3, 1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnabstractableState(_)));

        // Same count but different actions also collides.
        let err = s
            .update(&3, &[5, 6], &[0.0, 0.0], &uniform2, 1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnabstractableState(_)));
    }

    #[test]
    fn test_average_strategy_tracks_mass() {
        let s = store();
        let actions = [0u8, 1u8];
        let mostly_first = Strategy::new(vec![0.8, 0.2]).unwrap();
        let mostly_second = Strategy::new(vec![0.2, 0.8]).unwrap();

        s.update(&9, &actions, &[0.0, 0.0], &mostly_first, 1.0, 1.0).unwrap();
        s.update(&9, &actions, &[0.0, 0.0], &mostly_second, 1.0, 3.0).unwrap();

        // Mass: 0.8 + 3*0.2 = 1.4 and 0.2 + 3*0.8 = 2.6, total 4.
        let avg = s.average_strategy(&9).unwrap().unwrap();
        assert!((avg.prob(0) - 0.35).abs() < 1e-12);
        assert!((avg.prob(1) - 0.65).abs() < 1e-12);

        let all = s.average_strategies().unwrap();
        assert_eq!(all.len(), 1);
        assert!((all[0].3 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_adds_elementwise() {
        let base = store();
        let local = store();
        let actions = [0u8, 1u8];
        let uniform = Strategy::uniform(2).unwrap();

        base.update(&1, &actions, &[1.0, 0.0], &uniform, 1.0, 1.0).unwrap();
        local.update(&1, &actions, &[1.0, 0.0], &uniform, 1.0, 1.0).unwrap();
        local.update(&2, &actions, &[0.0, 1.0], &uniform, 1.0, 1.0).unwrap();

        let (merged, dropped) = base.merge(local);
        assert_eq!((merged, dropped), (2, 0));
        assert_eq!(base.len(), 2);

        let node = base.node(&1).unwrap();
        assert_eq!(node.regret_sum(), &[1.0, -1.0]);
    }

    #[test]
    fn test_merge_drops_colliding_action_sets() {
        let base = store();
        let local = store();
        let uniform = Strategy::uniform(2).unwrap();

        base.update(&1, &[0, 1], &[0.0, 0.0], &uniform, 1.0, 1.0).unwrap();
        local.update(&1, &[4, 5], &[0.0, 0.0], &uniform, 1.0, 1.0).unwrap();

        let (merged, dropped) = base.merge(local);
        assert_eq!((merged, dropped), (0, 1));
        assert_eq!(base.node(&1).unwrap().actions(), &[0, 1]);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let s = store();
        let uniform = Strategy::uniform(2).unwrap();
        s.update(&4, &[0, 1], &[1.0, -1.0], &uniform, 1.0, 1.0).unwrap();

        let json = serde_json::to_string(&s.export()).unwrap();
        let parsed: StoreExport<u8, u8> = serde_json::from_str(&json).unwrap();

        let restored: RegretStore<u8, u8> = RegretStore::new();
        restored.import(parsed).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(
            restored.node(&4).unwrap().regret_sum(),
            s.node(&4).unwrap().regret_sum()
        );
    }

    #[test]
    fn test_import_rejects_mismatched_lengths() {
        let bad = StoreExport {
            records: vec![StoreRecord {
                key: 1u8,
                actions: vec![0u8, 1],
                regret_sum: vec![0.0],
                strategy_sum: vec![0.0, 0.0],
            }],
        };
        let s = store();
        assert!(s.import(bad).is_err());
    }
}
