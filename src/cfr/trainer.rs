//! The CFR training loop.
//!
//! One iteration runs one traversal per player. The traverser's actions are
//! always fully expanded; other players are expanded or sampled per
//! [`TraversalMode`]. Regrets accumulate into a [`RegretStore`]; at
//! checkpoint intervals every visited information set's average strategy is
//! flushed into a [`StrategyStore`], so a partially trained store is always
//! usable.
//!
//! With more than one worker, iterations run in rayon batches. Each worker
//! reads strategies from the shared store, accumulates its updates into a
//! private store, and the batch ends with an add-only merge, so no update is
//! lost and runs stay reproducible for a fixed seed and worker count.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cfr::config::{TrainerConfig, TrainerStats, TraversalMode};
use crate::cfr::game::Game;
use crate::cfr::storage::{RegretStore, StoreExport};
use crate::error::{EngineError, Result};
use crate::strategy::{Strategy, StrategyStore};

/// Checkpoint format version written by [`Trainer::save_checkpoint`].
pub const CHECKPOINT_VERSION: u32 = 1;

/// Lifecycle of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Constructed, nothing trained yet.
    Initialized,
    /// Iterations in progress.
    Running,
    /// Mid-flush into the strategy store.
    Checkpointing,
    /// Budget exhausted.
    Completed,
    /// Stopped by the cancellation flag.
    Cancelled,
}

/// Summary returned by [`Trainer::train`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRun {
    /// Terminal phase, [`RunPhase::Completed`] or [`RunPhase::Cancelled`].
    pub phase: RunPhase,
    /// Trainer-lifetime iterations after this run.
    pub iterations: u64,
    /// Seed the trainer was configured with.
    pub seed: u64,
    /// Checkpoint cadence the run used.
    pub checkpoint_interval: u64,
    /// Traversals skipped over the trainer's lifetime.
    pub skipped_traversals: u64,
    /// Wall-clock seconds spent in this run.
    pub elapsed_seconds: f64,
    /// Information sets discovered so far.
    pub info_sets: usize,
}

/// Serializable trainer state for resuming interrupted runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerCheckpoint<K, A> {
    /// Format version; loaders reject versions newer than they know.
    pub version: u32,
    /// Iterations completed when the checkpoint was taken.
    pub iteration: u64,
    /// Full regret and strategy accumulator state.
    pub regrets: StoreExport<K, A>,
}

/// CFR trainer, generic over the game being solved.
///
/// ```no_run
/// use gto_engine::abstraction::AbstractionConfig;
/// use gto_engine::cfr::{Trainer, TrainerConfig};
/// use gto_engine::game::{GameConfig, HoldemGame};
///
/// # fn main() -> gto_engine::Result<()> {
/// let game = HoldemGame::new(GameConfig::fast(), AbstractionConfig::fast())?;
/// let mut trainer = Trainer::new(game, TrainerConfig::fast())?;
/// let run = trainer.train(1_000, 250)?;
/// println!("{} info sets", run.info_sets);
/// # Ok(())
/// # }
/// ```
pub struct Trainer<G: Game> {
    game: G,
    config: TrainerConfig,
    regrets: RegretStore<G::Key, G::Action>,
    store: StrategyStore<G::Key, G::Action>,
    stats: TrainerStats,
    iteration: u64,
    phase: RunPhase,
    cancel: Arc<AtomicBool>,
    rng: StdRng,
}

impl<G: Game> Trainer<G> {
    /// Create a trainer with an empty store.
    pub fn new(game: G, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Trainer {
            game,
            config,
            regrets: RegretStore::new(),
            store: StrategyStore::new(),
            stats: TrainerStats::default(),
            iteration: 0,
            phase: RunPhase::Initialized,
            cancel: Arc::new(AtomicBool::new(false)),
            rng,
        })
    }

    /// Train for `budget` iterations, flushing average strategies into the
    /// strategy store every `checkpoint_interval` iterations and at the end.
    pub fn train(&mut self, budget: u64, checkpoint_interval: u64) -> Result<TrainingRun> {
        self.train_with_callback(budget, checkpoint_interval, |_| {})
    }

    /// [`Trainer::train`] with a progress callback invoked after every
    /// checkpoint flush.
    pub fn train_with_callback<F>(
        &mut self,
        budget: u64,
        checkpoint_interval: u64,
        mut callback: F,
    ) -> Result<TrainingRun>
    where
        F: FnMut(&TrainerStats),
    {
        if checkpoint_interval == 0 {
            return Err(EngineError::configuration(
                "checkpoint_interval must be at least 1",
            ));
        }

        let start = Instant::now();
        let begin = self.iteration;
        let target = begin + budget;
        self.phase = RunPhase::Running;
        let mut cancelled = false;

        while self.iteration < target {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            let done = self.iteration - begin;
            let step = (target - self.iteration)
                .min(checkpoint_interval - done % checkpoint_interval)
                .min(self.config.batch_size);
            if self.config.num_workers > 1 {
                self.run_batch(step)?;
            } else {
                for _ in 0..step {
                    self.run_iteration()?;
                }
            }

            let done = self.iteration - begin;
            if done % checkpoint_interval == 0 || self.iteration >= target {
                self.checkpoint_flush()?;
                self.refresh_stats(&start);
                callback(&self.stats);
            }
        }

        if cancelled {
            // Leave a usable store behind even when stopped early.
            self.checkpoint_flush()?;
            self.refresh_stats(&start);
        }

        self.phase = if cancelled {
            RunPhase::Cancelled
        } else {
            RunPhase::Completed
        };
        let run = TrainingRun {
            phase: self.phase,
            iterations: self.iteration,
            seed: self.config.seed,
            checkpoint_interval,
            skipped_traversals: self.stats.skipped_traversals,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            info_sets: self.regrets.len(),
        };
        info!(
            "training {:?} at iteration {} with {} info sets ({} traversals skipped)",
            run.phase, run.iterations, run.info_sets, run.skipped_traversals
        );
        Ok(run)
    }

    /// Run one iteration: one traversal per player on the calling thread.
    pub fn run_iteration(&mut self) -> Result<()> {
        self.iteration += 1;
        for player in 0..self.game.num_players() {
            let root = self.game.root();
            let traversal = Traversal {
                game: &self.game,
                config: &self.config,
                strategies: &self.regrets,
                updates: &self.regrets,
            };
            match traversal.run(&root, player, 1.0, 1.0, &mut self.rng) {
                Ok(_) => {}
                Err(err) if is_transient(&err) => {
                    warn!(
                        "skipping traversal for player {} at iteration {}: {}",
                        player, self.iteration, err
                    );
                    self.stats.skipped_traversals += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Run `iterations` split across the configured workers. Workers read
    /// the shared store and write into private delta stores, merged here
    /// once all workers finish.
    fn run_batch(&mut self, iterations: u64) -> Result<()> {
        let workers = self.config.num_workers as u64;
        let per_worker = iterations / workers;
        let remainder = iterations % workers;

        let game = &self.game;
        let config = &self.config;
        let shared = &self.regrets;
        let start_iteration = self.iteration;

        let outcomes: Vec<Result<(RegretStore<G::Key, G::Action>, u64)>> = (0..workers)
            .into_par_iter()
            .map(|worker| {
                let mut rng =
                    StdRng::seed_from_u64(stream_seed(config.seed, start_iteration, worker));
                let local = RegretStore::new();
                let mut skipped = 0u64;
                let share = per_worker + u64::from(worker < remainder);

                for offset in 0..share {
                    for player in 0..game.num_players() {
                        let root = game.root();
                        let traversal = Traversal {
                            game,
                            config,
                            strategies: shared,
                            updates: &local,
                        };
                        match traversal.run(&root, player, 1.0, 1.0, &mut rng) {
                            Ok(_) => {}
                            Err(err) if is_transient(&err) => {
                                warn!(
                                    "worker {} skipping traversal for player {} at iteration {}: {}",
                                    worker,
                                    player,
                                    start_iteration + offset + 1,
                                    err
                                );
                                skipped += 1;
                            }
                            Err(err) => return Err(err),
                        }
                    }
                }
                Ok((local, skipped))
            })
            .collect();

        for outcome in outcomes {
            let (local, skipped) = outcome?;
            let (_, dropped) = self.regrets.merge(local);
            if dropped > 0 {
                warn!("dropped {} colliding info sets merging a worker batch", dropped);
            }
            self.stats.skipped_traversals += skipped;
        }
        self.iteration += iterations;
        Ok(())
    }

    fn checkpoint_flush(&mut self) -> Result<()> {
        self.phase = RunPhase::Checkpointing;
        let flushed = self.regrets.average_strategies()?;
        let count = flushed.len();
        for (key, actions, strategy, weight) in flushed {
            self.store.put(key, actions, strategy, weight)?;
        }
        self.stats.checkpoints += 1;
        info!(
            "checkpoint {}: {} strategies flushed at iteration {}",
            self.stats.checkpoints, count, self.iteration
        );
        self.phase = RunPhase::Running;
        Ok(())
    }

    fn refresh_stats(&mut self, start: &Instant) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.regrets.len();
        self.stats.elapsed_seconds = start.elapsed().as_secs_f64();
        self.stats.update_rate();
    }

    /// Exact exploitability of the current average strategy: the mean of
    /// both players' best-response values. Zero at an equilibrium.
    ///
    /// Requires a two-player game whose chance nodes can be enumerated via
    /// [`Game::chance_outcomes`]; games that cannot (the hold'em model
    /// samples its chance events) report `Configuration` instead of an
    /// approximation.
    pub fn exploitability(&self) -> Result<f64> {
        if self.game.num_players() != 2 {
            return Err(EngineError::configuration(
                "exploitability is defined for two-player games only",
            ));
        }
        let mut total = 0.0;
        for player in 0..2 {
            total += self.best_response_value(player)?;
        }
        Ok(total / 2.0)
    }

    /// Measure exploitability and append it to the stats history.
    pub fn record_exploitability(&mut self) -> Result<f64> {
        let exploitability = self.exploitability()?;
        self.stats
            .record_exploitability(self.iteration, exploitability);
        Ok(exploitability)
    }

    fn best_response_value(&self, exploiter: usize) -> Result<f64> {
        let root = self.game.root();
        let mut response = BestResponse {
            game: &self.game,
            regrets: &self.regrets,
            exploiter,
            sets: FxHashMap::default(),
            choices: FxHashMap::default(),
        };
        response.index(&root, 1.0)?;
        response.value(&root)
    }

    /// Signal the running train loop to stop at the next iteration boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// The game being trained.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// The trainer configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Lifetime statistics.
    pub fn stats(&self) -> &TrainerStats {
        &self.stats
    }

    /// Iterations completed over the trainer's lifetime.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The regret accumulators.
    pub fn regrets(&self) -> &RegretStore<G::Key, G::Action> {
        &self.regrets
    }

    /// The strategy store holding the latest checkpoint flush.
    pub fn store(&self) -> &StrategyStore<G::Key, G::Action> {
        &self.store
    }

    /// Consume the trainer and keep its strategy store.
    pub fn into_store(self) -> StrategyStore<G::Key, G::Action> {
        self.store
    }
}

impl<G: Game> Trainer<G>
where
    G::Key: Serialize + DeserializeOwned,
    G::Action: Serialize + DeserializeOwned,
{
    /// Persist regret state and the iteration counter as JSON.
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        let checkpoint = TrainerCheckpoint {
            version: CHECKPOINT_VERSION,
            iteration: self.iteration,
            regrets: self.regrets.export(),
        };
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), &checkpoint)?;
        info!(
            "saved checkpoint at iteration {} to {}",
            self.iteration,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replace this trainer's regret state from a checkpoint file.
    pub fn resume_from(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path.as_ref())?;
        let checkpoint: TrainerCheckpoint<G::Key, G::Action> =
            serde_json::from_reader(BufReader::new(file))?;
        if checkpoint.version > CHECKPOINT_VERSION {
            return Err(EngineError::encoding(format!(
                "checkpoint version {} is newer than supported version {}",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        self.regrets.import(checkpoint.regrets)?;
        self.iteration = checkpoint.iteration;
        self.stats.iterations = checkpoint.iteration;
        info!(
            "resumed at iteration {} from {}",
            self.iteration,
            path.as_ref().display()
        );
        Ok(())
    }
}

/// One traversal's shared context.
///
/// `strategies` serves strategy reads; `updates` receives accumulator
/// writes. Sequential training passes the same store as both; parallel
/// workers split them so batches merge without write contention.
struct Traversal<'a, G: Game> {
    game: &'a G,
    config: &'a TrainerConfig,
    strategies: &'a RegretStore<G::Key, G::Action>,
    updates: &'a RegretStore<G::Key, G::Action>,
}

impl<G: Game> Traversal<'_, G> {
    /// Recursive counterfactual-value computation for `traverser`.
    ///
    /// `reach_own` carries the product of the traverser's own action
    /// probabilities above this node; `reach_opp` the other players'.
    /// Sampled nodes leave `reach_opp` untouched, which is what keeps
    /// external sampling unbiased.
    fn run<R: Rng + ?Sized>(
        &self,
        state: &G::State,
        traverser: usize,
        reach_own: f64,
        reach_opp: f64,
        rng: &mut R,
    ) -> Result<f64> {
        if self.game.is_terminal(state) {
            return self.game.payoff(state, traverser);
        }
        if self.game.is_chance(state) {
            let next = self.game.sample_chance(state, rng);
            return self.run(&next, traverser, reach_own, reach_opp, rng);
        }

        let player = match self.game.current_player(state) {
            Some(player) => player,
            None => return self.game.payoff(state, traverser),
        };
        let actions = self.game.legal_actions(state);
        if actions.is_empty() {
            return Err(EngineError::configuration(
                "decision node offers no legal actions",
            ));
        }
        let key = self.game.info_key(state)?;
        let strategy = self.strategies.strategy(&key, actions.len())?;

        if player == traverser {
            let mut utilities = vec![0.0; actions.len()];
            for (i, action) in actions.iter().enumerate() {
                let next = self.game.next_state(state, action);
                utilities[i] = self.run(
                    &next,
                    traverser,
                    reach_own * strategy.prob(i),
                    reach_opp,
                    rng,
                )?;
            }
            self.updates
                .update(&key, &actions, &utilities, &strategy, reach_opp, reach_own)?;
            Ok(strategy
                .probs()
                .iter()
                .zip(&utilities)
                .map(|(&p, &u)| p * u)
                .sum())
        } else {
            let expand = match self.config.mode {
                TraversalMode::Full => true,
                TraversalMode::ExternalSampling => actions.len() <= self.config.max_expand_actions,
            };
            if expand {
                let mut value = 0.0;
                for (i, action) in actions.iter().enumerate() {
                    let p = strategy.prob(i);
                    if p <= 0.0 {
                        continue;
                    }
                    let next = self.game.next_state(state, action);
                    value += p * self.run(&next, traverser, reach_own, reach_opp * p, rng)?;
                }
                Ok(value)
            } else {
                let pick = if rng.gen::<f64>() < self.config.exploration {
                    rng.gen_range(0..actions.len())
                } else {
                    strategy.sample(rng)
                };
                let next = self.game.next_state(state, &actions[pick]);
                self.run(&next, traverser, reach_own, reach_opp, rng)
            }
        }
    }
}

/// Errors that invalidate one traversal but not the run.
fn is_transient(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::UnabstractableState(_) | EngineError::InvalidHand(_)
    )
}

/// Independent RNG stream per (seed, batch start, worker).
fn stream_seed(seed: u64, iteration: u64, worker: u64) -> u64 {
    let mut z = seed
        ^ iteration.wrapping_mul(0xA24B_AED4_963E_E407)
        ^ worker.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Exact best response against the stored average strategy.
///
/// A forward pass indexes every state of each exploiter information set with
/// its opponent-and-chance reach; the backward pass then picks one action per
/// information set by maximizing the reach-weighted sum over the set's
/// states, so hidden-information games are scored correctly.
struct BestResponse<'a, G: Game> {
    game: &'a G,
    regrets: &'a RegretStore<G::Key, G::Action>,
    exploiter: usize,
    sets: FxHashMap<G::Key, Vec<(G::State, f64)>>,
    choices: FxHashMap<G::Key, usize>,
}

impl<G: Game> BestResponse<'_, G> {
    fn opponent_strategy(&self, key: &G::Key, num_actions: usize) -> Result<Strategy> {
        match self.regrets.average_strategy(key) {
            Some(strategy) => {
                let strategy = strategy?;
                if strategy.len() != num_actions {
                    return Err(EngineError::unabstractable(format!(
                        "info set {} stores {} actions but the state offers {}",
                        key,
                        strategy.len(),
                        num_actions
                    )));
                }
                Ok(strategy)
            }
            None => Strategy::uniform(num_actions),
        }
    }

    fn index(&mut self, state: &G::State, reach: f64) -> Result<()> {
        if self.game.is_terminal(state) {
            return Ok(());
        }
        if self.game.is_chance(state) {
            let outcomes = self.game.chance_outcomes(state).ok_or_else(|| {
                EngineError::configuration(
                    "game cannot enumerate chance outcomes; exploitability is unsupported",
                )
            })?;
            for (next, p) in outcomes {
                self.index(&next, reach * p)?;
            }
            return Ok(());
        }

        let player = match self.game.current_player(state) {
            Some(player) => player,
            None => return Ok(()),
        };
        let actions = self.game.legal_actions(state);
        if actions.is_empty() {
            return Err(EngineError::configuration(
                "decision node offers no legal actions",
            ));
        }

        if player == self.exploiter {
            let key = self.game.info_key(state)?;
            self.sets
                .entry(key)
                .or_default()
                .push((state.clone(), reach));
            for action in &actions {
                self.index(&self.game.next_state(state, action), reach)?;
            }
        } else {
            let key = self.game.info_key(state)?;
            let strategy = self.opponent_strategy(&key, actions.len())?;
            for (i, action) in actions.iter().enumerate() {
                let p = strategy.prob(i);
                if p <= 0.0 {
                    continue;
                }
                self.index(&self.game.next_state(state, action), reach * p)?;
            }
        }
        Ok(())
    }

    fn value(&mut self, state: &G::State) -> Result<f64> {
        if self.game.is_terminal(state) {
            return self.game.payoff(state, self.exploiter);
        }
        if self.game.is_chance(state) {
            let outcomes = self.game.chance_outcomes(state).ok_or_else(|| {
                EngineError::configuration(
                    "game cannot enumerate chance outcomes; exploitability is unsupported",
                )
            })?;
            let mut value = 0.0;
            for (next, p) in outcomes {
                value += p * self.value(&next)?;
            }
            return Ok(value);
        }

        let player = match self.game.current_player(state) {
            Some(player) => player,
            None => return self.game.payoff(state, self.exploiter),
        };
        let actions = self.game.legal_actions(state);

        if player == self.exploiter {
            let key = self.game.info_key(state)?;
            let choice = self.choose(&key)?;
            self.value(&self.game.next_state(state, &actions[choice]))
        } else {
            let key = self.game.info_key(state)?;
            let strategy = self.opponent_strategy(&key, actions.len())?;
            let mut value = 0.0;
            for (i, action) in actions.iter().enumerate() {
                let p = strategy.prob(i);
                if p <= 0.0 {
                    continue;
                }
                value += p * self.value(&self.game.next_state(state, action))?;
            }
            Ok(value)
        }
    }

    /// Resolve the best action for one information set by aggregating over
    /// every indexed state, weighted by opponent-and-chance reach.
    fn choose(&mut self, key: &G::Key) -> Result<usize> {
        if let Some(&choice) = self.choices.get(key) {
            return Ok(choice);
        }
        let states = self
            .sets
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::configuration("best response reached an unindexed state"))?;
        let actions = self.game.legal_actions(&states[0].0);

        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, action) in actions.iter().enumerate() {
            let mut total = 0.0;
            for (state, reach) in &states {
                total += reach * self.value(&self.game.next_state(state, action))?;
            }
            if total > best_value {
                best = i;
                best_value = total;
            }
        }
        self.choices.insert(key.clone(), best);
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Matching pennies, sequentialized: the hider moves first, the matcher
    /// moves without seeing it. The unique equilibrium is uniform for both.
    struct MatchingPennies;

    impl Game for MatchingPennies {
        type State = Vec<u8>;
        type Action = u8;
        type Key = u8;

        fn root(&self) -> Vec<u8> {
            Vec::new()
        }

        fn num_players(&self) -> usize {
            2
        }

        fn is_terminal(&self, state: &Vec<u8>) -> bool {
            state.len() == 2
        }

        fn payoff(&self, state: &Vec<u8>, player: usize) -> Result<f64> {
            if state.len() != 2 {
                return Err(EngineError::configuration("payoff before both moves"));
            }
            // The matcher (player 1) wins when the pennies agree.
            let matcher = if state[0] == state[1] { 1.0 } else { -1.0 };
            Ok(if player == 1 { matcher } else { -matcher })
        }

        fn is_chance(&self, _: &Vec<u8>) -> bool {
            false
        }

        fn sample_chance<R: Rng + ?Sized>(&self, state: &Vec<u8>, _: &mut R) -> Vec<u8> {
            state.clone()
        }

        fn current_player(&self, state: &Vec<u8>) -> Option<usize> {
            if state.len() < 2 {
                Some(state.len())
            } else {
                None
            }
        }

        fn legal_actions(&self, _: &Vec<u8>) -> Vec<u8> {
            vec![0, 1]
        }

        fn next_state(&self, state: &Vec<u8>, action: &u8) -> Vec<u8> {
            let mut next = state.clone();
            next.push(*action);
            next
        }

        fn info_key(&self, state: &Vec<u8>) -> Result<u8> {
            Ok(state.len() as u8)
        }
    }

    /// A game whose single chance node cannot be enumerated.
    struct OpaqueChance;

    impl Game for OpaqueChance {
        type State = u8;
        type Action = u8;
        type Key = u8;

        fn root(&self) -> u8 {
            0
        }
        fn num_players(&self) -> usize {
            2
        }
        fn is_terminal(&self, state: &u8) -> bool {
            *state == 2
        }
        fn payoff(&self, _: &u8, _: usize) -> Result<f64> {
            Ok(0.0)
        }
        fn is_chance(&self, state: &u8) -> bool {
            *state == 0
        }
        fn sample_chance<R: Rng + ?Sized>(&self, _: &u8, _: &mut R) -> u8 {
            1
        }
        fn current_player(&self, _: &u8) -> Option<usize> {
            Some(0)
        }
        fn legal_actions(&self, _: &u8) -> Vec<u8> {
            vec![0]
        }
        fn next_state(&self, _: &u8, _: &u8) -> u8 {
            2
        }
        fn info_key(&self, state: &u8) -> Result<u8> {
            Ok(*state)
        }
    }

    fn pennies_trainer(config: TrainerConfig) -> Trainer<MatchingPennies> {
        Trainer::new(MatchingPennies, config).unwrap()
    }

    #[test]
    fn test_matching_pennies_exploitability_converges() {
        let config = TrainerConfig::default()
            .with_mode(TraversalMode::Full)
            .with_seed(7);
        let mut trainer = pennies_trainer(config);

        let mut measured = Vec::new();
        for milestone in [100u64, 1_000, 10_000] {
            let budget = milestone - trainer.iteration();
            trainer.train(budget, budget).unwrap();
            measured.push(trainer.record_exploitability().unwrap());
        }

        for exploitability in &measured {
            assert!(*exploitability >= -1e-9);
        }
        assert!(
            measured[1] <= measured[0] + 1e-9 && measured[2] <= measured[1] + 1e-9,
            "exploitability did not decrease: {:?}",
            measured
        );
        assert!(measured[2] < 0.05, "still exploitable: {:?}", measured);
        assert_eq!(trainer.stats().exploitability_history.len(), 3);

        // The average strategies themselves sit near uniform.
        for key in [0u8, 1] {
            let average = trainer.regrets().average_strategy(&key).unwrap().unwrap();
            assert!((average.prob(0) - 0.5).abs() < 0.05);
        }
    }

    #[test]
    fn test_external_sampling_learns_too() {
        // Force actual sampling by disallowing opponent expansion.
        let config = TrainerConfig {
            mode: TraversalMode::ExternalSampling,
            max_expand_actions: 0,
            seed: 11,
            ..TrainerConfig::default()
        };
        let mut trainer = pennies_trainer(config);
        trainer.train(4_000, 1_000).unwrap();

        let exploitability = trainer.exploitability().unwrap();
        assert!(exploitability >= -1e-9);
        assert!(exploitability < 0.2, "sampled run too exploitable: {}", exploitability);
    }

    #[test]
    fn test_training_run_reports() {
        let config = TrainerConfig::default()
            .with_mode(TraversalMode::Full)
            .with_seed(3);
        let mut trainer = pennies_trainer(config);
        let run = trainer.train(64, 32).unwrap();

        assert_eq!(run.phase, RunPhase::Completed);
        assert_eq!(run.iterations, 64);
        assert_eq!(run.checkpoint_interval, 32);
        assert_eq!(run.skipped_traversals, 0);
        assert_eq!(run.info_sets, 2);
        assert_eq!(trainer.phase(), RunPhase::Completed);
        assert!(trainer.stats().checkpoints >= 2);
        assert_eq!(trainer.store().len(), 2);
    }

    #[test]
    fn test_zero_budget_completes_without_flushing() {
        let mut trainer = pennies_trainer(TrainerConfig::default());
        let run = trainer.train(0, 10).unwrap();
        assert_eq!(run.phase, RunPhase::Completed);
        assert_eq!(run.iterations, 0);
        assert_eq!(trainer.stats().checkpoints, 0);
        assert!(trainer.store().is_empty());
    }

    #[test]
    fn test_cancellation_stops_promptly_with_flush() {
        let mut trainer = pennies_trainer(TrainerConfig::default().with_mode(TraversalMode::Full));
        trainer.train(50, 50).unwrap();

        trainer.cancel_handle().store(true, Ordering::Relaxed);
        let run = trainer.train(100_000, 1_000).unwrap();

        assert_eq!(run.phase, RunPhase::Cancelled);
        assert_eq!(run.iterations, 50, "no further iterations after cancel");
        // The cancel path still flushed the store.
        assert_eq!(trainer.store().len(), 2);
    }

    #[test]
    fn test_parallel_workers_merge_batches() {
        let config = TrainerConfig::default()
            .with_mode(TraversalMode::Full)
            .with_workers(2)
            .with_seed(5);
        let mut trainer = pennies_trainer(config);
        let run = trainer.train(200, 100).unwrap();

        assert_eq!(run.iterations, 200);
        assert_eq!(run.info_sets, 2);
        // Merged accumulators still produce a sensible measurement.
        let exploitability = trainer.exploitability().unwrap();
        assert!((-1e-9..1.0).contains(&exploitability));
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let path = std::env::temp_dir().join("gto-engine-trainer-checkpoint-test.json");
        let config = TrainerConfig::default().with_mode(TraversalMode::Full);

        let mut first = pennies_trainer(config.clone());
        first.train(120, 60).unwrap();
        first.save_checkpoint(&path).unwrap();

        let mut second = pennies_trainer(config);
        second.resume_from(&path).unwrap();
        assert_eq!(second.iteration(), 120);
        assert_eq!(second.regrets().len(), 2);
        assert_eq!(
            second.regrets().node(&0).unwrap().regret_sum(),
            first.regrets().node(&0).unwrap().regret_sum()
        );

        // Resumed trainers keep training.
        let run = second.train(10, 10).unwrap();
        assert_eq!(run.iterations, 130);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_checkpoint_version_gate() {
        let path = std::env::temp_dir().join("gto-engine-trainer-version-test.json");
        let checkpoint: TrainerCheckpoint<u8, u8> = TrainerCheckpoint {
            version: CHECKPOINT_VERSION + 1,
            iteration: 5,
            regrets: StoreExport {
                records: Vec::new(),
            },
        };
        std::fs::write(&path, serde_json::to_string(&checkpoint).unwrap()).unwrap();

        let mut trainer = pennies_trainer(TrainerConfig::default());
        let err = trainer.resume_from(&path).unwrap_err();
        assert!(matches!(err, EngineError::Encoding(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_opaque_chance_blocks_exploitability() {
        let trainer = Trainer::new(OpaqueChance, TrainerConfig::default()).unwrap();
        let err = trainer.exploitability().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
