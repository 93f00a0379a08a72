//! Greedy local search over partitions, with independent random restarts.
//!
//! Every restart owns its [`Search`] context (partition, allele counts and per-cluster scores),
//! so restarts run in parallel without sharing mutable state and are only compared once they
//! are done.
//!
//! A sweep proposes, in order:
//!
//! 1. **Merges**: the best pair of clusters is merged while that improves the score.
//! 2. **Splits**: each cluster is split on its most polymorphic site, kept only if it improves.
//! 3. **Reassignments**: every member (in a random order) moves to the best other cluster, or to
//!    a new singleton cluster.
//!
//! A move is accepted only if it increases the log-likelihood by more than [`MIN_IMPROVEMENT`],
//! so ties are rejected and the search always terminates.

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::model::{ClusterStats, Likelihood, Partition};
use crate::snp::SubAlignment;
use crate::utils::mix_seed;
use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Smallest score increase that counts as an improvement.
pub const MIN_IMPROVEMENT: f64 = 1e-9;

// ----------------------------------------------------------------------------
// SearchState
// ----------------------------------------------------------------------------

/// Lifecycle of a search.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum SearchState {
    /// A starting partition has been scored.
    Initialized,
    /// Sweeps are being applied.
    Searching,
    /// The last sweep accepted no move.
    Converged,
    /// Selected as the best of all restarts.
    Terminal,
}

// ----------------------------------------------------------------------------
// SearchResult
// ----------------------------------------------------------------------------

/// The partition a search ended with.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchResult {
    pub partition: Partition,
    pub log_likelihood: f64,
    /// Number of completed sweeps.
    pub rounds: usize,
    pub converged: bool,
    /// The time budget ran out before convergence.
    pub interrupted: bool,
    /// Index of the restart that produced the result.
    pub restart: usize,
    pub state: SearchState,
}

impl SearchResult {
    /// Higher score wins, near-ties go to the partition with fewer clusters.
    fn beats(&self, other: &SearchResult) -> bool {
        let diff = self.log_likelihood - other.log_likelihood;
        diff > MIN_IMPROVEMENT
            || (diff.abs() <= MIN_IMPROVEMENT
                && self.partition.num_clusters() < other.partition.num_clusters())
    }
}

// ----------------------------------------------------------------------------
// Search
// ----------------------------------------------------------------------------

/// One isolated hill-climbing context.
#[derive(Clone, Debug)]
pub struct Search<'a> {
    sub: &'a SubAlignment,
    model: &'a Likelihood,
    max_clusters: usize,
    partition: Partition,
    stats: ClusterStats,
    /// Log-likelihood contribution of each cluster.
    scores: Vec<f64>,
    state: SearchState,
    rounds: usize,
}

impl<'a> Search<'a> {
    /// Start from a given partition of the sub-alignment members.
    pub fn new(
        sub: &'a SubAlignment,
        model: &'a Likelihood,
        partition: Partition,
        max_clusters: usize,
    ) -> Result<Self, Report> {
        if partition.num_clusters() > max_clusters {
            return Err(eyre!(
                "Starting partition has {} clusters, more than the maximum of {max_clusters}.",
                partition.num_clusters()
            ));
        }
        let stats = ClusterStats::count(&partition, sub)?;
        let scores = (0..stats.num_clusters()).map(|k| model.cluster_score(&stats, k)).collect();
        Ok(Search {
            sub,
            model,
            max_clusters,
            partition,
            stats,
            scores,
            state: SearchState::Initialized,
            rounds: 0,
        })
    }

    /// Start from a uniformly random partition with a random number of clusters.
    pub fn random<R: Rng>(
        sub: &'a SubAlignment,
        model: &'a Likelihood,
        max_clusters: usize,
        rng: &mut R,
    ) -> Result<Self, Report> {
        let upper = max_clusters.min(sub.len()).max(1);
        let k = rng.gen_range(1..=upper);
        let labels = (0..sub.len()).map(|_| rng.gen_range(0..k)).collect();
        Search::new(sub, model, Partition::new(labels)?, max_clusters)
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn stats(&self) -> &ClusterStats {
        &self.stats
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Current total log-likelihood.
    pub fn score(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// Sweep until convergence, the round limit or the deadline; returns true if interrupted.
    pub fn run<R: Rng>(
        &mut self,
        rng: &mut R,
        round_limit: Option<usize>,
        deadline: Option<Instant>,
    ) -> bool {
        if self.sub.is_degenerate() {
            self.state = SearchState::Converged;
            return false;
        }
        self.state = SearchState::Searching;
        loop {
            if round_limit.is_some_and(|limit| self.rounds >= limit) {
                return false;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return true;
            }
            let accepted = self.sweep(rng);
            self.rounds += 1;
            if accepted == 0 {
                self.state = SearchState::Converged;
                return false;
            }
        }
    }

    /// One full sweep of merge, split and reassignment proposals; returns the accepted moves.
    pub fn sweep<R: Rng>(&mut self, rng: &mut R) -> usize {
        let mut order = (0..self.sub.len()).collect_vec();
        order.shuffle(rng);
        self.merge_phase() + self.split_phase() + self.reassign_phase(&order)
    }

    pub fn into_result(self, restart: usize, interrupted: bool) -> SearchResult {
        SearchResult {
            log_likelihood: self.score(),
            rounds: self.rounds,
            converged: self.state == SearchState::Converged,
            interrupted,
            restart,
            state: self.state,
            partition: self.partition,
        }
    }

    fn merge_phase(&mut self) -> usize {
        let mut accepted = 0;
        loop {
            let best = (0..self.stats.num_clusters())
                .tuple_combinations()
                .map(|(a, b)| (a, b, self.model.merge_delta(&self.stats, a, b)))
                .fold(None, |best: Option<(usize, usize, f64)>, candidate| match best {
                    Some(best) if best.2 >= candidate.2 => Some(best),
                    _ => Some(candidate),
                });
            match best {
                Some((a, b, delta)) if delta > MIN_IMPROVEMENT => {
                    self.apply_merge(a, b);
                    accepted += 1;
                }
                _ => return accepted,
            }
        }
    }

    fn split_phase(&mut self) -> usize {
        let mut accepted = 0;
        let mut k = 0;
        while k < self.stats.num_clusters() && self.stats.num_clusters() < self.max_clusters {
            if let Some(group) = self.split_candidate(k) {
                let before = self.scores[k];
                let new = self.stats.num_clusters();
                group.into_iter().for_each(|member| self.relocate(member, new));
                let delta = self.scores[k] + self.scores[new] - before;
                match delta > MIN_IMPROVEMENT {
                    true => accepted += 1,
                    false => self.apply_merge(k, new),
                }
            }
            k += 1;
        }
        accepted
    }

    /// Members of cluster `k` not carrying the major allele at its most polymorphic site.
    fn split_candidate(&self, k: usize) -> Option<Vec<usize>> {
        let size = self.stats.size(k) as u32;
        let (site, major, minor) = (0..self.stats.num_sites())
            .map(|site| {
                let counts = self.stats.counts(k, site);
                let (major, max) = counts
                    .iter()
                    .enumerate()
                    .fold((0, 0), |best, (c, &n)| if n > best.1 { (c, n) } else { best });
                (site, major as u8, size - max)
            })
            .fold(None, |best: Option<(usize, u8, u32)>, candidate| match best {
                Some(best) if best.2 >= candidate.2 => Some(best),
                _ => Some(candidate),
            })?;

        (minor > 0).then(|| {
            self.partition
                .members(k)
                .into_iter()
                .filter(|&member| self.sub.codes(member)[site] != major)
                .collect()
        })
    }

    fn reassign_phase(&mut self, order: &[usize]) -> usize {
        let (sub, model) = (self.sub, self.model);
        let mut accepted = 0;
        for &member in order {
            let from = self.partition.label(member);
            let codes = sub.codes(member);
            let removal = model.removal_delta(&self.stats, codes, from);
            let k = self.stats.num_clusters();

            // existing clusters first, so they win ties against a new singleton
            let mut targets = (0..k).filter(|&to| to != from).collect_vec();
            if self.stats.size(from) > 1 && k < self.max_clusters {
                targets.push(k);
            }
            let best = targets
                .into_iter()
                .map(|to| (to, removal + model.insertion_delta(&self.stats, codes, to)))
                .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                    Some(best) if best.1 >= candidate.1 => Some(best),
                    _ => Some(candidate),
                });

            if let Some((to, delta)) = best {
                if delta > MIN_IMPROVEMENT {
                    self.apply_move(member, to);
                    accepted += 1;
                }
            }
        }
        accepted
    }

    /// Move a member without removing its emptied cluster.
    fn relocate(&mut self, member: usize, to: usize) {
        let from = self.partition.label(member);
        self.partition.assign(member, to);
        self.stats.move_member(self.sub.codes(member), from, to);
        if to == self.scores.len() {
            self.scores.push(0.0);
        }
        self.refresh(from);
        self.refresh(to);
    }

    fn apply_move(&mut self, member: usize, to: usize) {
        let from = self.partition.label(member);
        self.relocate(member, to);
        if self.stats.size(from) == 0 {
            self.drop_cluster(from);
        }
    }

    fn apply_merge(&mut self, into: usize, from: usize) {
        self.stats.merge(into, from);
        self.partition.relabel(from, into);
        self.refresh(into);
        self.refresh(from);
        self.drop_cluster(from);
    }

    fn drop_cluster(&mut self, k: usize) {
        self.partition.remove_cluster(k);
        self.stats.remove_cluster(k);
        self.scores.swap_remove(k);
    }

    fn refresh(&mut self, k: usize) {
        self.scores[k] = self.model.cluster_score(&self.stats, k);
    }
}

// ----------------------------------------------------------------------------
// Optimizer
// ----------------------------------------------------------------------------

/// Multi-restart driver of [`Search`].
#[derive(Clone, Debug)]
pub struct Optimizer {
    pub num_restarts: usize,
    pub max_clusters: usize,
    pub round_limit: Option<usize>,
    pub deadline: Option<Instant>,
}

impl Optimizer {
    pub fn new(config: &Config, deadline: Option<Instant>) -> Self {
        Optimizer {
            num_restarts: config.num_restarts.max(1),
            max_clusters: config.max_clusters_per_level.max(1),
            round_limit: config.round_limit(),
            deadline,
        }
    }

    /// Best partition over all restarts.
    ///
    /// Without variable sites (or with a single member) the search converges immediately to a
    /// single cluster.
    ///
    /// ```rust
    /// use hierbaps::{Config, Likelihood, Optimizer, SnpMatrix};
    /// let rows = ["A", "A", "A", "C", "C", "C"].iter().map(|s| s.as_bytes().to_vec()).collect();
    /// let ids = (0..6).map(|i| format!("s{i}")).collect();
    /// let matrix = SnpMatrix::new(ids, vec![1], rows)?;
    /// let sub = matrix.view()?;
    /// let model = Likelihood::new(1.0, &sub)?;
    ///
    /// let result = Optimizer::new(&Config::default(), None).optimize(&sub, &model, 42)?;
    /// assert_eq!(result.partition.num_clusters(), 2);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn optimize(
        &self,
        sub: &SubAlignment,
        model: &Likelihood,
        seed: u64,
    ) -> Result<SearchResult, Report> {
        if sub.is_degenerate() || sub.len() < 2 || self.max_clusters < 2 {
            let mut search = Search::new(sub, model, Partition::single(sub.len()), self.max_clusters)?;
            search.state = SearchState::Converged;
            let mut result = search.into_result(0, false);
            result.state = SearchState::Terminal;
            return Ok(result);
        }

        let results = (0..self.num_restarts)
            .into_par_iter()
            .map(|restart| {
                let mut rng = StdRng::seed_from_u64(mix_seed(seed, restart as u64));
                let mut search = Search::random(sub, model, self.max_clusters, &mut rng)?;
                let interrupted = search.run(&mut rng, self.round_limit, self.deadline);
                debug!(
                    "Restart {restart}: {} clusters, log-likelihood {:.4}, {} rounds, {}",
                    search.partition.num_clusters(),
                    search.score(),
                    search.rounds,
                    search.state,
                );
                Ok(search.into_result(restart, interrupted))
            })
            .collect::<Result<Vec<_>, Report>>()?;

        let mut best = results
            .into_iter()
            .reduce(|best, next| if next.beats(&best) { next } else { best })
            .ok_or_else(|| eyre!("No optimizer restart was run."))?;
        best.state = SearchState::Terminal;
        Ok(best)
    }
}
