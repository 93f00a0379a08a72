//! Dirichlet-multinomial marginal likelihood of a partition.
//!
//! For a cluster holding `n_a` copies of each allele `a` at a site with `K` observed alleles and
//! `N = Σ n_a` members, the allele frequencies are integrated out under a symmetric
//! `Dirichlet(α)` prior:
//!
//! ```text
//! ln P(n | α) = lnΓ(Kα) − lnΓ(Kα + N) + Σ_a [ lnΓ(α + n_a) − lnΓ(α) ]
//! ```
//!
//! Sites are treated as conditionally independent, so the score of a partition is the sum of
//! this term over every (site, cluster) pair. Single-member moves use the identity
//! `lnΓ(x + 1) − lnΓ(x) = ln x`, so their deltas only need one logarithm per site and cluster.

use crate::model::ClusterStats;
use crate::snp::SubAlignment;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use statrs::function::gamma::ln_gamma;

/// Scores [`ClusterStats`] under the Dirichlet-multinomial model.
#[derive(Clone, Debug)]
pub struct Likelihood {
    alpha: f64,
    /// `ln(α + n)` for `n` up to the number of members.
    ln_alpha: Vec<f64>,
    /// `ln(Kα + N)`, indexed by `[K][N]`.
    ln_total: Vec<Vec<f64>>,
}

impl Likelihood {
    /// Create the engine for a sub-alignment with concentration `alpha`.
    ///
    /// ```rust
    /// use hierbaps::{Likelihood, SnpMatrix};
    /// let matrix = SnpMatrix::new(vec!["a".into(), "b".into()], vec![1], vec![b"A".to_vec(), b"C".to_vec()])?;
    /// let model = Likelihood::new(1.0, &matrix.view()?)?;
    /// assert_eq!(model.alpha(), 1.0);
    /// assert!(Likelihood::new(0.0, &matrix.view()?).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(alpha: f64, sub: &SubAlignment) -> Result<Self, Report> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(eyre!("Dirichlet concentration must be a positive number, found {alpha}.")
                .suggestion("Try the default --dirichlet-concentration 1.0"));
        }
        let n = sub.len();
        let ln_alpha = (0..=n).map(|i| (alpha + i as f64).ln()).collect();
        let ln_total = (0..=sub.max_alphabet())
            .map(|k| (0..=n).map(|i| (k as f64 * alpha + i as f64).ln()).collect())
            .collect();
        Ok(Likelihood { alpha, ln_alpha, ln_total })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn ln_alpha(&self, n: u32) -> f64 {
        match self.ln_alpha.get(n as usize) {
            Some(value) => *value,
            None => (self.alpha + n as f64).ln(),
        }
    }

    fn ln_total(&self, k: usize, n: usize) -> f64 {
        match self.ln_total.get(k).and_then(|row| row.get(n)) {
            Some(value) => *value,
            None => (k as f64 * self.alpha + n as f64).ln(),
        }
    }

    /// Log marginal probability of one count vector.
    pub fn site_term(&self, counts: &[u32]) -> f64 {
        let total: u32 = counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let k_alpha = counts.len() as f64 * self.alpha;
        let alleles: f64 =
            counts.iter().map(|&n| ln_gamma(self.alpha + n as f64) - ln_gamma(self.alpha)).sum();
        ln_gamma(k_alpha) - ln_gamma(k_alpha + total as f64) + alleles
    }

    /// Contribution of cluster `k` over all sites.
    pub fn cluster_score(&self, stats: &ClusterStats, k: usize) -> f64 {
        (0..stats.num_sites()).map(|site| self.site_term(stats.counts(k, site))).sum()
    }

    /// Total log-likelihood of a partition.
    pub fn score(&self, stats: &ClusterStats) -> f64 {
        (0..stats.num_clusters()).map(|k| self.cluster_score(stats, k)).sum()
    }

    /// Score difference between two count tables that only differ in `clusters`.
    ///
    /// Labels missing from a table (eg. a row opened by the move) contribute nothing.
    pub fn delta(&self, before: &ClusterStats, after: &ClusterStats, clusters: &[usize]) -> f64 {
        clusters
            .iter()
            .map(|&k| {
                let new = if k < after.num_clusters() { self.cluster_score(after, k) } else { 0.0 };
                let old = if k < before.num_clusters() { self.cluster_score(before, k) } else { 0.0 };
                new - old
            })
            .sum()
    }

    /// Score change from taking a member with allele `codes` out of cluster `from`.
    pub fn removal_delta(&self, stats: &ClusterStats, codes: &[u8], from: usize) -> f64 {
        let size = stats.size(from) - 1;
        codes
            .iter()
            .enumerate()
            .map(|(site, &code)| {
                let n = stats.count_of(from, site, code) - 1;
                self.ln_total(stats.alphabet_size(site), size) - self.ln_alpha(n)
            })
            .sum()
    }

    /// Score change from adding a member with allele `codes` to cluster `to`.
    ///
    /// `to == num_clusters()` scores a new singleton cluster.
    pub fn insertion_delta(&self, stats: &ClusterStats, codes: &[u8], to: usize) -> f64 {
        let new = to >= stats.num_clusters();
        let size = if new { 0 } else { stats.size(to) };
        codes
            .iter()
            .enumerate()
            .map(|(site, &code)| {
                let n = if new { 0 } else { stats.count_of(to, site, code) };
                self.ln_alpha(n) - self.ln_total(stats.alphabet_size(site), size)
            })
            .sum()
    }

    /// Exact score change of moving one member from `from` to `to`, without touching the stats.
    pub fn move_delta(&self, stats: &ClusterStats, codes: &[u8], from: usize, to: usize) -> f64 {
        self.removal_delta(stats, codes, from) + self.insertion_delta(stats, codes, to)
    }

    /// Score change of merging clusters `a` and `b`.
    pub fn merge_delta(&self, stats: &ClusterStats, a: usize, b: usize) -> f64 {
        (0..stats.num_sites())
            .map(|site| {
                let (ca, cb) = (stats.counts(a, site), stats.counts(b, site));
                let merged: Vec<u32> = ca.iter().zip(cb).map(|(x, y)| x + y).collect();
                self.site_term(&merged) - self.site_term(ca) - self.site_term(cb)
            })
            .sum()
    }
}
