//! Allele count model: [partitions](Partition) of sub-alignment members and the per-cluster
//! [allele counts](ClusterStats) that are the sufficient statistic of the [likelihood](Likelihood).

pub mod likelihood;


#[doc(inline)]
pub use likelihood::Likelihood;

use crate::snp::{InputError, SubAlignment};
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Partition
// ----------------------------------------------------------------------------

/// Assignment of every member to exactly one cluster.
///
/// Labels are always `0..K`, with no empty cluster.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Partition {
    labels: Vec<usize>,
    sizes: Vec<usize>,
}

impl Partition {
    /// Create a partition from arbitrary labels, normalized by rank of the label value.
    ///
    /// ```rust
    /// use hierbaps::Partition;
    /// let partition = Partition::new(vec![7, 3, 7, 10])?;
    /// assert_eq!(partition.labels(), [1, 0, 1, 2]);
    /// assert_eq!(partition.sizes(), [1, 2, 1]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(labels: Vec<usize>) -> Result<Self, Report> {
        if labels.is_empty() {
            return Err(Report::new(InputError::Empty));
        }
        let ranks = labels.iter().copied().unique().sorted().collect_vec();
        let labels = labels
            .into_iter()
            .map(|l| ranks.binary_search(&l).unwrap_or_default())
            .collect_vec();
        let mut sizes = vec![0; ranks.len()];
        labels.iter().for_each(|&l| sizes[l] += 1);
        Ok(Partition { labels, sizes })
    }

    /// All members in one cluster.
    pub fn single(n: usize) -> Self {
        Partition { labels: vec![0; n], sizes: vec![n] }
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, member: usize) -> usize {
        self.labels[member]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_clusters(&self) -> usize {
        self.sizes.len()
    }

    /// Local member indices of cluster `k`, ascending.
    pub fn members(&self, k: usize) -> Vec<usize> {
        self.labels.iter().positions(|&l| l == k).collect()
    }

    /// Members of every cluster, indexed by label.
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); self.num_clusters()];
        self.labels.iter().enumerate().for_each(|(m, &l)| clusters[l].push(m));
        clusters
    }

    /// Reassign a member, `to == num_clusters()` opens a new cluster.
    ///
    /// The source cluster may be left empty, see [`Partition::remove_cluster`].
    pub(crate) fn assign(&mut self, member: usize, to: usize) {
        if to == self.sizes.len() {
            self.sizes.push(0);
        }
        self.sizes[self.labels[member]] -= 1;
        self.sizes[to] += 1;
        self.labels[member] = to;
    }

    /// Move every member of cluster `from` into `into`, leaving `from` empty.
    pub(crate) fn relabel(&mut self, from: usize, into: usize) {
        self.labels.iter_mut().filter(|l| **l == from).for_each(|l| *l = into);
        self.sizes[into] += self.sizes[from];
        self.sizes[from] = 0;
    }

    /// Drop the empty cluster `k`; the last cluster takes over its label.
    pub(crate) fn remove_cluster(&mut self, k: usize) {
        debug_assert_eq!(self.sizes[k], 0);
        let last = self.sizes.len() - 1;
        self.sizes.swap_remove(k);
        if k != last {
            self.labels.iter_mut().filter(|l| **l == last).for_each(|l| *l = k);
        }
    }
}

// ----------------------------------------------------------------------------
// ClusterStats
// ----------------------------------------------------------------------------

/// Allele counts per cluster and site.
///
/// Each cluster owns one flat row, the concatenation of its per-site count vectors; rows are
/// indexed by the normalized cluster label.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterStats {
    /// Start of each site's counts within a row, plus the total row width.
    offsets: Vec<usize>,
    /// Alphabet size of each site.
    alphabets: Vec<usize>,
    rows: Vec<Vec<u32>>,
    sizes: Vec<usize>,
}

impl ClusterStats {
    /// Count alleles from scratch.
    pub fn count(partition: &Partition, sub: &SubAlignment) -> Result<Self, Report> {
        if partition.len() != sub.len() {
            return Err(Report::new(InputError::PartitionSizeMismatch {
                expected: sub.len(),
                found: partition.len(),
            }));
        }

        let alphabets = sub.sites().iter().map(|s| s.alphabet.len()).collect_vec();
        let mut offsets = Vec::with_capacity(alphabets.len() + 1);
        let mut width = 0;
        for size in &alphabets {
            offsets.push(width);
            width += size;
        }
        offsets.push(width);

        let mut stats = ClusterStats {
            offsets,
            alphabets,
            rows: vec![vec![0; width]; partition.num_clusters()],
            sizes: partition.sizes().to_vec(),
        };
        for member in 0..sub.len() {
            stats.add(sub.codes(member), partition.label(member));
        }
        Ok(stats)
    }

    fn add(&mut self, codes: &[u8], k: usize) {
        let row = &mut self.rows[k];
        codes.iter().zip(&self.offsets).for_each(|(&c, &o)| row[o + c as usize] += 1);
    }

    fn subtract(&mut self, codes: &[u8], k: usize) {
        let row = &mut self.rows[k];
        codes.iter().zip(&self.offsets).for_each(|(&c, &o)| row[o + c as usize] -= 1);
    }

    pub fn num_clusters(&self) -> usize {
        self.rows.len()
    }

    pub fn num_sites(&self) -> usize {
        self.alphabets.len()
    }

    pub fn size(&self, k: usize) -> usize {
        self.sizes[k]
    }

    pub fn alphabet_size(&self, site: usize) -> usize {
        self.alphabets[site]
    }

    /// Count vector of cluster `k` at `site`.
    pub fn counts(&self, k: usize, site: usize) -> &[u32] {
        &self.rows[k][self.offsets[site]..self.offsets[site + 1]]
    }

    /// Count of allele `code` in cluster `k` at `site`.
    pub fn count_of(&self, k: usize, site: usize, code: u8) -> u32 {
        self.rows[k][self.offsets[site] + code as usize]
    }

    /// Counts at `site` summed over all clusters.
    pub fn site_totals(&self, site: usize) -> Vec<u32> {
        let range = self.offsets[site]..self.offsets[site + 1];
        self.rows.iter().fold(vec![0; range.len()], |mut totals, row| {
            totals.iter_mut().zip(&row[range.clone()]).for_each(|(t, c)| *t += c);
            totals
        })
    }

    /// Every site's counts, summed over clusters, account for all `n` members.
    pub fn is_consistent(&self, n: usize) -> bool {
        self.sizes.iter().sum::<usize>() == n
            && (0..self.num_sites()).all(|s| self.site_totals(s).iter().sum::<u32>() as usize == n)
            && (0..self.num_clusters())
                .all(|k| (0..self.num_sites()).all(|s| self.counts(k, s).iter().sum::<u32>() as usize == self.sizes[k]))
    }

    /// Incremental update for one member moving between clusters, touching only the two rows.
    ///
    /// `to == num_clusters()` opens a new row. The source row may be left empty, see
    /// [`ClusterStats::remove_cluster`].
    pub fn move_member(&mut self, codes: &[u8], from: usize, to: usize) {
        if to == self.rows.len() {
            let width = self.offsets[self.offsets.len() - 1];
            self.rows.push(vec![0; width]);
            self.sizes.push(0);
        }
        self.subtract(codes, from);
        self.add(codes, to);
        self.sizes[from] -= 1;
        self.sizes[to] += 1;
    }

    /// Fold the counts of cluster `from` into `into`, leaving `from` empty.
    pub fn merge(&mut self, into: usize, from: usize) {
        let source = std::mem::take(&mut self.rows[from]);
        self.rows[into].iter_mut().zip(&source).for_each(|(a, b)| *a += b);
        self.rows[from] = vec![0; source.len()];
        self.sizes[into] += self.sizes[from];
        self.sizes[from] = 0;
    }

    /// Drop the empty row `k` with the same swap-remove rule as [`Partition::remove_cluster`].
    pub fn remove_cluster(&mut self, k: usize) {
        debug_assert_eq!(self.sizes[k], 0);
        self.rows.swap_remove(k);
        self.sizes.swap_remove(k);
    }
}
