//! Flatten a [`Hierarchy`] into the per-level [`PartitionTable`] and its [`Diagnostics`].


use crate::config::Config;
use crate::hierarchy::{Hierarchy, Warning};
use crate::snp::SnpMatrix;
use crate::table::Table;
use color_eyre::eyre::{eyre, Report, Result};
use serde::{Deserialize, Serialize};

/// Written in place of the label of an unresolved level.
pub const SENTINEL: &str = "NA";

// ----------------------------------------------------------------------------
// PartitionTable
// ----------------------------------------------------------------------------

/// Cluster label of every sequence at every level, in input order.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PartitionTable {
    pub ids: Vec<String>,
    /// `labels[sequence][level - 1]`, `None` below the level where the lineage ended.
    pub labels: Vec<Vec<Option<usize>>>,
}

impl PartitionTable {
    pub fn num_levels(&self) -> usize {
        self.labels.first().map(Vec::len).unwrap_or_default()
    }

    /// Label of a sequence at a 1-based `level`.
    pub fn label(&self, sequence: usize, level: usize) -> Option<usize> {
        self.labels.get(sequence)?.get(level.checked_sub(1)?).copied().flatten()
    }

    /// Columns `id`, `level_1`, ..., with unresolved levels as [`SENTINEL`].
    pub fn to_table(&self) -> Result<Table<String>, Report> {
        let mut table = Table::new();
        table.headers = std::iter::once("id".to_string())
            .chain((1..=self.num_levels()).map(|level| format!("level_{level}")))
            .collect();
        for (id, labels) in self.ids.iter().zip(&self.labels) {
            let row = std::iter::once(id.clone())
                .chain(labels.iter().map(|label| match label {
                    Some(label) => label.to_string(),
                    None => SENTINEL.to_string(),
                }))
                .collect();
            table.add_row(row)?;
        }
        Ok(table)
    }
}

// ----------------------------------------------------------------------------
// Diagnostics
// ----------------------------------------------------------------------------

/// Search statistics of one hierarchy level.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LevelSummary {
    /// 1-based level.
    pub level: usize,
    pub clusters: usize,
    /// Summed over the nodes partitioned at this level.
    pub log_likelihood: f64,
    pub rounds: usize,
    /// Every search at this level converged.
    pub converged: bool,
    /// Number of sequences with a label at this level.
    pub resolved: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Diagnostics {
    pub levels: Vec<LevelSummary>,
    pub warnings: Vec<Warning>,
    /// The time budget cut the search short, the reported partitions are the best found.
    pub early_termination: bool,
    /// Seed the run can be reproduced with.
    pub seed: u64,
}

impl Diagnostics {
    /// Per-level summary, for logging as markdown.
    pub fn to_table(&self) -> Result<Table<String>, Report> {
        let mut table = Table::new();
        table.headers = ["level", "clusters", "log_likelihood", "rounds", "converged", "resolved"]
            .map(String::from)
            .to_vec();
        for level in &self.levels {
            table.add_row(vec![
                level.level.to_string(),
                level.clusters.to_string(),
                format!("{:.4}", level.log_likelihood),
                level.rounds.to_string(),
                level.converged.to_string(),
                level.resolved.to_string(),
            ])?;
        }
        Ok(table)
    }
}

// ----------------------------------------------------------------------------
// Clustering
// ----------------------------------------------------------------------------

/// Final output of a hierarchical clustering.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Clustering {
    pub table: PartitionTable,
    pub diagnostics: Diagnostics,
}

/// Assign level labels by walking the hierarchy depth-first, children in label order.
///
/// Labels are numbered consecutively within each level, in the order clusters are visited.
pub fn aggregate(
    matrix: &SnpMatrix,
    hierarchy: &Hierarchy,
    config: &Config,
    seed: u64,
) -> Result<Clustering, Report> {
    let depth = config.max_depth;
    let n = matrix.num_sequences();
    if hierarchy.graph[hierarchy.root].members.len() != n {
        return Err(eyre!(
            "Hierarchy covers {} sequences, the matrix has {n}.",
            hierarchy.graph[hierarchy.root].members.len()
        ));
    }

    let mut labels = vec![vec![None; depth]; n];
    let mut levels = (1..=depth)
        .map(|level| LevelSummary {
            level,
            clusters: 0,
            log_likelihood: 0.0,
            rounds: 0,
            converged: true,
            resolved: 0,
        })
        .collect::<Vec<_>>();

    let mut stack = vec![hierarchy.root];
    while let Some(index) = stack.pop() {
        let node = &hierarchy.graph[index];
        let summary = levels
            .get_mut(node.level)
            .ok_or_else(|| eyre!("Hierarchy node at level {} exceeds max_depth {depth}.", node.level))?;

        for members in node.cluster_members() {
            members.iter().for_each(|&m| labels[m][node.level] = Some(summary.clusters));
            summary.clusters += 1;
            summary.resolved += members.len();
        }
        summary.log_likelihood += node.log_likelihood;
        summary.rounds += node.rounds;
        summary.converged &= node.converged;

        // reversed, so the lowest label is visited next
        stack.extend(hierarchy.children(index).into_iter().rev().map(|(_label, child)| child));
    }

    // unreached levels are reported as not converged
    levels.iter_mut().filter(|level| level.clusters == 0).for_each(|level| level.converged = false);

    let diagnostics = Diagnostics {
        levels,
        warnings: hierarchy.warnings.clone(),
        early_termination: hierarchy.early_termination(),
        seed,
    };
    let table = PartitionTable { ids: matrix.ids().to_vec(), labels };
    Ok(Clustering { table, diagnostics })
}
