//! Recursive clustering of clusters into a [`Hierarchy`].


use crate::config::Config;
use crate::model::{Likelihood, Partition};
use crate::optimizer::Optimizer;
use crate::snp::{SnpMatrix, SubAlignment};
use crate::utils::mix_seed;
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use petgraph::dot::Dot;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ----------------------------------------------------------------------------
// Warning
// ----------------------------------------------------------------------------

/// Non-fatal condition that ended a branch of the recursion early.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Warning {
    /// No site varies among the members of a cluster.
    DegenerateInput { level: usize, members: usize },
    /// The sub-alignment is larger than the configured `max_cells`.
    ResourceExhaustion { level: usize, members: usize, cells: usize, max_cells: usize },
    /// The time budget ran out before the cluster was searched.
    TimeBudgetExceeded { level: usize, members: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DegenerateInput { level, members } => {
                write!(f, "level {level}: no variable sites among {members} sequences")
            }
            Warning::ResourceExhaustion { level, members, cells, max_cells } => write!(
                f,
                "level {level}: {members} sequences span {cells} cells, more than max_cells {max_cells}"
            ),
            Warning::TimeBudgetExceeded { level, members } => {
                write!(f, "level {level}: time budget exceeded before searching {members} sequences")
            }
        }
    }
}

// ----------------------------------------------------------------------------
// HierarchyNode
// ----------------------------------------------------------------------------

/// A searched cluster and the partition of its members.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HierarchyNode {
    /// Depth in the hierarchy, the root is level 0.
    pub level: usize,
    /// Label of this cluster in the parent partition, `None` for the root.
    pub label: Option<usize>,
    /// Global sequence indices, ascending.
    pub members: Vec<usize>,
    /// Partition of `members` (by local index) into child clusters.
    pub partition: Partition,
    pub log_likelihood: f64,
    pub rounds: usize,
    pub converged: bool,
    pub interrupted: bool,
}

impl HierarchyNode {
    /// Node whose members all stay in one cluster, without search.
    fn unsplit(task: &Task, converged: bool, interrupted: bool) -> Self {
        HierarchyNode {
            level: task.level,
            label: task.label,
            members: task.members.clone(),
            partition: Partition::single(task.members.len()),
            log_likelihood: 0.0,
            rounds: 0,
            converged,
            interrupted,
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.partition.num_clusters()
    }

    /// Global sequence indices of each child cluster, indexed by label.
    pub fn cluster_members(&self) -> Vec<Vec<usize>> {
        self.partition
            .clusters()
            .into_iter()
            .map(|cluster| cluster.into_iter().map(|m| self.members[m]).collect())
            .collect()
    }
}

impl fmt::Display for HierarchyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.label {
            Some(label) => format!("cluster {label}"),
            None => "root".to_string(),
        };
        write!(
            f,
            "{name} (level {}): {} sequences, {} clusters",
            self.level,
            self.members.len(),
            self.num_clusters()
        )
    }
}

// ----------------------------------------------------------------------------
// Task
// ----------------------------------------------------------------------------

/// A cluster waiting to be searched.
#[derive(Clone, Debug)]
struct Task {
    parent: Option<NodeIndex>,
    label: Option<usize>,
    level: usize,
    members: Vec<usize>,
}

impl Task {
    /// Seed depending only on the task itself, not on scheduling.
    fn seed(&self, base: u64) -> u64 {
        let first = self.members.first().copied().unwrap_or_default() as u64;
        mix_seed(base, ((self.level as u64) << 32) | first)
    }
}

// ----------------------------------------------------------------------------
// Hierarchy
// ----------------------------------------------------------------------------

/// Tree of searched clusters, rooted at the cluster of all sequences.
///
/// Edges point from parent to child and are weighted by the child's label in the parent
/// partition. Clusters that were not recursed into, or that showed no further structure, only
/// exist as labels of their parent.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    pub graph: Graph<HierarchyNode, usize>,
    pub root: NodeIndex,
    pub warnings: Vec<Warning>,
}

impl Hierarchy {
    /// Cluster `matrix` recursively, breadth-first.
    ///
    /// Every generation of queued clusters is searched in parallel, then attached to the graph
    /// in queue order.
    ///
    /// ```rust
    /// use hierbaps::{hierarchy::Hierarchy, Config, SnpMatrix};
    /// let rows = ["AA", "AA", "AA", "CC", "CC", "CC"].iter().map(|s| s.as_bytes().to_vec()).collect();
    /// let ids = (0..6).map(|i| format!("s{i}")).collect();
    /// let matrix = SnpMatrix::new(ids, vec![3, 8], rows)?;
    ///
    /// let hierarchy = Hierarchy::build(&matrix, &Config::default(), 1)?;
    /// assert_eq!(hierarchy.graph[hierarchy.root].num_clusters(), 2);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn build(matrix: &SnpMatrix, config: &Config, seed: u64) -> Result<Hierarchy, Report> {
        config.validate()?;
        let deadline = config.deadline(Instant::now());
        let optimizer = Optimizer::new(config, deadline);

        let mut graph = Graph::new();
        let mut root = None;
        let mut warnings = Vec::new();

        let mut queue = vec![Task {
            parent: None,
            label: None,
            level: 0,
            members: (0..matrix.num_sequences()).collect(),
        }];

        while !queue.is_empty() {
            debug!("Searching {} clusters at level {}.", queue.len(), queue[0].level);
            let resolved = queue
                .par_iter()
                .map(|task| resolve(matrix, config, &optimizer, deadline, seed, task))
                .collect::<Result<Vec<_>, Report>>()?;

            let mut next = Vec::new();
            for (task, (node, warning)) in queue.into_iter().zip(resolved) {
                let stopped = warning.is_some();
                if let Some(warning) = warning {
                    warn!("{warning}");
                    warnings.push(warning);
                }
                let unsplit = stopped || node.num_clusters() < 2;
                // the root is always kept, so that it defines the first level
                if task.parent.is_some() && unsplit {
                    debug!("Pruned {node}");
                    continue;
                }

                debug!("Resolved {node}");
                let index = graph.add_node(node);
                match (task.parent, task.label) {
                    (Some(parent), Some(label)) => {
                        graph.add_edge(parent, index, label);
                    }
                    _ => root = Some(index),
                }

                // a single cluster holds the same members as its node
                let level = task.level + 1;
                if unsplit || level >= config.max_depth {
                    continue;
                }
                let clusters = graph[index].cluster_members().into_iter().enumerate();
                for (label, members) in clusters {
                    if members.len() >= config.min_cluster_size {
                        next.push(Task { parent: Some(index), label: Some(label), level, members });
                    }
                }
            }
            queue = next;
        }

        let root = root.ok_or_else(|| Report::new(crate::snp::InputError::Empty))?;
        info!("Hierarchy complete: {} nodes, {} warnings.", graph.node_count(), warnings.len());
        Ok(Hierarchy { graph, root, warnings })
    }

    /// Child nodes, ordered by label.
    pub fn children(&self, node: NodeIndex) -> Vec<(usize, NodeIndex)> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .sorted()
            .collect()
    }

    /// Number of levels with at least one node.
    pub fn depth(&self) -> usize {
        self.graph.node_weights().map(|node| node.level + 1).max().unwrap_or_default()
    }

    /// The time budget stopped part of the search.
    pub fn early_termination(&self) -> bool {
        self.graph.node_weights().any(|node| node.interrupted)
            || self.warnings.iter().any(|w| matches!(w, Warning::TimeBudgetExceeded { .. }))
    }

    /// Graphviz rendering, labelling edges with the cluster label.
    pub fn to_dot(&self) -> String {
        let output = format!("{}", Dot::new(&self.graph));
        // set graph id (for cytoscape) and a left to right layout
        output.replacen("digraph {", "digraph G {\n    rankdir=\"LR\";", 1)
    }
}

/// Search one cluster.
///
/// Returns the node it produced and the warning that stopped it early, if any. Stopped clusters
/// keep all members together.
fn resolve(
    matrix: &SnpMatrix,
    config: &Config,
    optimizer: &Optimizer,
    deadline: Option<Instant>,
    seed: u64,
    task: &Task,
) -> Result<(HierarchyNode, Option<Warning>), Report> {
    let (level, members) = (task.level, task.members.len());
    let sub = SubAlignment::new(matrix, task.members.clone())?;

    if sub.is_degenerate() {
        let warning = Warning::DegenerateInput { level, members };
        return Ok((HierarchyNode::unsplit(task, true, false), Some(warning)));
    }
    if let Some(max_cells) = config.max_cells {
        if sub.cells() > max_cells {
            let warning = Warning::ResourceExhaustion { level, members, cells: sub.cells(), max_cells };
            return Ok((HierarchyNode::unsplit(task, false, false), Some(warning)));
        }
    }
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        let warning = Warning::TimeBudgetExceeded { level, members };
        return Ok((HierarchyNode::unsplit(task, false, true), Some(warning)));
    }

    let model = Likelihood::new(config.dirichlet_concentration, &sub)?;
    let result = optimizer.optimize(&sub, &model, task.seed(seed))?;
    debug!(
        "Level {level}, {members} sequences, {} sites: {} clusters from restart {}.",
        sub.num_sites(),
        result.partition.num_clusters(),
        result.restart
    );

    let node = HierarchyNode {
        level,
        label: task.label,
        members: task.members.clone(),
        partition: result.partition,
        log_likelihood: result.log_likelihood,
        rounds: result.rounds,
        converged: result.converged,
        interrupted: result.interrupted,
    };
    Ok((node, None))
}
