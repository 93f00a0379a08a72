//! Clustering [configuration](Config).

#[cfg(test)]
mod tests;

use clap::{Args, ValueEnum};
use color_eyre::eyre::{Report, Result};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

// ----------------------------------------------------------------------------
// ConvergenceMode
// ----------------------------------------------------------------------------

/// When the optimizer stops sweeping.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize, ValueEnum, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ConvergenceMode {
    /// Stop after `max_rounds` sweeps, even if moves were still accepted.
    FixedRounds,
    /// Sweep until a sweep accepts no move.
    #[default]
    UntilLocalOptimum,
}

// ----------------------------------------------------------------------------
// ConfigError
// ----------------------------------------------------------------------------

/// An invalid configuration value.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigError {
    pub name: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameter '{}': {}", self.name, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ----------------------------------------------------------------------------
// Config
// ----------------------------------------------------------------------------

/// Options of the hierarchical clustering.
///
/// ```rust
/// use hierbaps::Config;
/// let config = Config { max_depth: 3, random_seed: Some(1), ..Default::default() };
/// config.validate()?;
/// assert!(Config { num_restarts: 0, ..Default::default() }.validate().is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Args, Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of hierarchy levels.
    #[clap(long, default_value_t = Config::default().max_depth)]
    pub max_depth: usize,

    /// Maximum number of clusters the optimizer may create at any level.
    #[clap(long, default_value_t = Config::default().max_clusters_per_level)]
    pub max_clusters_per_level: usize,

    /// Minimum cluster size for recursing into a cluster.
    #[clap(long, default_value_t = Config::default().min_cluster_size)]
    pub min_cluster_size: usize,

    /// Number of independent random restarts of the optimizer.
    #[clap(long, default_value_t = Config::default().num_restarts)]
    pub num_restarts: usize,

    /// Symmetric Dirichlet prior concentration.
    #[clap(long, default_value_t = Config::default().dirichlet_concentration)]
    pub dirichlet_concentration: f64,

    /// Random seed, for reproducible runs.
    ///
    /// If not set, a seed is drawn and reported in the diagnostics.
    #[clap(long)]
    pub random_seed: Option<u64>,

    /// Optimizer stopping rule.
    #[clap(long, value_enum, default_value_t = Config::default().convergence_mode)]
    pub convergence_mode: ConvergenceMode,

    /// Maximum number of sweeps for --convergence-mode fixed-rounds.
    #[clap(long, default_value_t = Config::default().max_rounds)]
    pub max_rounds: usize,

    /// Global time budget in seconds.
    ///
    /// When exceeded, the best partitions found so far are reported.
    #[clap(long)]
    pub time_budget_secs: Option<f64>,

    /// Largest sub-alignment (members x variable sites) to search.
    #[clap(long)]
    pub max_cells: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: 2,
            max_clusters_per_level: 20,
            min_cluster_size: 5,
            num_restarts: 10,
            dirichlet_concentration: 1.0,
            random_seed: None,
            convergence_mode: ConvergenceMode::default(),
            max_rounds: 50,
            time_budget_secs: None,
            max_cells: None,
        }
    }
}

impl Config {
    /// Check every option, before any search begins.
    pub fn validate(&self) -> Result<(), Report> {
        let invalid = |name: &'static str, message: &str| -> Result<(), Report> {
            Err(Report::new(ConfigError { name, message: message.to_string() }))
        };

        if self.max_depth < 1 {
            return invalid("max_depth", "must be at least 1");
        }
        if self.max_clusters_per_level < 1 {
            return invalid("max_clusters_per_level", "must be at least 1");
        }
        if self.min_cluster_size < 1 {
            return invalid("min_cluster_size", "must be at least 1");
        }
        if self.num_restarts < 1 {
            return invalid("num_restarts", "must be at least 1");
        }
        if !(self.dirichlet_concentration.is_finite() && self.dirichlet_concentration > 0.0) {
            return invalid("dirichlet_concentration", "must be a positive number")
                .suggestion("Small values such as 1.0 represent a weak prior.");
        }
        if self.convergence_mode == ConvergenceMode::FixedRounds && self.max_rounds < 1 {
            return invalid("max_rounds", "must be at least 1 with fixed-rounds convergence");
        }
        if let Some(budget) = self.time_budget_secs {
            if !(budget.is_finite() && budget >= 0.0) {
                return invalid("time_budget_secs", "must be a non-negative number of seconds");
            }
            if Duration::try_from_secs_f64(budget).is_err() {
                return invalid("time_budget_secs", "is too large to represent as a duration")
                    .suggestion("Leave the time budget unset to search without a deadline.");
            }
        }
        Ok(())
    }

    /// Sweep limit implied by the convergence mode.
    pub fn round_limit(&self) -> Option<usize> {
        match self.convergence_mode {
            ConvergenceMode::FixedRounds => Some(self.max_rounds),
            ConvergenceMode::UntilLocalOptimum => None,
        }
    }

    /// Point in time after which no more search is started.
    ///
    /// A budget reaching past the clock's range means no deadline.
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        let budget = Duration::try_from_secs_f64(self.time_budget_secs?).ok()?;
        start.checked_add(budget)
    }
}
