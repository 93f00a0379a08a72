//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::{RunArgs, Verbosity};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function. This is achieved with the `parse` function, which parses the command line arguments from [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = hierbaps::Cli::parse();
/// ```
/// The command-line arguments from `std::env::args` are simply a vector of space separated strings. Here is a manual example of setting the command-line input:
/// ```rust
/// # use clap::Parser;
/// let input = ["hierbaps", "run", "--alignment", "alignment.fasta", "--output-dir", "output", "--max-depth", "3"];
/// let args = hierbaps::Cli::parse_from(input);
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
/// With the following (abbreviated) pretty JSON representation:
/// ```json
/// {
///   "command": {
///     "Run": {
///       "alignment": "alignment.fasta",
///       "output_dir": "output",
///       "max_depth": 3,
///       "max_clusters_per_level": 20,
///       "min_cluster_size": 5,
///       "num_restarts": 10,
///       ...
///     }
///   },
///   "verbosity": "Info"
/// }
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "hierbaps", author, version)]
#[clap(about = "hierbaps clusters aligned sequences into a hierarchy of populations.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [run](crate::run::run) pipeline.
    /// ## Examples
    /// ```rust
    /// use hierbaps::{Cli, cli::Command};
    /// use clap::Parser;
    /// let input = ["hierbaps", "run", "-a", "alignment.fasta", "-o", "output", "-v", "debug"];
    /// let args = Cli::parse_from(input);
    /// match args.command {
    ///     Command::Run(run_args) => assert_eq!(run_args.config.max_depth, 2),
    /// }
    /// ```
    #[clap(about = "Cluster an alignment into a hierarchy of populations.")]
    Run(RunArgs),
}
