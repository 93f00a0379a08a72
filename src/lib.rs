//! `hierbaps` clusters aligned sequences into a **hierarchy of populations**.
//!
//! Sequences are reduced to their variable (SNP) columns and partitioned by maximizing the
//! marginal likelihood of a Dirichlet-multinomial model of allele counts, with frequencies
//! integrated out. Every cluster found is then clustered again on the sites that still vary
//! within it, down to a fixed number of levels.
//!
//! ## Workflow
//!
//! 1. [Read](sequence::read_alignment) a FASTA alignment and extract its [SNP matrix](SnpMatrix).
//! 1. Search the best [partition](Partition) of the sequences with a
//!    [multi-restart local search](Optimizer), scored by the [likelihood](Likelihood) of the
//!    per-cluster [allele counts](ClusterStats).
//! 1. Recurse into each cluster to build the [hierarchy](hierarchy::Hierarchy).
//! 1. Flatten the hierarchy into a [partition table](report::PartitionTable) with one column per
//!    level, plus [diagnostics](report::Diagnostics).
//!
//! ```rust
//! use hierbaps::{cluster, sequence::Record, Config, SnpMatrix};
//!
//! let records = vec![
//!     Record::new("s1", b"ACGTACGT"),
//!     Record::new("s2", b"ACGTACGT"),
//!     Record::new("s3", b"ACGTACGA"),
//!     Record::new("s4", b"TCCTACGA"),
//!     Record::new("s5", b"TCCTACGA"),
//! ];
//! let matrix = SnpMatrix::from_alignment(&records)?;
//! let config = Config { random_seed: Some(1), ..Default::default() };
//! let clustering = cluster(&matrix, &config)?;
//!
//! println!("{}", clustering.table.to_table()?.to_markdown());
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

pub mod cli;
pub mod config;
pub mod hierarchy;
pub mod model;
pub mod optimizer;
pub mod report;
pub mod run;
pub mod sequence;
pub mod snp;
pub mod table;
pub mod utils;

#[doc(inline)]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::config::{Config, ConvergenceMode};
#[doc(inline)]
pub use crate::model::{ClusterStats, Likelihood, Partition};
#[doc(inline)]
pub use crate::optimizer::Optimizer;
#[doc(inline)]
pub use crate::run::{cluster, run, RunArgs};
#[doc(inline)]
pub use crate::snp::{InputError, SnpMatrix, SubAlignment};
#[doc(inline)]
pub use table::Table;
#[doc(inline)]
pub use utils::verbosity::Verbosity;
