//! Run hierarchical clustering on an input alignment.


use crate::config::Config;
use crate::hierarchy::Hierarchy;
use crate::report::{aggregate, Clustering};
use crate::sequence::read_alignment;
use crate::snp::SnpMatrix;
use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use color_eyre::Help;
use indoc::formatdoc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Cluster a SNP matrix, drawing a seed if the config has none.
///
/// ```rust
/// use hierbaps::{cluster, Config, SnpMatrix};
/// let rows = ["AA", "AA", "AC", "CC", "CC", "CC"].iter().map(|s| s.as_bytes().to_vec()).collect();
/// let ids = (0..6).map(|i| format!("s{i}")).collect();
/// let matrix = SnpMatrix::new(ids, vec![1, 2], rows)?;
///
/// let config = Config { random_seed: Some(7), ..Default::default() };
/// let clustering = cluster(&matrix, &config)?;
/// assert_eq!(clustering.table.ids, matrix.ids());
/// assert_eq!(clustering.diagnostics.seed, 7);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn cluster(matrix: &SnpMatrix, config: &Config) -> Result<Clustering, Report> {
    let (_hierarchy, clustering) = search(matrix, config)?;
    Ok(clustering)
}

fn search(matrix: &SnpMatrix, config: &Config) -> Result<(Hierarchy, Clustering), Report> {
    config.validate()?;
    let seed = match config.random_seed {
        Some(seed) => seed,
        None => {
            let seed = StdRng::from_entropy().gen::<u64>();
            info!("No random seed provided, using: {seed}");
            seed
        }
    };
    let hierarchy = Hierarchy::build(matrix, config, seed)?;
    let clustering = aggregate(matrix, &hierarchy, config, seed)?;
    Ok((hierarchy, clustering))
}

/// Cluster the sequences of an alignment and write all outputs to the output directory.
pub fn run(args: &RunArgs) -> Result<Clustering, Report> {
    // fail on bad options before reading any input
    args.config.validate()?;

    info!("Reading alignment: {:?}", args.alignment);
    let records = read_alignment(&args.alignment)?;
    let matrix = SnpMatrix::from_alignment(&records)
        .wrap_err_with(|| format!("Failed to extract SNPs from alignment: {:?}", args.alignment))?;
    info!("Found {} sequences and {} variable sites.", matrix.num_sequences(), matrix.num_sites());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .wrap_err("Failed to create thread pool.")
        .suggestion("Try a smaller number of --threads.")?;
    debug!("Using {} threads.", pool.current_num_threads());

    let (hierarchy, clustering) = pool.install(|| search(&matrix, &args.config))?;
    info!("Summary:\n{}", clustering.diagnostics.to_table()?.to_markdown());
    if clustering.diagnostics.early_termination {
        warn!("Time budget exceeded, reporting the best partitions found so far.");
    }

    let output_dir = &args.output_dir;
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory: {output_dir:?}"))?;

    let path = output_dir.join("partition.tsv");
    info!("Writing partition table: {path:?}");
    clustering.table.to_table()?.write(&path)?;

    let path = output_dir.join("diagnostics.json");
    info!("Writing diagnostics: {path:?}");
    let output = serde_json::to_string_pretty(&clustering.diagnostics)
        .wrap_err("Failed to serialize diagnostics.")?;
    std::fs::write(&path, output).wrap_err_with(|| format!("Failed to write file: {path:?}"))?;

    let path = output_dir.join("hierarchy.dot");
    info!("Writing hierarchy: {path:?}");
    std::fs::write(&path, hierarchy.to_dot())
        .wrap_err_with(|| format!("Failed to write file: {path:?}"))?;

    // record the seed actually used
    let mut run_args = args.clone();
    run_args.config.random_seed = Some(clustering.diagnostics.seed);
    run_args.write(&output_dir.join("run_args.json"))?;

    let levels = &clustering.diagnostics.levels;
    info!(
        "{}",
        formatdoc!(
            "Done.
            Levels resolved: {resolved}/{total}
            Warnings: {warnings}
            Outputs: {output_dir:?}",
            resolved = levels.iter().filter(|level| level.clusters > 0).count(),
            total = levels.len(),
            warnings = clustering.diagnostics.warnings.len(),
            output_dir = output_dir,
        )
    );
    Ok(clustering)
}

// ----------------------------------------------------------------------------
// RunArgs
// ----------------------------------------------------------------------------

/// Cluster the sequences of an alignment into a hierarchy of populations.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[serde(default)]
pub struct RunArgs {
    /// Input fasta alignment (optionally .zst compressed).
    #[clap(short = 'a', long, required = true)]
    pub alignment: PathBuf,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[clap(short = 'o', long, required = true)]
    pub output_dir: PathBuf,

    #[clap(flatten)]
    #[serde(flatten)]
    pub config: Config,

    /// Number of CPU threads to use.
    #[clap(short = 't', long, default_value_t = RunArgs::default().threads)]
    #[serde(skip)]
    pub threads: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        RunArgs {
            alignment: PathBuf::new(),
            output_dir: PathBuf::new(),
            config: Config::default(),
            threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

impl RunArgs {
    /// Reads [`RunArgs`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<RunArgs, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read run arguments: {path:?}."))?;
        let run_args = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize run arguments: {input}"))?;
        Ok(run_args)
    }

    /// Write [`RunArgs`] to a JSON file.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use hierbaps::RunArgs;
    /// let dir = tempfile::tempdir()?;
    /// let path = dir.path().join("run_args.json");
    /// RunArgs::default().write(&path)?;
    /// assert_eq!(RunArgs::read(&path)?.config, RunArgs::default().config);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize run arguments: {self:?}"))?;
        std::fs::write(path, output)
            .wrap_err(format!("Failed to write run arguments: {path:?}"))?;
        Ok(())
    }
}
