use crate::config::{Config, ConvergenceMode};
use crate::model::{ClusterStats, Likelihood, Partition};
use crate::optimizer::{Optimizer, Search, SearchState};
use crate::snp::SnpMatrix;
use color_eyre::eyre::{Report, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Noisy copies of `groups` distinct random haplotypes.
fn structured_matrix(groups: usize, per_group: usize, sites: usize, seed: u64) -> Result<SnpMatrix, Report> {
    let mut rng = StdRng::seed_from_u64(seed);
    let symbols = b"ACGT";
    let haplotypes: Vec<Vec<u8>> = (0..groups)
        .map(|_| (0..sites).map(|_| symbols[rng.gen_range(0..4)]).collect())
        .collect();
    let mut rows = Vec::new();
    for haplotype in &haplotypes {
        for _ in 0..per_group {
            let row = haplotype
                .iter()
                .map(|&s| if rng.gen_bool(0.05) { symbols[rng.gen_range(0..4)] } else { s })
                .collect();
            rows.push(row);
        }
    }
    let ids = (0..rows.len()).map(|i| format!("seq{i}")).collect();
    SnpMatrix::new(ids, (1..=sites).collect(), rows)
}

fn one_site(symbols: &[u8]) -> Result<SnpMatrix, Report> {
    let ids = (0..symbols.len()).map(|i| format!("s{i}")).collect();
    let rows = symbols.iter().map(|&s| vec![s]).collect();
    SnpMatrix::new(ids, vec![1], rows)
}

#[test]
fn one_site_bipartition() -> Result<(), Report> {
    let matrix = one_site(b"AACACCAC")?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    let result = Optimizer::new(&Config::default(), None).optimize(&sub, &model, 3)?;

    assert_eq!(result.partition.num_clusters(), 2);
    assert!(result.converged);
    assert_eq!(result.state, SearchState::Terminal);
    // members sharing a symbol share a cluster
    let labels = result.partition.labels();
    for (a, b) in (0..8).flat_map(|a| (0..8).map(move |b| (a, b))) {
        let same_symbol = matrix.row(a) == matrix.row(b);
        assert_eq!(labels[a] == labels[b], same_symbol);
    }
    Ok(())
}

#[test]
fn degenerate_input_is_one_cluster() -> Result<(), Report> {
    let matrix = one_site(b"AAAA")?;
    let sub = matrix.view()?;
    assert!(sub.is_degenerate());
    let model = Likelihood::new(1.0, &sub)?;
    let result = Optimizer::new(&Config::default(), None).optimize(&sub, &model, 1)?;

    assert_eq!(result.partition, Partition::single(4));
    assert_eq!(result.rounds, 0);
    assert!(result.converged);
    assert_eq!(result.log_likelihood, 0.0);
    Ok(())
}

#[test]
fn recovers_planted_groups() -> Result<(), Report> {
    let matrix = structured_matrix(3, 10, 40, 17)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    let result = Optimizer::new(&Config::default(), None).optimize(&sub, &model, 99)?;

    assert_eq!(result.partition.num_clusters(), 3);
    let labels = result.partition.labels();
    for group in 0..3 {
        let first = labels[group * 10];
        assert!(labels[group * 10..(group + 1) * 10].iter().all(|&l| l == first));
    }
    Ok(())
}

#[test]
fn converged_search_is_stable() -> Result<(), Report> {
    let matrix = structured_matrix(4, 6, 25, 5)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    let config = Config::default();
    let result = Optimizer::new(&config, None).optimize(&sub, &model, 8)?;

    let mut search = Search::new(&sub, &model, result.partition.clone(), config.max_clusters_per_level)?;
    assert_eq!(search.state(), SearchState::Initialized);
    assert!((search.score() - result.log_likelihood).abs() < 1e-6);

    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(search.sweep(&mut rng), 0);
    assert_eq!(search.partition(), &result.partition);
    Ok(())
}

#[test]
fn sweep_keeps_stats_consistent() -> Result<(), Report> {
    let matrix = structured_matrix(3, 8, 30, 12)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(0.5, &sub)?;
    let mut rng = StdRng::seed_from_u64(4);

    let mut search = Search::random(&sub, &model, 6, &mut rng)?;
    for _ in 0..5 {
        let before = search.score();
        search.sweep(&mut rng);
        assert!(search.score() >= before - 1e-9);
        assert!(search.stats().is_consistent(sub.len()));
        assert_eq!(search.stats(), &ClusterStats::count(search.partition(), &sub)?);
        assert!((search.score() - model.score(search.stats())).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn max_clusters_is_respected() -> Result<(), Report> {
    let matrix = structured_matrix(6, 4, 30, 31)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    for max_clusters in [1, 2, 3] {
        let config = Config { max_clusters_per_level: max_clusters, ..Default::default() };
        let result = Optimizer::new(&config, None).optimize(&sub, &model, 2)?;
        assert!(result.partition.num_clusters() <= max_clusters);
    }
    Ok(())
}

#[test]
fn fixed_rounds_stops_early() -> Result<(), Report> {
    let matrix = structured_matrix(3, 10, 20, 8)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    let config = Config { convergence_mode: ConvergenceMode::FixedRounds, max_rounds: 1, ..Default::default() };
    let result = Optimizer::new(&config, None).optimize(&sub, &model, 2)?;
    assert_eq!(result.rounds, 1);
    assert!(!result.interrupted);
    Ok(())
}

#[test]
fn expired_deadline_interrupts() -> Result<(), Report> {
    let matrix = structured_matrix(2, 5, 10, 1)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    let deadline = Instant::now() - Duration::from_millis(1);
    let result = Optimizer::new(&Config::default(), Some(deadline)).optimize(&sub, &model, 2)?;
    assert!(result.interrupted);
    assert!(!result.converged);
    assert_eq!(result.rounds, 0);
    Ok(())
}

#[test]
fn thread_count_does_not_change_result() -> Result<(), Report> {
    let matrix = structured_matrix(4, 5, 30, 77)?;
    let sub = matrix.view()?;
    let model = Likelihood::new(1.0, &sub)?;
    let optimizer = Optimizer::new(&Config::default(), None);

    let mut results = Vec::new();
    for threads in [1, 4] {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        results.push(pool.install(|| optimizer.optimize(&sub, &model, 123))?);
    }
    assert_eq!(results[0].partition, results[1].partition);
    assert_eq!(results[0].restart, results[1].restart);
    assert_eq!(results[0].log_likelihood, results[1].log_likelihood);
    Ok(())
}
