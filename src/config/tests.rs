use crate::config::{Config, ConfigError, ConvergenceMode};
use color_eyre::eyre::{Report, Result};
use std::time::{Duration, Instant};

#[test]
fn defaults_are_valid() -> Result<(), Report> {
    let config = Config::default();
    config.validate()?;
    assert_eq!(config.max_depth, 2);
    assert_eq!(config.max_clusters_per_level, 20);
    assert!(config.num_restarts >= 10);
    assert_eq!(config.round_limit(), None);
    assert_eq!(config.deadline(Instant::now()), None);
    Ok(())
}

#[test]
fn invalid_values_are_named() {
    let cases = [
        (Config { max_depth: 0, ..Default::default() }, "max_depth"),
        (Config { max_clusters_per_level: 0, ..Default::default() }, "max_clusters_per_level"),
        (Config { min_cluster_size: 0, ..Default::default() }, "min_cluster_size"),
        (Config { num_restarts: 0, ..Default::default() }, "num_restarts"),
        (Config { dirichlet_concentration: -1.0, ..Default::default() }, "dirichlet_concentration"),
        (Config { dirichlet_concentration: f64::NAN, ..Default::default() }, "dirichlet_concentration"),
        (
            Config { convergence_mode: ConvergenceMode::FixedRounds, max_rounds: 0, ..Default::default() },
            "max_rounds",
        ),
        (Config { time_budget_secs: Some(-2.0), ..Default::default() }, "time_budget_secs"),
        (Config { time_budget_secs: Some(1e30), ..Default::default() }, "time_budget_secs"),
    ];

    for (config, name) in cases {
        let error = config.validate().unwrap_err();
        let error = error.downcast_ref::<ConfigError>().expect("typed config error");
        assert_eq!(error.name, name);
    }
}

#[test]
fn fixed_rounds_limit() {
    let config = Config { convergence_mode: ConvergenceMode::FixedRounds, max_rounds: 7, ..Default::default() };
    assert_eq!(config.round_limit(), Some(7));
    assert_eq!(config.convergence_mode.to_string(), "fixed-rounds");
}

#[test]
fn deserialize_partial_json() -> Result<(), Report> {
    let config: Config = serde_json::from_str(r#"{"max_depth": 3, "convergence_mode": "fixed-rounds"}"#)?;
    assert_eq!(config.max_depth, 3);
    assert_eq!(config.convergence_mode, ConvergenceMode::FixedRounds);
    assert_eq!(config.num_restarts, Config::default().num_restarts);
    Ok(())
}

#[test]
fn deadline_from_budget() -> Result<(), Report> {
    let start = Instant::now();
    let config = Config { time_budget_secs: Some(2.5), ..Default::default() };
    config.validate()?;
    assert_eq!(config.deadline(start), Some(start + Duration::from_millis(2500)));

    // representable as a duration, but past the range of the clock
    let config = Config { time_budget_secs: Some(1.5e19), ..Default::default() };
    config.validate()?;
    assert_eq!(config.deadline(start), None);
    Ok(())
}
