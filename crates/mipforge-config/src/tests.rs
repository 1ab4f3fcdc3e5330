//! Tests for solver configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        random_seed = 42

        [limits]
        seconds_spent_limit = 30
        gap_limit = 0.01

        [presolving]
        max_rounds = 3
        restart_fac = 0.5
        donot_multaggr = true

        [reoptimization]
        enabled = true
    "#;

    let config = SolverConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.random_seed, Some(42));
    assert_eq!(config.limits.seconds_spent_limit, Some(30));
    assert_eq!(config.limits.gap_limit, Some(0.01));
    assert_eq!(config.presolving.max_rounds, Some(3));
    assert_eq!(config.presolving.restart_fac, 0.5);
    assert!(config.presolving.donot_multaggr);
    assert!(config.presolving.enabled);
    assert!(config.reoptimization.enabled);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        random_seed: 42
        limits:
          node_limit: 500
        numerics:
          feastol: 1.0e-7
        concurrent:
          solver_count: 4
    "#;

    let config = SolverConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.random_seed, Some(42));
    assert_eq!(config.limits.node_limit, Some(500));
    assert_eq!(config.numerics().feastol, 1e-7);
    assert_eq!(config.concurrent.solver_count, 4);
}

#[test]
fn test_default_config() {
    let config = SolverConfig::default();
    assert!(config.random_seed.is_none());
    assert!(config.time_limit().is_none());
    assert_eq!(config.presolving.abort_fac, 8e-4);
    assert_eq!(config.misc.max_stored_sols, 100);
    assert!(config.misc.allow_dual_reds);
    assert!(!config.reoptimization.enabled);
    assert_eq!(config.numerics(), Numerics::default());
}

#[test]
fn test_builder_methods() {
    let config = SolverConfig::new()
        .with_time_limit_seconds(60)
        .with_node_limit(10)
        .with_random_seed(123)
        .with_max_presolve_rounds(2)
        .with_restart_fac(0.1)
        .with_reoptimization()
        .without_heuristics()
        .with_concurrent_solvers(3);

    assert_eq!(config.time_limit(), Some(Duration::from_secs(60)));
    assert_eq!(config.limits.node_limit, Some(10));
    assert_eq!(config.random_seed, Some(123));
    assert_eq!(config.presolving.max_rounds, Some(2));
    assert_eq!(config.presolving.restart_fac, 0.1);
    assert!(config.reoptimization.enabled);
    assert!(!config.heuristics.enabled);
    assert_eq!(config.concurrent.solver_count, 3);
}

#[test]
fn test_time_limit_combines_units() {
    let limits = LimitsConfig {
        seconds_spent_limit: Some(1),
        milliseconds_spent_limit: Some(500),
        ..LimitsConfig::default()
    };
    assert_eq!(limits.time_limit(), Some(Duration::from_millis(1500)));
}

#[test]
fn test_validation_rejects_bad_values() {
    let err = SolverConfig::from_toml_str(
        r#"
        [numerics]
        feastol = 0.0
    "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = SolverConfig::from_toml_str(
        r#"
        [concurrent]
        solver_count = 0
    "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_config_error_converts() {
    let err: MipError = ConfigError::Invalid("bad".to_string()).into();
    assert!(matches!(err, MipError::Config(_)));
}

#[test]
fn test_load_missing_file() {
    let result = SolverConfig::load("/nonexistent/mipforge.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
